use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

use async_trait::async_trait;
use time::macros::format_description;
use time::Date;

use crate::models::{
    movie::{Movie, SearchMovie},
    serie::{SearchSerie, Serie},
};

pub mod anilist;
pub mod composite;
pub mod request_client;
pub mod thexem;
pub mod tmdb;
pub mod tvdb;

#[derive(Debug)]
pub enum ProviderError {
    /// The provider has no match for the request.
    NotFound(String),
    Other(anyhow::Error),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::NotFound(context) => write!(f, "Not found: {context}"),
            ProviderError::Other(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProviderError {}

impl From<anyhow::Error> for ProviderError {
    fn from(err: anyhow::Error) -> Self {
        ProviderError::Other(err)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Other(err.into())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Other(err.into())
    }
}

/// A metadata database returning canonical records.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        languages: &[String],
    ) -> Result<Vec<SearchMovie>, ProviderError>;

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        languages: &[String],
    ) -> Result<Vec<SearchSerie>, ProviderError>;

    /// `None` when no id in the map belongs to this provider.
    async fn get_movie(
        &self,
        external_id: &HashMap<String, String>,
    ) -> Result<Option<Movie>, ProviderError>;

    /// `skip_entries` skips the per-episode fetches when the caller only
    /// needs the global fields.
    async fn get_serie(
        &self,
        external_id: &HashMap<String, String>,
        skip_entries: bool,
    ) -> Result<Option<Serie>, ProviderError>;
}

/// Ranking shared by every provider's search.
pub(crate) struct SearchScore {
    pub name: String,
    pub year: Option<i32>,
    pub vote_count: u64,
    pub popularity: f64,
}

/// Order raw search results. A year filter is applied first when it leaves
/// anything, then exact case-insensitive name matches come out on top sorted
/// by `(vote_count, popularity)`, and without an exact match badly rated
/// items are stably pushed to the back.
pub(crate) fn rank_search<T>(
    results: Vec<T>,
    title: &str,
    year: Option<i32>,
    score: impl Fn(&T) -> SearchScore,
) -> Vec<T> {
    let mut results = match year {
        Some(year) if results.iter().any(|r| score(r).year == Some(year)) => {
            let (matching, rest): (Vec<T>, Vec<T>) =
                results.into_iter().partition(|r| score(r).year == Some(year));
            matching.into_iter().chain(rest).collect()
        }
        _ => results,
    };

    let exact: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| score(r).name.eq_ignore_ascii_case(title))
        .map(|(i, _)| i)
        .collect();
    if !exact.is_empty() {
        let mut head: Vec<T> = Vec::with_capacity(results.len());
        let mut tail: Vec<T> = Vec::new();
        for (i, item) in results.into_iter().enumerate() {
            if exact.contains(&i) {
                head.push(item);
            } else {
                tail.push(item);
            }
        }
        head.sort_by(|a, b| {
            let (a, b) = (score(a), score(b));
            (b.vote_count, b.popularity)
                .partial_cmp(&(a.vote_count, a.popularity))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        head.into_iter().chain(tail).collect()
    } else {
        results.sort_by_key(|r| {
            let s = score(r);
            s.vote_count < 5 || s.popularity < 5.0
        });
        results
    }
}

const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Lenient `YYYY-MM-DD` parsing, providers love empty strings.
pub(crate) fn parse_date(value: Option<&str>) -> Option<Date> {
    let value = value?;
    if value.is_empty() {
        return None;
    }
    match Date::parse(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!("Ignoring unparseable date {value}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: &'static str,
        year: Option<i32>,
        votes: u64,
        popularity: f64,
    }

    fn score(item: &Item) -> SearchScore {
        SearchScore {
            name: item.name.to_string(),
            year: item.year,
            vote_count: item.votes,
            popularity: item.popularity,
        }
    }

    #[test]
    fn exact_match_wins_sorted_by_votes() {
        let results = vec![
            Item {
                name: "Dexter: New Blood",
                year: Some(2021),
                votes: 100,
                popularity: 50.0,
            },
            Item {
                name: "dexter",
                year: Some(2006),
                votes: 20,
                popularity: 10.0,
            },
            Item {
                name: "Dexter",
                year: Some(2006),
                votes: 500,
                popularity: 80.0,
            },
        ];
        let ranked = rank_search(results, "Dexter", None, score);
        assert_eq!(ranked[0].votes, 500);
        assert_eq!(ranked[1].votes, 20);
        assert_eq!(ranked[2].name, "Dexter: New Blood");
    }

    #[test]
    fn unpopular_items_sink_stably() {
        let results = vec![
            Item {
                name: "A",
                year: None,
                votes: 2,
                popularity: 1.0,
            },
            Item {
                name: "B",
                year: None,
                votes: 50,
                popularity: 9.0,
            },
            Item {
                name: "C",
                year: None,
                votes: 60,
                popularity: 8.0,
            },
        ];
        let ranked = rank_search(results, "something else", None, score);
        assert_eq!(ranked[0].name, "B");
        assert_eq!(ranked[1].name, "C");
        assert_eq!(ranked[2].name, "A");
    }

    #[test]
    fn year_filter_applies_first() {
        let results = vec![
            Item {
                name: "Dune",
                year: Some(1984),
                votes: 400,
                popularity: 30.0,
            },
            Item {
                name: "Dune",
                year: Some(2021),
                votes: 300,
                popularity: 90.0,
            },
        ];
        let ranked = rank_search(results, "Dune", Some(2021), score);
        assert_eq!(ranked[0].year, Some(2021));
    }

    #[test]
    fn dates_parse_leniently() {
        assert!(parse_date(Some("2010-07-16")).is_some());
        assert!(parse_date(Some("")).is_none());
        assert!(parse_date(Some("not a date")).is_none());
        assert!(parse_date(None).is_none());
    }
}
