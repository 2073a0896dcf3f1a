use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Request, Url};
use serde::Deserialize;

use crate::cache::Cache;
use crate::models::{
    genre::Genre,
    metadata_id::MetadataId,
    movie::{Movie, MovieStatus, MovieTranslation, SearchMovie},
    serie::{SearchSerie, Serie, SerieStatus, SerieTranslation},
    to_slug,
};

use super::{
    rank_search, request_client::LimitedRequestClient, MetadataProvider, ProviderError,
    SearchScore,
};

const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

const MEDIA_FIELDS: &str = r#"
id
idMal
format
status
description
episodes
duration
averageScore
popularity
countryOfOrigin
siteUrl
synonyms
genres
title { romaji english native }
startDate { year month day }
endDate { year month day }
coverImage { extraLarge }
"#;

/// GraphQL client for AniList. Only global info is available, per-episode
/// data stays with the other providers.
#[derive(Debug)]
pub struct AniList {
    client: LimitedRequestClient,
    base_url: Url,
    media_cache: Cache<String, AnilistMedia>,
    search_cache: Cache<String, Vec<AnilistMedia>>,
}

impl AniList {
    pub const NAME: &'static str = "anilist";
    const API_URL: &'static str = "https://graphql.anilist.co";
    /// AniList allows 90 requests per minute, stay well under it.
    const RATE_LIMIT: usize = 1;

    pub fn new() -> Self {
        let client = Client::builder().build().expect("client to build");
        Self {
            client: LimitedRequestClient::new(client, Self::RATE_LIMIT, Duration::from_secs(1)),
            base_url: Url::parse(Self::API_URL).expect("url to parse"),
            media_cache: Cache::new(CACHE_TTL),
            search_cache: Cache::new(CACHE_TTL),
        }
    }

    async fn graphql<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        not_found: Option<&str>,
    ) -> Result<T, ProviderError> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut req = Request::new(Method::POST, self.base_url.clone());
        req.headers_mut().insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        *req.body_mut() = Some(serde_json::to_vec(&body)?.into());
        self.client.request(req, not_found).await
    }

    async fn search(&self, title: &str) -> Result<Vec<AnilistMedia>, ProviderError> {
        self.search_cache
            .get_or_fill(title.to_string(), || async {
                let query = format!(
                    "query ($search: String) {{ Page(perPage: 10) {{ media(search: $search, type: ANIME) {{ {MEDIA_FIELDS} }} }} }}"
                );
                let res: AnilistResponse<AnilistPageData> = self
                    .graphql(&query, serde_json::json!({ "search": title }), None)
                    .await?;
                Ok(res.data.page.media)
            })
            .await
    }

    async fn media(&self, id: &str) -> Result<AnilistMedia, ProviderError> {
        self.media_cache
            .get_or_fill(id.to_string(), || async {
                let id: i64 = id
                    .parse()
                    .map_err(|_| ProviderError::NotFound(format!("bad anilist id {id}")))?;
                let query = format!(
                    "query ($id: Int) {{ Media(id: $id, type: ANIME) {{ {MEDIA_FIELDS} }} }}"
                );
                let res: AnilistResponse<AnilistMediaData> = self
                    .graphql(
                        &query,
                        serde_json::json!({ "id": id }),
                        Some(&format!("no anime with anilist id {id}")),
                    )
                    .await?;
                Ok(res.data.media)
            })
            .await
    }

    /// Curated genre subset, anything AniList knows that we do not becomes a
    /// tag on the translation instead of being dropped.
    fn map_genres(genres: &[String]) -> (Vec<Genre>, Vec<String>) {
        let mut mapped = Vec::new();
        let mut tags = Vec::new();
        for genre in genres {
            match genre.as_str() {
                "Action" => mapped.push(Genre::Action),
                "Adventure" => mapped.push(Genre::Adventure),
                "Comedy" => mapped.push(Genre::Comedy),
                "Drama" => mapped.push(Genre::Drama),
                "Fantasy" => mapped.push(Genre::Fantasy),
                "Horror" => mapped.push(Genre::Horror),
                "Music" => mapped.push(Genre::Music),
                "Mystery" => mapped.push(Genre::Mystery),
                "Romance" => mapped.push(Genre::Romance),
                "Sci-Fi" => mapped.push(Genre::ScienceFiction),
                "Thriller" => mapped.push(Genre::Thriller),
                other => tags.push(other.to_lowercase()),
            }
        }
        (mapped, tags)
    }

    fn own_id(&self, external_id: &HashMap<String, String>) -> Option<String> {
        external_id.get(Self::NAME).cloned()
    }
}

impl Default for AniList {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProvider for AniList {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
        _languages: &[String],
    ) -> Result<Vec<SearchMovie>, ProviderError> {
        let media = self.search(title).await?;
        let movies: Vec<AnilistMedia> = media
            .into_iter()
            .filter(|m| m.format.as_deref() == Some("MOVIE"))
            .collect();
        let ranked = rank_search(movies, title, year, AnilistMedia::score);
        Ok(ranked.into_iter().map(|m| m.to_search_movie()).collect())
    }

    async fn search_series(
        &self,
        title: &str,
        year: Option<i32>,
        _languages: &[String],
    ) -> Result<Vec<SearchSerie>, ProviderError> {
        let media = self.search(title).await?;
        let series: Vec<AnilistMedia> = media
            .into_iter()
            .filter(|m| m.format.as_deref() != Some("MOVIE"))
            .collect();
        let ranked = rank_search(series, title, year, AnilistMedia::score);
        Ok(ranked.into_iter().map(|m| m.to_search_serie()).collect())
    }

    async fn get_movie(
        &self,
        external_id: &HashMap<String, String>,
    ) -> Result<Option<Movie>, ProviderError> {
        let Some(id) = self.own_id(external_id) else {
            return Ok(None);
        };
        let media = self.media(&id).await?;
        let (genres, tags) = Self::map_genres(&media.genres);
        Ok(Some(Movie {
            slug: to_slug(media.preferred_title()),
            original_language: Some(media.original_language()),
            genres,
            rating: media.average_score.map(|s| s as i32),
            status: match media.status.as_deref() {
                Some("FINISHED") => MovieStatus::Finished,
                Some("NOT_YET_RELEASED") => MovieStatus::Planned,
                _ => MovieStatus::Unknown,
            },
            runtime: media.duration,
            air_date: media.start_date.as_ref().and_then(AnilistDate::to_date),
            external_id: media.ids(),
            translations: HashMap::from([(
                "en".to_string(),
                MovieTranslation {
                    name: media.preferred_title().to_string(),
                    latin_name: media.title.romaji.clone(),
                    description: media.description.clone(),
                    tagline: None,
                    aliases: media.synonyms.clone(),
                    tags,
                    poster: media.cover_image.as_ref().and_then(|c| c.extra_large.clone()),
                    thumbnail: None,
                    banner: None,
                    logo: None,
                    trailer: None,
                },
            )]),
            collections: Vec::new(),
            studios: Vec::new(),
            videos: Vec::new(),
        }))
    }

    async fn get_serie(
        &self,
        external_id: &HashMap<String, String>,
        _skip_entries: bool,
    ) -> Result<Option<Serie>, ProviderError> {
        let Some(id) = self.own_id(external_id) else {
            return Ok(None);
        };
        let media = self.media(&id).await?;
        let (genres, tags) = Self::map_genres(&media.genres);
        Ok(Some(Serie {
            slug: to_slug(media.preferred_title()),
            original_language: Some(media.original_language()),
            genres,
            rating: media.average_score.map(|s| s as i32),
            status: match media.status.as_deref() {
                Some("FINISHED") => SerieStatus::Finished,
                Some("RELEASING") => SerieStatus::Airing,
                Some("NOT_YET_RELEASED") => SerieStatus::Planned,
                _ => SerieStatus::Unknown,
            },
            runtime: media.duration,
            start_air: media.start_date.as_ref().and_then(AnilistDate::to_date),
            end_air: media.end_date.as_ref().and_then(AnilistDate::to_date),
            external_id: media.ids(),
            translations: HashMap::from([(
                "en".to_string(),
                SerieTranslation {
                    name: media.preferred_title().to_string(),
                    latin_name: media.title.romaji.clone(),
                    description: media.description.clone(),
                    tagline: None,
                    aliases: media.synonyms.clone(),
                    tags,
                    poster: media.cover_image.as_ref().and_then(|c| c.extra_large.clone()),
                    thumbnail: None,
                    banner: None,
                    logo: None,
                    trailer: None,
                },
            )]),
            seasons: Vec::new(),
            entries: Vec::new(),
            extra: Vec::new(),
            collections: Vec::new(),
            studios: Vec::new(),
        }))
    }
}

// Types

#[derive(Debug, Clone, Deserialize)]
struct AnilistResponse<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
struct AnilistPageData {
    #[serde(rename = "Page")]
    page: AnilistPage,
}

#[derive(Debug, Clone, Deserialize)]
struct AnilistPage {
    #[serde(default)]
    media: Vec<AnilistMedia>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnilistMediaData {
    #[serde(rename = "Media")]
    media: AnilistMedia,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnilistMedia {
    id: i64,
    id_mal: Option<i64>,
    format: Option<String>,
    status: Option<String>,
    description: Option<String>,
    duration: Option<i32>,
    average_score: Option<u32>,
    #[serde(default)]
    popularity: u64,
    country_of_origin: Option<String>,
    site_url: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    genres: Vec<String>,
    title: AnilistTitle,
    start_date: Option<AnilistDate>,
    end_date: Option<AnilistDate>,
    cover_image: Option<AnilistCover>,
}

impl AnilistMedia {
    fn preferred_title(&self) -> &str {
        self.title
            .english
            .as_deref()
            .or(self.title.romaji.as_deref())
            .or(self.title.native.as_deref())
            .unwrap_or("unknown")
    }

    fn original_language(&self) -> String {
        match self.country_of_origin.as_deref() {
            Some("KR") => "ko".to_string(),
            Some("CN") | Some("TW") => "zh".to_string(),
            _ => "ja".to_string(),
        }
    }

    fn ids(&self) -> HashMap<String, MetadataId> {
        let mut ids = HashMap::from([(
            AniList::NAME.to_string(),
            MetadataId {
                data_id: self.id.to_string(),
                link: self.site_url.clone(),
            },
        )]);
        if let Some(mal) = self.id_mal {
            ids.insert(
                "mal".to_string(),
                MetadataId::with_link(mal, format!("https://myanimelist.net/anime/{mal}")),
            );
        }
        ids
    }

    fn score(&self) -> SearchScore {
        SearchScore {
            name: self
                .title
                .romaji
                .clone()
                .or_else(|| self.title.english.clone())
                .unwrap_or_default(),
            year: self.start_date.as_ref().and_then(|d| d.year),
            vote_count: self.popularity,
            popularity: self.average_score.unwrap_or(0) as f64,
        }
    }

    fn to_search_movie(&self) -> SearchMovie {
        SearchMovie {
            slug: to_slug(self.preferred_title()),
            name: self.preferred_title().to_string(),
            description: self.description.clone(),
            air_date: self.start_date.as_ref().and_then(AnilistDate::to_date),
            poster: self.cover_image.as_ref().and_then(|c| c.extra_large.clone()),
            original_language: Some(self.original_language()),
            external_id: self.ids(),
        }
    }

    fn to_search_serie(&self) -> SearchSerie {
        SearchSerie {
            slug: to_slug(self.preferred_title()),
            name: self.preferred_title().to_string(),
            description: self.description.clone(),
            start_air: self.start_date.as_ref().and_then(AnilistDate::to_date),
            end_air: self.end_date.as_ref().and_then(AnilistDate::to_date),
            poster: self.cover_image.as_ref().and_then(|c| c.extra_large.clone()),
            original_language: Some(self.original_language()),
            external_id: self.ids(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AnilistTitle {
    romaji: Option<String>,
    english: Option<String>,
    native: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnilistDate {
    year: Option<i32>,
    month: Option<u8>,
    day: Option<u8>,
}

impl AnilistDate {
    fn to_date(&self) -> Option<time::Date> {
        let year = self.year?;
        let month = time::Month::try_from(self.month.unwrap_or(1)).ok()?;
        time::Date::from_calendar_date(year, month, self.day.unwrap_or(1)).ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnilistCover {
    extra_large: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_genres_become_tags() {
        let (genres, tags) = AniList::map_genres(&[
            "Action".to_string(),
            "Mecha".to_string(),
            "Slice of Life".to_string(),
            "Sci-Fi".to_string(),
        ]);
        assert_eq!(genres, vec![Genre::Action, Genre::ScienceFiction]);
        assert_eq!(tags, vec!["mecha", "slice of life"]);
    }

    #[test]
    fn fuzzy_dates() {
        let full = AnilistDate {
            year: Some(2020),
            month: Some(4),
            day: Some(7),
        };
        assert!(full.to_date().is_some());
        let year_only = AnilistDate {
            year: Some(2020),
            month: None,
            day: None,
        };
        assert_eq!(
            year_only.to_date().unwrap(),
            time::Date::from_calendar_date(2020, time::Month::January, 1).unwrap()
        );
        let unknown = AnilistDate {
            year: None,
            month: None,
            day: None,
        };
        assert!(unknown.to_date().is_none());
    }
}
