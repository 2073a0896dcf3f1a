use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use super::{
    collection::Collection,
    genre::Genre,
    metadata_id::{merge_external_ids, MetadataId},
    studio::Studio,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovieStatus {
    Unknown,
    Finished,
    Planned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub slug: String,
    pub original_language: Option<String>,
    pub genres: Vec<Genre>,
    pub rating: Option<i32>,
    pub status: MovieStatus,
    pub runtime: Option<i32>,
    pub air_date: Option<Date>,
    pub external_id: HashMap<String, MetadataId>,
    #[serde(default)]
    pub translations: HashMap<String, MovieTranslation>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub studios: Vec<Studio>,
    #[serde(default)]
    pub videos: Vec<String>,
}

impl Movie {
    /// Enrich a movie with data from a secondary provider.
    ///
    /// Only `collections` (when the base has none) and `external_id` are
    /// taken. Existing id keys keep their `data_id`, the secondary side
    /// only fills in providers we didn't know and missing `link`s.
    pub fn enriched_with(mut self, other: Movie) -> Movie {
        if self.collections.is_empty() {
            self.collections = other.collections;
        }
        self.external_id = merge_external_ids(other.external_id, self.external_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieTranslation {
    pub name: String,
    pub latin_name: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub poster: Option<String>,
    pub thumbnail: Option<String>,
    pub banner: Option<String>,
    pub logo: Option<String>,
    pub trailer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMovie {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub air_date: Option<Date>,
    pub poster: Option<String>,
    pub original_language: Option<String>,
    pub external_id: HashMap<String, MetadataId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collection::Collection;

    fn movie(slug: &str, ids: &[(&str, &str, Option<&str>)]) -> Movie {
        Movie {
            slug: slug.to_string(),
            original_language: None,
            genres: Vec::new(),
            rating: None,
            status: MovieStatus::Unknown,
            runtime: None,
            air_date: None,
            external_id: ids
                .iter()
                .map(|(provider, id, link)| {
                    (
                        provider.to_string(),
                        MetadataId {
                            data_id: id.to_string(),
                            link: link.map(str::to_string),
                        },
                    )
                })
                .collect(),
            translations: HashMap::new(),
            collections: Vec::new(),
            studios: Vec::new(),
            videos: Vec::new(),
        }
    }

    #[test]
    fn enrichment_keeps_existing_ids_and_backfills_links() {
        let base = movie(
            "inception",
            &[
                ("imdb", "tt1375666", None),
                ("themoviedatabase", "27205", Some("https://www.themoviedb.org/movie/27205")),
            ],
        );
        // the secondary provider disagrees on a shared id and knows a link
        // the base is missing
        let mut enrichment = movie(
            "inception",
            &[
                ("imdb", "tt0000000", Some("https://www.imdb.com/title/tt1375666")),
                ("tvdb", "113", None),
            ],
        );
        enrichment.collections.push(Collection {
            slug: "nolan".to_string(),
            original_language: None,
            genres: Vec::new(),
            rating: None,
            external_id: HashMap::new(),
            translations: HashMap::new(),
        });

        let enriched = base.enriched_with(enrichment);
        // existing keys keep their data_id
        assert_eq!(enriched.external_id["imdb"].data_id, "tt1375666");
        assert_eq!(enriched.external_id["themoviedatabase"].data_id, "27205");
        // but a missing link is backfilled and new providers are added
        assert_eq!(
            enriched.external_id["imdb"].link.as_deref(),
            Some("https://www.imdb.com/title/tt1375666")
        );
        assert_eq!(enriched.external_id["tvdb"].data_id, "113");
        // the base had no collection, the enrichment's wins
        assert_eq!(enriched.collections.len(), 1);
    }

    #[test]
    fn enrichment_never_replaces_a_known_collection() {
        let mut base = movie("inception", &[]);
        base.collections.push(Collection {
            slug: "original".to_string(),
            original_language: None,
            genres: Vec::new(),
            rating: None,
            external_id: HashMap::new(),
            translations: HashMap::new(),
        });
        let mut enrichment = movie("inception", &[]);
        enrichment.collections.push(Collection {
            slug: "other".to_string(),
            original_language: None,
            genres: Vec::new(),
            rating: None,
            external_id: HashMap::new(),
            translations: HashMap::new(),
        });

        let enriched = base.enriched_with(enrichment);
        assert_eq!(enriched.collections[0].slug, "original");
    }
}
