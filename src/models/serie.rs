use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use super::{
    collection::Collection,
    entry::{Entry, Extra},
    genre::Genre,
    metadata_id::{merge_external_ids, MetadataId},
    season::Season,
    studio::Studio,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerieStatus {
    Unknown,
    Finished,
    Airing,
    Planned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Serie {
    pub slug: String,
    pub original_language: Option<String>,
    pub genres: Vec<Genre>,
    pub rating: Option<i32>,
    pub status: SerieStatus,
    pub runtime: Option<i32>,
    pub start_air: Option<Date>,
    pub end_air: Option<Date>,
    pub external_id: HashMap<String, MetadataId>,
    #[serde(default)]
    pub translations: HashMap<String, SerieTranslation>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub extra: Vec<Extra>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub studios: Vec<Studio>,
}

impl Serie {
    /// Combine an entry-accurate record with a globally richer one.
    ///
    /// `global` (themoviedatabase) keeps every top-level field while
    /// `seasons`, `entries` and `extra` are taken from `detailed` (tvdb),
    /// whose collections also win when present. External ids are unioned
    /// with `global` winning on shared keys.
    pub fn merged(detailed: Serie, global: Serie) -> Serie {
        let mut out = global;
        out.seasons = detailed.seasons;
        out.entries = detailed.entries;
        out.extra = detailed.extra;
        if !detailed.collections.is_empty() {
            out.collections = detailed.collections;
        }
        out.external_id = merge_external_ids(detailed.external_id, out.external_id);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerieTranslation {
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
pub struct SearchSerie {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub start_air: Option<Date>,
    pub end_air: Option<Date>,
    pub poster: Option<String>,
    pub original_language: Option<String>,
    pub external_id: HashMap<String, MetadataId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{Entry, EntryKind};

    fn serie(slug: &str, ids: &[(&str, &str)]) -> Serie {
        Serie {
            slug: slug.to_string(),
            original_language: None,
            genres: Vec::new(),
            rating: None,
            status: SerieStatus::Unknown,
            runtime: None,
            start_air: None,
            end_air: None,
            external_id: ids
                .iter()
                .map(|(provider, id)| (provider.to_string(), MetadataId::new(id)))
                .collect(),
            translations: HashMap::new(),
            seasons: Vec::new(),
            entries: Vec::new(),
            extra: Vec::new(),
            collections: Vec::new(),
            studios: Vec::new(),
        }
    }

    #[test]
    fn merge_keeps_detailed_entries_and_global_fields() {
        let mut detailed = serie("from-tvdb", &[("tvdb", "7"), ("themoviedatabase", "old")]);
        detailed.entries.push(Entry {
            kind: EntryKind::Episode,
            order: 1.0,
            runtime: None,
            air_date: None,
            thumbnail: None,
            slug: None,
            season_number: Some(1),
            episode_number: Some(1),
            number: Some(1),
            external_id: HashMap::new(),
            translations: HashMap::new(),
            videos: Vec::new(),
        });
        let mut global = serie("from-tmdb", &[("themoviedatabase", "42")]);
        global.rating = Some(81);

        let merged = Serie::merged(detailed, global);
        // global record wins on top-level fields
        assert_eq!(merged.slug, "from-tmdb");
        assert_eq!(merged.rating, Some(81));
        // but the detailed entries survive
        assert_eq!(merged.entries.len(), 1);
        // external ids are unioned, right side (global) wins on data_id
        assert_eq!(merged.external_id["tvdb"].data_id, "7");
        assert_eq!(merged.external_id["themoviedatabase"].data_id, "42");
    }
}
