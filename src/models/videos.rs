use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::metadata_id::EntryId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub slug: String,
}

/// Catalog snapshot used to compute the scan delta.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    pub paths: HashSet<String>,
    pub unmatched: HashSet<String>,
    /// `title -> (year | "unknown") -> resource`
    #[serde(default)]
    pub guesses: HashMap<String, HashMap<String, Resource>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessKind {
    Episode,
    Movie,
    Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtraKind {
    Other,
    Trailer,
    Interview,
    BehindTheScene,
    DeletedScene,
    Blooper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessEpisode {
    pub season: Option<u32>,
    pub episode: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    pub title: String,
    pub kind: GuessKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_kind: Option<ExtraKind>,
    pub years: Vec<i32>,
    pub episodes: Vec<GuessEpisode>,
    #[serde(default)]
    pub external_id: HashMap<String, String>,
    #[serde(rename = "from")]
    pub from_: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw: serde_json::Value,
    /// Earlier guesses are kept when a pipeline step rewrites one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Guess>,
}

/// Hint attached to a video telling the catalog what it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VideoTarget {
    Slug {
        slug: String,
    },
    #[serde(rename_all = "camelCase")]
    ExternalId {
        external_id: HashMap<String, EntryId>,
    },
    Movie {
        movie: String,
    },
    #[serde(rename_all = "camelCase")]
    Episode {
        serie: String,
        season: u32,
        episode: u32,
    },
    #[serde(rename_all = "camelCase")]
    Order {
        serie: String,
        order: f64,
    },
    #[serde(rename_all = "camelCase")]
    Special {
        serie: String,
        special: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub path: String,
    /// Stable hash over the path with version and part spans removed, so
    /// alternative files of one logical release collide.
    pub rendering: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<u32>,
    pub version: u32,
    pub guess: Guess,
    #[serde(rename = "for", default, skip_serializing_if = "Vec::is_empty")]
    pub for_: Vec<VideoTarget>,
}

/// `POST /videos` response item.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoCreated {
    pub id: String,
    pub path: String,
    pub guess: Guess,
    #[serde(default)]
    pub entries: Vec<EntryRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryRef {
    pub slug: String,
}

/// `POST /videos/link` request item.
#[derive(Debug, Clone, Serialize)]
pub struct VideoLink {
    pub id: String,
    #[serde(rename = "for")]
    pub for_: Vec<VideoTarget>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_serializes_with_for_key() {
        let video = Video {
            path: "/m/Inception (2010).mkv".to_string(),
            rendering: "abc".to_string(),
            part: None,
            version: 1,
            guess: Guess {
                title: "Inception".to_string(),
                kind: GuessKind::Movie,
                extra_kind: None,
                years: vec![2010],
                episodes: vec![],
                external_id: HashMap::new(),
                from_: "parser".to_string(),
                raw: serde_json::Value::Null,
                history: vec![],
            },
            for_: vec![VideoTarget::Movie {
                movie: "inception".to_string(),
            }],
        };
        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["for"][0]["kind"], "movie");
        assert_eq!(json["for"][0]["movie"], "inception");
        assert_eq!(json["guess"]["from"], "parser");
        assert!(json.get("for_").is_none());
    }

    #[test]
    fn target_variants_are_tagged_by_kind() {
        let target = VideoTarget::Episode {
            serie: "one-piece".to_string(),
            season: 1,
            episode: 2,
        };
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["kind"], "episode");

        let order = VideoTarget::Order {
            serie: "one-piece".to_string(),
            order: 1089.0,
        };
        assert_eq!(serde_json::to_value(&order).unwrap()["kind"], "order");
    }
}
