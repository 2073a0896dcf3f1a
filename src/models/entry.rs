use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use super::metadata_id::EntryId;
use super::videos::ExtraKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Episode,
    Movie,
    Special,
}

/// One playable item of a serie. `order` is a single float index across all
/// seasons so specials can sit between episodes (e.g. `0.5`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub kind: EntryKind,
    pub order: f64,
    pub runtime: Option<i32>,
    pub air_date: Option<Date>,
    pub thumbnail: Option<String>,
    /// Movie entries only.
    pub slug: Option<String>,
    /// Episode entries only.
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    /// Special entries only.
    pub number: Option<u32>,
    pub external_id: HashMap<String, EntryId>,
    #[serde(default)]
    pub translations: HashMap<String, EntryTranslation>,
    #[serde(default)]
    pub videos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryTranslation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub poster: Option<String>,
}

/// Non-canonical bonus content (trailers, interviews...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extra {
    pub kind: ExtraKind,
    pub name: String,
    pub runtime: Option<i32>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub videos: Vec<String>,
}
