use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{genre::Genre, metadata_id::MetadataId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub slug: String,
    pub original_language: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub rating: Option<i32>,
    pub external_id: HashMap<String, MetadataId>,
    #[serde(default)]
    pub translations: HashMap<String, CollectionTranslation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionTranslation {
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
}
