use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::metadata_id::MetadataId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Studio {
    pub slug: String,
    pub external_id: HashMap<String, MetadataId>,
    #[serde(default)]
    pub translations: HashMap<String, StudioTranslation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioTranslation {
    pub name: String,
    pub logo: Option<String>,
}
