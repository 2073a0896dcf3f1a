use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use super::metadata_id::SeasonId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: u32,
    pub start_air: Option<Date>,
    pub end_air: Option<Date>,
    pub external_id: HashMap<String, SeasonId>,
    #[serde(default)]
    pub translations: HashMap<String, SeasonTranslation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonTranslation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub thumbnail: Option<String>,
    pub banner: Option<String>,
}
