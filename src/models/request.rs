use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::videos::GuessEpisode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Movie,
    Episode,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Movie => "movie",
            RequestKind::Episode => "episode",
        }
    }
}

impl std::str::FromStr for RequestKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(RequestKind::Movie),
            "episode" => Ok(RequestKind::Episode),
            rest => Err(anyhow::anyhow!("{rest} is not a request kind")),
        }
    }
}

/// A queued identification request. Rows are unique by
/// `(kind, title, year)`, concurrent enqueues merge their `videos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(skip_serializing, default)]
    pub pk: i64,
    pub kind: RequestKind,
    pub title: String,
    pub year: Option<i32>,
    pub external_id: HashMap<String, String>,
    pub videos: Vec<RequestVideo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestVideo {
    pub id: String,
    pub episodes: Vec<GuessEpisode>,
}

/// Row shape returned by `GET /scan`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RequestRow {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub year: Option<i32>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
}
