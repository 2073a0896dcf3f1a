use std::collections::HashMap;

use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::models::metadata_id::MetadataId;

/// Envelope published on the `events.watched` exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub action: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub value: WatchStatusMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStatusMessage {
    pub user: User,
    pub resource: Resource,
    #[serde(flatten)]
    pub status: WatchStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStatus {
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub added_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub played_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub watched_time: Option<i64>,
    #[serde(default)]
    pub watched_percent: Option<i64>,
}

/// `Droped` is what actually travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Status {
    Completed,
    Watching,
    Droped,
    Planned,
    Deleted,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resource {
    #[serde(rename_all = "camelCase")]
    Movie {
        name: String,
        air_date: Option<Date>,
        external_id: HashMap<String, MetadataId>,
    },
    #[serde(rename_all = "camelCase")]
    Show {
        name: String,
        start_air: Option<Date>,
        external_id: HashMap<String, MetadataId>,
    },
    #[serde(rename_all = "camelCase")]
    Episode {
        external_id: HashMap<String, MetadataId>,
        show: ShowInfo,
        season_number: u32,
        episode_number: u32,
        absolute_number: u32,
    },
}

/// The show an episode belongs to. The nested object carries its own
/// `kind` tag which we simply ignore.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowInfo {
    pub name: String,
    pub start_air: Option<Date>,
    pub external_id: HashMap<String, MetadataId>,
}

impl ShowInfo {
    pub fn year(&self) -> Option<i32> {
        self.start_air.map(|d| d.year())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub external_id: HashMap<String, ExternalToken>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalToken {
    pub id: String,
    pub username: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    pub token: JwtToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtToken {
    pub token_type: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expire_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode_completed_message() -> serde_json::Value {
        serde_json::json!({
            "action": "watched",
            "type": "WatchStatus",
            "value": {
                "user": {
                    "id": "u1",
                    "username": "someone",
                    "email": "someone@example.com",
                    "permissions": [],
                    "settings": {},
                    "externalId": {
                        "simkl": {
                            "id": "99",
                            "username": "someone",
                            "profileUrl": null,
                            "token": {
                                "token_type": "Bearer",
                                "access_token": "secret",
                                "refresh_token": null,
                                "expire_at": null
                            }
                        }
                    }
                },
                "resource": {
                    "kind": "episode",
                    "externalId": { "themoviedatabase": { "dataId": "42" } },
                    "show": {
                        "kind": "show",
                        "name": "Some Show",
                        "startAir": "2020-01-01",
                        "externalId": { "themoviedatabase": { "dataId": "7" } }
                    },
                    "seasonNumber": 1,
                    "episodeNumber": 2,
                    "absoluteNumber": 2
                },
                "status": "Completed",
                "addedDate": "2024-01-01T00:00:00Z",
                "playedDate": null,
                "watchedTime": null,
                "watchedPercent": null
            }
        })
    }

    #[test]
    fn decodes_episode_completed_envelope() {
        let message: Message = serde_json::from_value(episode_completed_message()).unwrap();
        assert_eq!(message.action, "watched");
        assert_eq!(message.value.status.status, Status::Completed);
        let Resource::Episode {
            show,
            season_number,
            episode_number,
            absolute_number,
            ..
        } = &message.value.resource
        else {
            panic!("expected an episode resource");
        };
        assert_eq!(show.name, "Some Show");
        assert_eq!(*season_number, 1);
        assert_eq!(*episode_number, 2);
        assert_eq!(*absolute_number, 2);
        assert!(message.value.user.external_id.contains_key("simkl"));
    }

    #[test]
    fn decodes_movie_resource() {
        let json = serde_json::json!({
            "kind": "movie",
            "name": "Inception",
            "airDate": "2010-07-16",
            "externalId": { "imdb": { "dataId": "tt1375666" } }
        });
        let resource: Resource = serde_json::from_value(json).unwrap();
        assert!(matches!(resource, Resource::Movie { name, .. } if name == "Inception"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let json = serde_json::json!("Paused");
        assert!(serde_json::from_value::<Status>(json).is_err());
    }
}
