use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::autosync::models::{Resource, Status, User, WatchStatus};
use crate::models::metadata_id::MetadataId;

use super::SyncService;

const API_URL: &str = "https://api.simkl.com";

pub struct Simkl {
    client: Client,
    api_key: String,
}

impl Simkl {
    pub fn new(client_id: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            api_key: client_id.unwrap_or_default().to_string(),
        }
    }

    async fn post(
        &self,
        path: &str,
        access_token: &str,
        body: serde_json::Value,
    ) -> anyhow::Result<()> {
        let res = self
            .client
            .post(format!("{API_URL}{path}"))
            .header("Authorization", format!("Bearer {access_token}"))
            .header("simkl_api_key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("simkl responded with {status}");
        }
        tracing::debug!("Simkl response: {:?}", res.text().await.ok());
        Ok(())
    }
}

/// Map watch statuses to simkl lists. Deletions are skipped on purpose,
/// most of them are the start of a rewatch.
fn to_simkl_status(status: Status) -> Option<&'static str> {
    match status {
        Status::Completed => Some("completed"),
        Status::Watching => Some("watching"),
        Status::Planned => Some("plantowatch"),
        Status::Droped | Status::Deleted => None,
    }
}

/// Simkl only understands its own id vocabulary: `themoviedatabase`
/// becomes an integer `tmdb`, `imdb` goes through as-is.
fn translate_ids(ids: &HashMap<String, MetadataId>) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    for (provider, id) in ids {
        match provider.as_str() {
            "themoviedatabase" => {
                let value = match id.data_id.parse::<i64>() {
                    Ok(n) => serde_json::json!(n),
                    Err(_) => serde_json::json!(id.data_id),
                };
                out.insert("tmdb".to_string(), value);
            }
            "imdb" => {
                out.insert("imdb".to_string(), serde_json::json!(id.data_id));
            }
            _ => {}
        }
    }
    out
}

fn format_date(date: OffsetDateTime) -> String {
    date.format(&Rfc3339).unwrap_or_default()
}

fn episode_history_payload(
    show_name: &str,
    show_year: Option<i32>,
    show_ids: &HashMap<String, MetadataId>,
    season: u32,
    episode: u32,
    absolute: u32,
    watched_at: &str,
) -> serde_json::Value {
    serde_json::json!({
        "shows": [{
            "title": show_name,
            "year": show_year,
            "ids": translate_ids(show_ids),
            "watched_at": watched_at,
            "seasons": [
                { "number": season, "episodes": [{ "number": episode }] },
                { "number": season, "episodes": [{ "number": absolute }] },
            ],
        }]
    })
}

#[async_trait]
impl SyncService for Simkl {
    fn name(&self) -> &'static str {
        "simkl"
    }

    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn update(
        &self,
        user: &User,
        resource: &Resource,
        status: &WatchStatus,
    ) -> anyhow::Result<()> {
        let Some(token) = user.external_id.get("simkl") else {
            return Ok(());
        };
        let access_token = &token.token.access_token;
        let watched_at = format_date(status.played_date.unwrap_or(status.added_date));

        match resource {
            Resource::Episode {
                show,
                season_number,
                episode_number,
                absolute_number,
                ..
            } => {
                // Only finished episodes end up in the simkl history.
                if status.status != Status::Completed {
                    return Ok(());
                }
                let body = episode_history_payload(
                    &show.name,
                    show.year(),
                    &show.external_id,
                    *season_number,
                    *episode_number,
                    *absolute_number,
                    &watched_at,
                );
                self.post("/sync/history", access_token, body).await
            }
            Resource::Movie {
                name,
                air_date,
                external_id,
            }
            | Resource::Show {
                name,
                start_air: air_date,
                external_id,
            } => {
                let Some(simkl_status) = to_simkl_status(status.status) else {
                    return Ok(());
                };
                let category = match resource {
                    Resource::Movie { .. } => "movies",
                    _ => "shows",
                };
                let body = serde_json::json!({
                    category: [{
                        "to": simkl_status,
                        "watched_at": (status.status == Status::Completed)
                            .then_some(watched_at.as_str()),
                        "title": name,
                        "year": air_date.map(|d| d.year()),
                        "ids": translate_ids(external_id),
                    }]
                });
                self.post("/sync/add-to-list", access_token, body).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(to_simkl_status(Status::Completed), Some("completed"));
        assert_eq!(to_simkl_status(Status::Watching), Some("watching"));
        assert_eq!(to_simkl_status(Status::Planned), Some("plantowatch"));
        assert_eq!(to_simkl_status(Status::Deleted), None);
        assert_eq!(to_simkl_status(Status::Droped), None);
    }

    #[test]
    fn id_translation() {
        let ids = HashMap::from([
            ("themoviedatabase".to_string(), MetadataId::new("42")),
            ("imdb".to_string(), MetadataId::new("tt1375666")),
            ("tvdb".to_string(), MetadataId::new("7")),
        ]);
        let translated = translate_ids(&ids);
        assert_eq!(translated["tmdb"], serde_json::json!(42));
        assert_eq!(translated["imdb"], serde_json::json!("tt1375666"));
        assert!(!translated.contains_key("tvdb"));
    }

    #[test]
    fn history_payload_repeats_season_with_absolute() {
        let ids = HashMap::from([("themoviedatabase".to_string(), MetadataId::new("42"))]);
        let body = episode_history_payload("Some Show", Some(2020), &ids, 1, 2, 2, "2024-01-01T00:00:00Z");
        let seasons = &body["shows"][0]["seasons"];
        assert_eq!(
            seasons,
            &serde_json::json!([
                { "number": 1, "episodes": [{ "number": 2 }] },
                { "number": 1, "episodes": [{ "number": 2 }] },
            ])
        );
        assert_eq!(body["shows"][0]["ids"]["tmdb"], serde_json::json!(42));
    }

    #[test]
    fn disabled_without_client_id() {
        assert!(!Simkl::new(None).enabled());
        assert!(Simkl::new(Some("client")).enabled());
    }
}
