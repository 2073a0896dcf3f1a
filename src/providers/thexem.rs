use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Method, Request, Url};
use serde::Deserialize;

use crate::cache::Cache;
use crate::models::clean;

use super::{request_client::LimitedRequestClient, ProviderError};

const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Community mapping reconciling scene-release naming with the canonical
/// database ordering. `provider` is the mapping origin, `tvdb` in practice.
#[derive(Debug)]
pub struct TheXem {
    client: LimitedRequestClient,
    base_url: Url,
    map_cache: Cache<String, NameMap>,
    show_map_cache: Cache<(String, String), Vec<XemMapEntry>>,
    titles_cache: Cache<String, Vec<String>>,
}

/// `id -> [master name, {alias -> season}, ...]`
type NameMap = HashMap<String, Vec<XemName>>;

impl TheXem {
    const API_URL: &'static str = "https://thexem.info";
    const RATE_LIMIT: usize = 2;

    pub fn new() -> Self {
        let client = Client::builder().build().expect("client to build");
        Self {
            client: LimitedRequestClient::new(client, Self::RATE_LIMIT, Duration::from_secs(1)),
            base_url: Url::parse(Self::API_URL).expect("url to parse"),
            map_cache: Cache::new(CACHE_TTL),
            show_map_cache: Cache::new(CACHE_TTL),
            titles_cache: Cache::new(CACHE_TTL),
        }
    }

    async fn get_map(&self, provider: &str) -> Result<NameMap, ProviderError> {
        self.map_cache
            .get_or_fill(provider.to_string(), || async {
                tracing::info!("Fetching thexem name map for {provider}");
                let mut url = self.base_url.clone();
                url.path_segments_mut()
                    .expect("base url")
                    .extend(["map", "allNames"]);
                url.query_pairs_mut()
                    .append_pair("origin", provider)
                    .append_pair("seasonNumbers", "1")
                    .append_pair("defaultNames", "1");
                let res: XemResponse<NameMap> = self
                    .client
                    .request(Request::new(Method::GET, url), None)
                    .await?;
                if res.result.as_deref() == Some("failure") {
                    return Err(ProviderError::Other(anyhow::anyhow!(
                        "could not fetch the xem name map: {}",
                        res.message.unwrap_or_default()
                    )));
                }
                Ok(res.data.unwrap_or_default())
            })
            .await
    }

    async fn get_show_map(
        &self,
        provider: &str,
        id: &str,
    ) -> Result<Vec<XemMapEntry>, ProviderError> {
        self.show_map_cache
            .get_or_fill((provider.to_string(), id.to_string()), || async {
                tracing::info!("Fetching thexem map of {id} ({provider})");
                let mut url = self.base_url.clone();
                url.path_segments_mut().expect("base url").extend(["map", "all"]);
                url.query_pairs_mut()
                    .append_pair("id", id)
                    .append_pair("origin", provider);
                let res: XemResponse<Vec<XemMapEntry>> = self
                    .client
                    .request(Request::new(Method::GET, url), None)
                    .await?;
                if res.result.as_deref() == Some("failure") {
                    tracing::error!(
                        "Could not fetch the xem mapping: {}",
                        res.message.unwrap_or_default()
                    );
                    return Ok(Vec::new());
                }
                Ok(res.data.unwrap_or_default())
            })
            .await
    }

    /// The canonical name and id of a show known under a scene alias.
    pub async fn get_show_override(
        &self,
        provider: &str,
        show_name: &str,
    ) -> Result<Option<(String, String)>, ProviderError> {
        let map = self.get_map(provider).await?;
        let show_name = clean(show_name);
        for (id, names) in &map {
            let Some(XemName::Master(master)) = names.first() else {
                continue;
            };
            for name in &names[1..] {
                let XemName::Alias(alias) = name else {
                    continue;
                };
                if alias.keys().any(|name| show_name == clean(name)) {
                    return Ok(Some((master.clone(), id.clone())));
                }
            }
        }
        Ok(None)
    }

    /// The scene season a given alias refers to, `-1` meaning the whole
    /// show.
    pub async fn get_season_override(
        &self,
        provider: &str,
        id: &str,
        show_name: &str,
    ) -> Result<Option<i32>, ProviderError> {
        let map = self.get_map(provider).await?;
        let Some(names) = map.get(id) else {
            return Ok(None);
        };
        let show_name = clean(show_name);
        for name in names.iter().skip(1) {
            let XemName::Alias(alias) = name else {
                continue;
            };
            for (alias_name, season) in alias {
                if show_name == clean(alias_name) {
                    return Ok(Some(*season));
                }
            }
        }
        Ok(None)
    }

    /// Rewrite a scene `(show, episode)` to the canonical
    /// `(season, episode, absolute)` coordinates.
    pub async fn get_episode_override(
        &self,
        provider: &str,
        id: &str,
        show_name: &str,
        episode: u32,
    ) -> Result<(Option<u32>, Option<u32>, u32), ProviderError> {
        let master_season = self.get_season_override(provider, id, show_name).await?;
        // -1 is the show's name itself, nothing to remap.
        let master_season = match master_season {
            None | Some(-1) => return Ok((None, None, episode)),
            Some(season) => season,
        };
        tracing::info!(
            "Found xem override for show {show_name}, ep {episode}, master season {master_season}"
        );
        let map = self.get_show_map(provider, id).await?;
        let entry = map.iter().find(|entry| {
            entry
                .scene
                .as_ref()
                .map(|s| s.season == master_season && s.episode == episode as i32)
                .unwrap_or(false)
        });
        let Some(entry) = entry else {
            tracing::warn!(
                "Could not get xem mapping for show {show_name}, falling back to identifier mapping"
            );
            return Ok((Some(master_season as u32), Some(episode), episode));
        };
        let origin = entry.of_provider(provider);
        // Only the tvdb has proper absolute handling, always use its number.
        let absolute = entry
            .tvdb
            .as_ref()
            .and_then(|t| t.absolute)
            .unwrap_or(episode as i32);
        Ok((
            origin.map(|o| o.season as u32),
            origin.map(|o| o.episode as u32),
            absolute as u32,
        ))
    }

    /// Every cleaned title the mapping knows. Fed to the parser so it can
    /// rescue titles its tokenizer splits.
    pub async fn get_expected_titles(&self, provider: &str) -> Result<Vec<String>, ProviderError> {
        self.titles_cache
            .get_or_fill(provider.to_string(), || async {
                let map = self.get_map(provider).await?;
                let mut titles = Vec::new();
                for names in map.values() {
                    for name in names {
                        match name {
                            XemName::Master(master) => titles.push(clean(master)),
                            XemName::Alias(alias) => {
                                titles.extend(alias.keys().map(|name| clean(name)))
                            }
                        }
                    }
                }
                Ok(titles)
            })
            .await
    }
}

impl Default for TheXem {
    fn default() -> Self {
        Self::new()
    }
}

// Types

#[derive(Debug, Clone, Deserialize)]
struct XemResponse<T> {
    result: Option<String>,
    message: Option<String>,
    data: Option<T>,
}

/// The first element of a show's name list is the master name as a plain
/// string, the rest map aliases to season numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum XemName {
    Master(String),
    Alias(HashMap<String, i32>),
}

#[derive(Debug, Clone, Deserialize)]
struct XemCoordinates {
    season: i32,
    episode: i32,
    #[serde(default)]
    absolute: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct XemMapEntry {
    scene: Option<XemCoordinates>,
    tvdb: Option<XemCoordinates>,
    anidb: Option<XemCoordinates>,
}

impl XemMapEntry {
    fn of_provider(&self, provider: &str) -> Option<&XemCoordinates> {
        match provider {
            "tvdb" => self.tvdb.as_ref(),
            "anidb" => self.anidb.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_map_decodes_mixed_list() {
        let json = serde_json::json!({
            "7045": [
                "Attack on Titan",
                { "Shingeki no Kyojin": 1 },
                { "Attack on Titan Final Season": 4 }
            ]
        });
        let map: NameMap = serde_json::from_value(json).unwrap();
        let names = &map["7045"];
        assert!(matches!(&names[0], XemName::Master(n) if n == "Attack on Titan"));
        assert!(matches!(&names[1], XemName::Alias(a) if a["Shingeki no Kyojin"] == 1));
    }

    #[test]
    fn map_entry_decodes() {
        let json = serde_json::json!({
            "scene": { "season": 4, "episode": 1, "absolute": 60 },
            "tvdb": { "season": 4, "episode": 1, "absolute": 60 },
            "anidb": null
        });
        let entry: XemMapEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.tvdb.unwrap().absolute, Some(60));
    }
}
