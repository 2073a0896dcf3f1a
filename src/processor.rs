use std::time::Duration;

use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogClient;
use crate::models::{
    entry::Entry,
    request::{Request, RequestKind, RequestVideo},
    videos::{GuessEpisode, Resource, VideoLink, VideoTarget},
};
use crate::providers::composite::CompositeProvider;
use crate::queue::RequestQueue;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Drains the request queue, identifying each queued work against the
/// providers and pushing the result to the catalog.
///
/// Wakeups come from `LISTEN scanner_requests` on a dedicated connection,
/// pool connections serve every other query.
pub struct RequestProcessor {
    pool: PgPool,
    queue: &'static RequestQueue,
    catalog: &'static CatalogClient,
    providers: &'static CompositeProvider,
}

impl RequestProcessor {
    pub fn new(
        pool: PgPool,
        queue: &'static RequestQueue,
        catalog: &'static CatalogClient,
        providers: &'static CompositeProvider,
    ) -> Self {
        Self {
            pool,
            queue,
            catalog,
            providers,
        }
    }

    pub async fn run(&self, token: CancellationToken) {
        while !token.is_cancelled() {
            match self.listen(&token).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::error!("Request processor lost its database connection: {e}");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
        tracing::info!("Request processor stopped");
    }

    async fn listen(&self, token: &CancellationToken) -> anyhow::Result<()> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen("scanner_requests").await?;
        tracing::info!("Listening for scanner requests");
        // Whatever queued up while we were away.
        self.drain().await?;
        loop {
            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                notification = listener.recv() => {
                    notification?;
                    self.drain().await?;
                }
            }
        }
    }

    /// Process requests until the queue is empty. Per-request failures mark
    /// the row failed and move on, only losing the database stops the
    /// drain.
    async fn drain(&self) -> anyhow::Result<()> {
        while let Some(request) = self.queue.dequeue().await? {
            tracing::info!("Starting to process {}", request.title);
            if let Err(e) = self.process(&request).await {
                tracing::error!("Couldn't process request for {}: {e}", request.title);
                if let Err(e) = self.queue.fail(request.pk).await {
                    tracing::error!("Couldn't mark the request as failed: {e}");
                }
            }
        }
        Ok(())
    }

    async fn process(&self, request: &Request) -> anyhow::Result<()> {
        let resource = self.run_request(request).await?;
        let final_videos = self.queue.complete(request.pk).await?;
        let merged = new_videos(&request.videos, &final_videos);
        if !merged.is_empty() {
            tracing::info!(
                "{} grew by {} videos while running, linking them",
                request.title,
                merged.len()
            );
            let links = link_targets(request.kind, &resource.slug, &merged);
            self.catalog.link_videos(&links).await?;
        }
        Ok(())
    }

    async fn run_request(&self, request: &Request) -> anyhow::Result<Resource> {
        match request.kind {
            RequestKind::Movie => {
                let mut movie = self
                    .providers
                    .find_movie(&request.title, request.year, &request.external_id)
                    .await?;
                movie.videos = request.videos.iter().map(|v| v.id.clone()).collect();
                self.catalog.create_movie(&movie).await
            }
            RequestKind::Episode => {
                let mut serie = self
                    .providers
                    .find_serie(&request.title, request.year, &request.external_id)
                    .await?;
                for video in &request.videos {
                    for episode in &video.episodes {
                        let mut found = find_entry(&serie.entries, episode);
                        if found.is_none() && episode.season.is_none() {
                            // Scene absolute numbers sometimes only make
                            // sense through the xem mapping.
                            if let Some((season, number)) = self
                                .providers
                                .resolve_absolute(&serie, &request.title, episode.episode)
                                .await
                            {
                                found = find_entry(
                                    &serie.entries,
                                    &GuessEpisode {
                                        season: Some(season),
                                        episode: number,
                                    },
                                );
                            }
                        }
                        match found {
                            Some(index) => serie.entries[index].videos.push(video.id.clone()),
                            None => tracing::warn!(
                                "Couldn't match entry for {} {}-e{}",
                                serie.slug,
                                episode
                                    .season
                                    .map(|s| s.to_string())
                                    .unwrap_or_else(|| "abs".to_string()),
                                episode.episode
                            ),
                        }
                    }
                }
                self.catalog.create_serie(&serie).await
            }
        }
    }
}

/// An episode with a season matches on `(season, episode)`, an absolute
/// number matches the entry's global order.
fn find_entry(entries: &[Entry], episode: &GuessEpisode) -> Option<usize> {
    entries.iter().position(|entry| match episode.season {
        None => entry.order == episode.episode as f64,
        Some(season) => {
            entry.season_number == Some(season) && entry.episode_number == Some(episode.episode)
        }
    })
}

/// Videos present in `after` but not in `before`, in `after` order.
fn new_videos(before: &[RequestVideo], after: &[RequestVideo]) -> Vec<RequestVideo> {
    after
        .iter()
        .filter(|video| !before.iter().any(|known| known.id == video.id))
        .cloned()
        .collect()
}

fn link_targets(kind: RequestKind, slug: &str, videos: &[RequestVideo]) -> Vec<VideoLink> {
    videos
        .iter()
        .map(|video| {
            let for_ = match kind {
                RequestKind::Movie => vec![VideoTarget::Movie {
                    movie: slug.to_string(),
                }],
                RequestKind::Episode => video
                    .episodes
                    .iter()
                    .map(|episode| match episode.season {
                        Some(0) => VideoTarget::Special {
                            serie: slug.to_string(),
                            special: episode.episode,
                        },
                        Some(season) => VideoTarget::Episode {
                            serie: slug.to_string(),
                            season,
                            episode: episode.episode,
                        },
                        None => VideoTarget::Order {
                            serie: slug.to_string(),
                            order: episode.episode as f64,
                        },
                    })
                    .collect(),
            };
            VideoLink {
                id: video.id.clone(),
                for_,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::entry::EntryKind;

    fn entry(season: u32, episode: u32, order: f64) -> Entry {
        Entry {
            kind: EntryKind::Episode,
            order,
            runtime: None,
            air_date: None,
            thumbnail: None,
            slug: None,
            season_number: Some(season),
            episode_number: Some(episode),
            number: Some(episode),
            external_id: HashMap::new(),
            translations: HashMap::new(),
            videos: Vec::new(),
        }
    }

    fn video(id: &str, episodes: &[(Option<u32>, u32)]) -> RequestVideo {
        RequestVideo {
            id: id.to_string(),
            episodes: episodes
                .iter()
                .map(|(season, episode)| GuessEpisode {
                    season: *season,
                    episode: *episode,
                })
                .collect(),
        }
    }

    #[test]
    fn entries_match_by_coordinates_or_order() {
        let entries = vec![entry(1, 1, 1.0), entry(1, 2, 2.0), entry(21, 89, 1089.0)];
        let by_coordinates = find_entry(
            &entries,
            &GuessEpisode {
                season: Some(1),
                episode: 2,
            },
        );
        assert_eq!(by_coordinates, Some(1));

        let by_order = find_entry(
            &entries,
            &GuessEpisode {
                season: None,
                episode: 1089,
            },
        );
        assert_eq!(by_order, Some(2));

        let missing = find_entry(
            &entries,
            &GuessEpisode {
                season: Some(4),
                episode: 2,
            },
        );
        assert_eq!(missing, None);
    }

    #[test]
    fn concurrent_enqueue_delta_is_linked() {
        // The worker dequeued [A], another enqueue merged B meanwhile.
        let before = vec![video("A", &[(Some(1), 1)])];
        let after = vec![video("A", &[(Some(1), 1)]), video("B", &[(Some(1), 2)])];
        let delta = new_videos(&before, &after);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].id, "B");

        let links = link_targets(RequestKind::Episode, "attack-on-titan", &delta);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, "B");
        assert_eq!(
            links[0].for_,
            vec![VideoTarget::Episode {
                serie: "attack-on-titan".to_string(),
                season: 1,
                episode: 2
            }]
        );
    }

    #[test]
    fn link_targets_cover_every_episode_shape() {
        let videos = vec![video("V", &[(Some(0), 3), (Some(2), 5), (None, 1089)])];
        let links = link_targets(RequestKind::Episode, "one-piece", &videos);
        assert_eq!(
            links[0].for_,
            vec![
                VideoTarget::Special {
                    serie: "one-piece".to_string(),
                    special: 3
                },
                VideoTarget::Episode {
                    serie: "one-piece".to_string(),
                    season: 2,
                    episode: 5
                },
                VideoTarget::Order {
                    serie: "one-piece".to_string(),
                    order: 1089.0
                },
            ]
        );

        let movie_links = link_targets(RequestKind::Movie, "inception", &videos);
        assert_eq!(
            movie_links[0].for_,
            vec![VideoTarget::Movie {
                movie: "inception".to_string()
            }]
        );
    }
}
