use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::models::request::{Request, RequestKind, RequestVideo};
use crate::models::videos::{GuessKind, Video, VideoCreated, VideoInfo, VideoTarget};
use crate::parser;
use crate::providers::thexem::TheXem;
use crate::queue::RequestQueue;

pub mod monitor;

/// Videos are POSTed to the catalog in batches of this size.
const REGISTER_BATCH: usize = 100;

/// Walks the library, reconciles it against the catalog and enqueues
/// identification requests for everything the catalog can't match on its
/// own.
#[derive(Debug)]
pub struct FsScanner {
    config: Config,
    catalog: &'static CatalogClient,
    queue: &'static RequestQueue,
    xem: &'static TheXem,
}

pub(crate) enum ScanDelta {
    Proceed {
        to_register: Vec<String>,
        to_delete: Vec<String>,
    },
    /// Everything known is gone at once: a disk dropped, not a cleanup.
    DiskUnavailable,
}

impl FsScanner {
    pub fn new(
        config: Config,
        catalog: &'static CatalogClient,
        queue: &'static RequestQueue,
        xem: &'static TheXem,
    ) -> Self {
        Self {
            config,
            catalog,
            queue,
            xem,
        }
    }

    pub fn library_root(&self) -> &Path {
        &self.config.library_root
    }

    /// Full scan of the library root.
    pub async fn scan(&self, remove_deleted: bool) -> anyhow::Result<()> {
        let root = self.config.library_root.clone();
        tracing::info!("Starting scan at {}. This may take some time...", root.display());
        self.queue.clear_failed().await?;

        let ignore = self.config.ignore_pattern.clone();
        let videos = tokio::task::spawn_blocking(move || walk_videos(&root, ignore.as_ref()))
            .await?;

        let info = self.catalog.get_videos_info().await?;
        let (to_register, to_delete) =
            match compute_delta(&videos, &info.paths, remove_deleted) {
                ScanDelta::Proceed {
                    to_register,
                    to_delete,
                } => (to_register, to_delete),
                ScanDelta::DiskUnavailable => {
                    tracing::warn!("All video files are unavailable. Check your disks.");
                    return Ok(());
                }
            };

        // Delete stale files before creating new ones to prevent conflicts.
        if !to_delete.is_empty() {
            tracing::info!("Removing {} stale files", to_delete.len());
            self.catalog.delete_videos(&to_delete).await?;
        }

        // Paths the catalog knows but never matched get another chance too.
        let mut paths = to_register;
        paths.extend(
            info.unmatched
                .iter()
                .filter(|path| videos.contains(*path))
                .cloned(),
        );
        if !paths.is_empty() {
            tracing::info!("Found {} files to identify", paths.len());
            self.register(paths, &info).await?;
        }
        tracing::info!("Scan finished for {}", self.config.library_root.display());
        Ok(())
    }

    /// Scan one directory that just appeared, nothing is deleted.
    pub async fn scan_directory(&self, directory: &Path) -> anyhow::Result<()> {
        let directory = directory.to_path_buf();
        let ignore = self.config.ignore_pattern.clone();
        let videos =
            tokio::task::spawn_blocking(move || walk_videos(&directory, ignore.as_ref())).await?;
        let info = self.catalog.get_videos_info().await?;
        let paths: Vec<String> = videos
            .into_iter()
            .filter(|path| !info.paths.contains(path))
            .collect();
        if !paths.is_empty() {
            self.register(paths, &info).await?;
        }
        Ok(())
    }

    /// Register a single new file, used by the watcher.
    pub async fn register_file(&self, path: &str) -> anyhow::Result<()> {
        if self.is_ignored(path) || !is_video(Path::new(path)) {
            return Ok(());
        }
        let info = self.catalog.get_videos_info().await?;
        if info.paths.contains(path) {
            return Ok(());
        }
        self.register(vec![path.to_string()], &info).await
    }

    pub async fn delete_file(&self, path: &str) -> anyhow::Result<()> {
        self.catalog.delete_videos(&[path.to_string()]).await
    }

    pub(crate) fn is_ignored(&self, path: &str) -> bool {
        self.config
            .ignore_pattern
            .as_ref()
            .map(|re| re.is_match(path))
            .unwrap_or(false)
    }

    /// Parse paths, POST the videos and enqueue whatever the catalog could
    /// not match to an existing work. Parse failures become catalog issues,
    /// one bad file never stops the batch.
    async fn register(&self, paths: Vec<String>, info: &VideoInfo) -> anyhow::Result<()> {
        let expected_titles = match self.xem.get_expected_titles("tvdb").await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!("Identifying without the xem expected titles: {e}");
                Vec::new()
            }
        };

        let mut videos = Vec::with_capacity(paths.len());
        for path in &paths {
            match parser::identify(path, &expected_titles) {
                Ok(mut video) => {
                    video.for_ = video_targets(&video, info);
                    videos.push(video);
                    // A path that parses again stops being an issue.
                    if let Err(e) = self.catalog.delete_issue(path).await {
                        tracing::debug!("Couldn't clear issue for {path}: {e}");
                    }
                }
                Err(e) => {
                    tracing::warn!("{e}");
                    if let Err(issue) = self.catalog.create_issue(&e.path, &e.reason).await {
                        tracing::error!("Couldn't report the issue: {issue}");
                    }
                }
            }
        }

        for batch in videos.chunks(REGISTER_BATCH) {
            let created = self.catalog.create_videos(batch).await?;
            let requests: Vec<Request> = created.iter().filter_map(request_from).collect();
            if !requests.is_empty() {
                self.queue.enqueue(&requests).await?;
            }
        }
        Ok(())
    }
}

/// New and stale paths relative to the catalog, with the disk-unavailable
/// interlock.
pub(crate) fn compute_delta(
    fs: &HashSet<String>,
    catalog: &HashSet<String>,
    remove_deleted: bool,
) -> ScanDelta {
    let to_register: Vec<String> = fs.difference(catalog).cloned().collect();
    let to_delete: Vec<String> = if remove_deleted {
        catalog.difference(fs).cloned().collect()
    } else {
        Vec::new()
    };

    if to_register.is_empty() && !to_delete.is_empty() && to_delete.len() == catalog.len() {
        return ScanDelta::DiskUnavailable;
    }
    ScanDelta::Proceed {
        to_register,
        to_delete,
    }
}

pub(crate) fn is_video(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::VIDEO)
        .unwrap_or(false)
}

/// Every video file under `root`, skipping `.ignore`-marked directories and
/// the configured ignore pattern.
fn walk_videos(root: &Path, ignore: Option<&Regex>) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut walker = WalkDir::new(root).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {e}");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            if entry.path().join(".ignore").exists() {
                walker.skip_current_dir();
            }
            continue;
        }
        let path = entry.path().to_string_lossy().to_string();
        if ignore.map(|re| re.is_match(&path)).unwrap_or(false) {
            continue;
        }
        if !is_video(entry.path()) {
            continue;
        }
        out.insert(path);
    }
    out
}

/// Targets hinting the catalog at what a parsed video belongs to, from its
/// own `guesses` map and the ids the parser extracted.
fn video_targets(video: &Video, info: &VideoInfo) -> Vec<VideoTarget> {
    let guess = &video.guess;
    let mut targets = Vec::new();

    let known = info.guesses.get(&guess.title);
    let mut slugs: Vec<&str> = Vec::new();
    if let Some(by_year) = known {
        let mut keys: Vec<String> = guess.years.iter().map(|y| y.to_string()).collect();
        keys.push("unknown".to_string());
        for key in keys {
            if let Some(resource) = by_year.get(&key) {
                if !slugs.contains(&resource.slug.as_str()) {
                    slugs.push(&resource.slug);
                }
            }
        }
    }

    for slug in &slugs {
        match guess.kind {
            GuessKind::Movie => targets.push(VideoTarget::Movie {
                movie: slug.to_string(),
            }),
            GuessKind::Episode => {
                for episode in &guess.episodes {
                    targets.push(match episode.season {
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
                    });
                }
            }
            GuessKind::Extra => targets.push(VideoTarget::Slug {
                slug: slug.to_string(),
            }),
        }
    }

    if !guess.external_id.is_empty() {
        targets.push(VideoTarget::ExternalId {
            external_id: guess
                .external_id
                .iter()
                .map(|(provider, id)| {
                    (
                        provider.clone(),
                        crate::models::metadata_id::EntryId::Metadata(
                            crate::models::metadata_id::MetadataId::new(id),
                        ),
                    )
                })
                .collect(),
        });
    }

    targets
}

/// An identification request for a video the catalog couldn't match.
/// Extras are never identified against providers.
fn request_from(created: &VideoCreated) -> Option<Request> {
    if !created.entries.is_empty() {
        return None;
    }
    let kind = match created.guess.kind {
        GuessKind::Movie => RequestKind::Movie,
        GuessKind::Episode => RequestKind::Episode,
        GuessKind::Extra => return None,
    };
    Some(Request {
        pk: 0,
        kind,
        title: created.guess.title.clone(),
        year: created.guess.years.first().copied(),
        external_id: created.guess.external_id.clone(),
        videos: vec![RequestVideo {
            id: created.id.clone(),
            episodes: created.guess.episodes.clone(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::videos::{EntryRef, Guess, GuessEpisode, Resource};

    fn paths(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn scan_is_idempotent_on_no_change() {
        let fs = paths(&["/v/a.mkv", "/v/b.mkv"]);
        let catalog = fs.clone();
        match compute_delta(&fs, &catalog, true) {
            ScanDelta::Proceed {
                to_register,
                to_delete,
            } => {
                assert!(to_register.is_empty());
                assert!(to_delete.is_empty());
            }
            ScanDelta::DiskUnavailable => panic!("no change is not a dead disk"),
        }
    }

    #[test]
    fn losing_every_file_aborts_deletions() {
        let fs = paths(&[]);
        let catalog = paths(&["/v/a.mkv", "/v/b.mkv"]);
        assert!(matches!(
            compute_delta(&fs, &catalog, true),
            ScanDelta::DiskUnavailable
        ));
        // without remove_deleted there is nothing to protect
        assert!(matches!(
            compute_delta(&fs, &catalog, false),
            ScanDelta::Proceed { .. }
        ));
    }

    #[test]
    fn partial_loss_still_deletes() {
        let fs = paths(&["/v/a.mkv"]);
        let catalog = paths(&["/v/a.mkv", "/v/b.mkv"]);
        match compute_delta(&fs, &catalog, true) {
            ScanDelta::Proceed {
                to_register,
                to_delete,
            } => {
                assert!(to_register.is_empty());
                assert_eq!(to_delete, vec!["/v/b.mkv".to_string()]);
            }
            ScanDelta::DiskUnavailable => panic!("one file left is not a dead disk"),
        }
    }

    #[test]
    fn video_classification() {
        assert!(is_video(Path::new("/v/a.mkv")));
        assert!(is_video(Path::new("/v/a.mp4")));
        assert!(!is_video(Path::new("/v/a.srt")));
        assert!(!is_video(Path::new("/v/a.nfo")));
    }

    fn guess(title: &str, kind: GuessKind, years: &[i32], episodes: &[(Option<u32>, u32)]) -> Guess {
        Guess {
            title: title.to_string(),
            kind,
            extra_kind: None,
            years: years.to_vec(),
            episodes: episodes
                .iter()
                .map(|(season, episode)| GuessEpisode {
                    season: *season,
                    episode: *episode,
                })
                .collect(),
            external_id: HashMap::new(),
            from_: "parser".to_string(),
            raw: serde_json::Value::Null,
            history: Vec::new(),
        }
    }

    fn info_with_guess(title: &str, year: &str, slug: &str) -> VideoInfo {
        VideoInfo {
            paths: HashSet::new(),
            unmatched: HashSet::new(),
            guesses: HashMap::from([(
                title.to_string(),
                HashMap::from([(
                    year.to_string(),
                    Resource {
                        id: "id".to_string(),
                        slug: slug.to_string(),
                    },
                )]),
            )]),
        }
    }

    #[test]
    fn known_shows_produce_episode_targets() {
        let video = Video {
            path: "/v/One Piece (1999) 1089.mkv".to_string(),
            rendering: String::new(),
            part: None,
            version: 1,
            guess: guess(
                "One Piece",
                GuessKind::Episode,
                &[1999],
                &[(None, 1089)],
            ),
            for_: Vec::new(),
        };
        let info = info_with_guess("One Piece", "1999", "one-piece");
        let targets = video_targets(&video, &info);
        assert_eq!(
            targets,
            vec![VideoTarget::Order {
                serie: "one-piece".to_string(),
                order: 1089.0
            }]
        );
    }

    #[test]
    fn unknown_year_falls_back() {
        let video = Video {
            path: "/v/Inception.mkv".to_string(),
            rendering: String::new(),
            part: None,
            version: 1,
            guess: guess("Inception", GuessKind::Movie, &[], &[]),
            for_: Vec::new(),
        };
        let info = info_with_guess("Inception", "unknown", "inception");
        let targets = video_targets(&video, &info);
        assert_eq!(
            targets,
            vec![VideoTarget::Movie {
                movie: "inception".to_string()
            }]
        );
    }

    #[test]
    fn unmatched_creation_becomes_a_request() {
        let created = VideoCreated {
            id: "video-1".to_string(),
            path: "/v/Inception (2010).mkv".to_string(),
            guess: guess("Inception", GuessKind::Movie, &[2010], &[]),
            entries: Vec::new(),
        };
        let request = request_from(&created).unwrap();
        assert_eq!(request.kind, RequestKind::Movie);
        assert_eq!(request.title, "Inception");
        assert_eq!(request.year, Some(2010));
        assert_eq!(request.videos.len(), 1);
        assert_eq!(request.videos[0].id, "video-1");
    }

    #[test]
    fn matched_or_extra_videos_are_not_enqueued() {
        let matched = VideoCreated {
            id: "video-1".to_string(),
            path: "/v/a.mkv".to_string(),
            guess: guess("A", GuessKind::Movie, &[], &[]),
            entries: vec![EntryRef {
                slug: "a".to_string(),
            }],
        };
        assert!(request_from(&matched).is_none());

        let extra = VideoCreated {
            id: "video-2".to_string(),
            path: "/v/b.mkv".to_string(),
            guess: guess("B", GuessKind::Extra, &[], &[]),
            entries: Vec::new(),
        };
        assert!(request_from(&extra).is_none());
    }
}
