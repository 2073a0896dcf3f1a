use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

use super::FsScanner;

#[derive(Debug)]
pub enum LibraryEvent {
    Added(PathBuf),
    Removed(PathBuf),
}

fn spawn_watcher(path: impl AsRef<Path>) -> notify::Result<(RecommendedWatcher, Receiver<LibraryEvent>)> {
    let (tx, rx) = tokio::sync::mpsc::channel(100);
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Watch error: {e}");
                    return;
                }
            };
            let mapped = match event.kind {
                EventKind::Create(_) => LibraryEvent::Added,
                EventKind::Remove(_) => LibraryEvent::Removed,
                // Writes to known files change nothing we track.
                _ => return,
            };
            for path in event.paths {
                if tx.blocking_send(mapped(path.clone())).is_err() {
                    tracing::error!("Watch channel closed");
                    return;
                }
            }
        },
        Default::default(),
    )?;

    watcher.watch(path.as_ref(), RecursiveMode::Recursive)?;
    Ok((watcher, rx))
}

/// Watch the library root and keep the catalog in sync file by file.
pub async fn monitor(scanner: &FsScanner, token: CancellationToken) -> anyhow::Result<()> {
    let root = scanner.library_root();
    let (_watcher, mut rx) = spawn_watcher(root)?;
    tracing::info!("Watching library at {}", root.display());

    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => anyhow::bail!("watcher channel closed"),
            },
        };
        if let Err(e) = handle_event(scanner, event).await {
            tracing::error!("Couldn't handle library event: {e}");
        }
    }
    Ok(())
}

async fn handle_event(scanner: &FsScanner, event: LibraryEvent) -> anyhow::Result<()> {
    match event {
        LibraryEvent::Added(path) => {
            let path_display = path.to_string_lossy().to_string();
            if scanner.is_ignored(&path_display) {
                return Ok(());
            }
            if tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
                tracing::info!("New directory {path_display}, scanning it");
                scanner.scan_directory(&path).await
            } else {
                tracing::info!("New file {path_display}");
                scanner.register_file(&path_display).await
            }
        }
        LibraryEvent::Removed(path) => {
            let path_display = path.to_string_lossy().to_string();
            tracing::info!("Deleted path {path_display}");
            scanner.delete_file(&path_display).await
        }
    }
}
