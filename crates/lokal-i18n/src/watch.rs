//! Resource directory watching for hot reload.

use crate::error::{I18nError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TrySendError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pending changes beyond this are dropped; a reload is already queued.
const QUEUE_CAPACITY: usize = 64;
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const WORKER_NAME: &str = "lokal-hot-reload";

/// What happened to a resource file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A change to one resource file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Map a raw notify event onto a resource change, if it concerns a file
/// with the given extension.
pub fn classify_event(event: &Event, extension: &str) -> Option<ResourceChange> {
    let kind = match &event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => return None,
    };

    // Renames report both ends; take the one that is a resource file.
    let path = event.paths.iter().find(|path| {
        path.extension().and_then(|e| e.to_str()) == Some(extension)
            && (kind == ChangeKind::Removed || !path.is_dir())
    })?;

    Some(ResourceChange {
        path: path.clone(),
        kind,
    })
}

/// Watches a resource directory and hands changes to a worker thread.
///
/// The notify callback only classifies events and queues them; the
/// handler runs on the worker, so it never executes inside the watch
/// library's delivery thread.
pub struct HotReloadWatcher {
    directory: PathBuf,
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl HotReloadWatcher {
    /// Start watching `directory` for files ending in `.extension`.
    pub fn start<F>(directory: impl AsRef<Path>, extension: &str, handler: F) -> Result<Self>
    where
        F: Fn(&ResourceChange) + Send + 'static,
    {
        let directory = directory.as_ref().to_path_buf();
        let extension = extension.trim_start_matches('.').to_string();
        let (tx, rx) = bounded::<ResourceChange>(QUEUE_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "watch error");
                    return;
                }
            };
            if let Some(change) = classify_event(&event, &extension) {
                match tx.try_send(change) {
                    Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                    Err(TrySendError::Full(change)) => {
                        debug!(path = %change.path.display(), "reload queue full, dropping change");
                    }
                }
            }
        })?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let signal = Arc::clone(&shutdown);
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || run_worker(rx, signal, handler))
            .map_err(|e| I18nError::io(&directory, e))?;

        info!(directory = %directory.display(), "hot reload watching");
        Ok(Self {
            directory,
            watcher: Some(watcher),
            worker: Some(worker),
            shutdown,
        })
    }

    /// The watched directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// False once stopped or after the worker has exited.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Stop watching and wait for the worker, at most five seconds.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Dropping the watcher drops the queue's sender.
        self.watcher.take();

        let Some(worker) = self.worker.take() else {
            return;
        };

        let deadline = Instant::now() + STOP_TIMEOUT;
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        if worker.is_finished() {
            if worker.join().is_err() {
                warn!("hot reload worker panicked");
            }
            info!(directory = %self.directory.display(), "hot reload watcher stopped");
        } else {
            warn!(
                directory = %self.directory.display(),
                "hot reload worker did not stop in time, detaching"
            );
        }
    }
}

impl Drop for HotReloadWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HotReloadWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotReloadWatcher")
            .field("directory", &self.directory)
            .field("watching", &self.is_watching())
            .finish()
    }
}

fn run_worker<F>(rx: Receiver<ResourceChange>, shutdown: Arc<AtomicBool>, handler: F)
where
    F: Fn(&ResourceChange),
{
    while !shutdown.load(Ordering::SeqCst) {
        let first = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(change) => change,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        // Editors emit bursts of events per save; handle each file once.
        let mut batch = vec![first];
        for change in rx.try_iter() {
            if !batch.iter().any(|seen| seen.path == change.path) {
                batch.push(change);
            }
        }

        for change in &batch {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            info!(path = %change.path.display(), kind = ?change.kind, "resource file changed");
            handler(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};
    use tempfile::TempDir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_classify_event() {
        let created = event(EventKind::Create(CreateKind::File), &["/l10n/app_en.arb"]);
        assert_eq!(
            classify_event(&created, "arb"),
            Some(ResourceChange {
                path: PathBuf::from("/l10n/app_en.arb"),
                kind: ChangeKind::Created,
            })
        );

        let modified = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/l10n/app_en.arb"],
        );
        assert_eq!(classify_event(&modified, "arb").unwrap().kind, ChangeKind::Modified);

        let removed = event(EventKind::Remove(RemoveKind::File), &["/l10n/app_en.arb"]);
        assert_eq!(classify_event(&removed, "arb").unwrap().kind, ChangeKind::Removed);
    }

    #[test]
    fn test_classify_ignores_other_files_and_kinds() {
        let other_ext = event(EventKind::Create(CreateKind::File), &["/l10n/readme.md"]);
        assert!(classify_event(&other_ext, "arb").is_none());

        let access = event(EventKind::Access(AccessKind::Read), &["/l10n/app_en.arb"]);
        assert!(classify_event(&access, "arb").is_none());
    }

    #[test]
    fn test_classify_rename_picks_resource_path() {
        let rename = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/l10n/.app_en.arb.tmp", "/l10n/app_en.arb"],
        );
        assert_eq!(
            classify_event(&rename, "arb").unwrap().path,
            PathBuf::from("/l10n/app_en.arb")
        );
    }

    #[test]
    fn test_watcher_delivers_changes() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut watcher = HotReloadWatcher::start(dir.path(), "arb", move |change| {
            let _ = tx.send(change.clone());
        })
        .unwrap();
        assert!(watcher.is_watching());

        std::fs::write(dir.path().join("app_en.arb"), r#"{ "a": "b" }"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let change = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(change.path.file_name().unwrap(), "app_en.arb");

        watcher.stop();
        assert!(!watcher.is_watching());
    }

    #[test]
    fn test_start_on_missing_directory_fails() {
        let result = HotReloadWatcher::start("/nonexistent/lokal/l10n", "arb", |_| {});
        assert!(result.is_err());
    }
}
