use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use resviz_core::{has_extension, is_ignored_path};

use crate::StoreError;

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub extension: String,
    pub debounce: Duration,
    pub poll_interval: Duration,
}

pub struct PathWatcher {
    _watcher: PollWatcher,
    stop: Arc<AtomicBool>,
    root: PathBuf,
}

impl PathWatcher {
    pub fn spawn<F>(root: &Path, settings: WatchSettings, mut on_due: F) -> Result<Self, StoreError>
    where
        F: FnMut(Vec<PathBuf>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = PollWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            Config::default().with_poll_interval(settings.poll_interval),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let worker_root = root.to_path_buf();

        thread::Builder::new()
            .name("resviz-watch".to_owned())
            .spawn(move || {
                let mut queue = DebounceQueue::default();

                while !worker_stop.load(Ordering::Acquire) {
                    match rx.recv_timeout(TICK) {
                        Ok(result) => {
                            enqueue_event_paths(&worker_root, &settings.extension, result, &mut queue)
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }

                    while let Ok(result) = rx.try_recv() {
                        enqueue_event_paths(&worker_root, &settings.extension, result, &mut queue);
                    }

                    let due = queue.drain_due(Instant::now(), settings.debounce);
                    if !due.is_empty() && !worker_stop.load(Ordering::Acquire) {
                        on_due(due);
                    }
                }

                tracing::debug!(root = %worker_root.display(), "watch loop stopped");
            })?;

        tracing::info!(root = %root.display(), "watching for changes");

        Ok(Self {
            _watcher: watcher,
            stop,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for PathWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct DebounceQueue {
    pending: HashMap<PathBuf, Instant>,
}

impl DebounceQueue {
    pub fn mark(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path, now);
    }

    pub fn drain_due(&mut self, now: Instant, debounce: Duration) -> Vec<PathBuf> {
        let mut due = Vec::new();

        self.pending.retain(|path, last_seen| {
            if now.duration_since(*last_seen) >= debounce {
                due.push(path.clone());
                false
            } else {
                true
            }
        });

        due.sort();
        due
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn enqueue_event_paths(
    root: &Path,
    extension: &str,
    event: notify::Result<Event>,
    queue: &mut DebounceQueue,
) {
    let event = match event {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "watch event error");
            return;
        }
    };

    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    let now = Instant::now();
    for path in event.paths {
        if !is_watched_path(root, &path, extension) {
            continue;
        }
        queue.mark(path, now);
    }
}

pub fn is_watched_path(root: &Path, path: &Path, extension: &str) -> bool {
    if !has_extension(path, extension) || path.is_dir() {
        return false;
    }

    let relative = path.strip_prefix(root).unwrap_or(path);
    !is_ignored_path(relative)
}
