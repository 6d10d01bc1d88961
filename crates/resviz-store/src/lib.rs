mod resx;
mod snapshot;
mod watch;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use resviz_core::{ResourceTable, is_resource_of_interest, normalize_path};
use thiserror::Error;

pub use resx::{ResourceReader, ResxReader, parse_resx};
pub use snapshot::StoreSnapshot;
pub use watch::{DebounceQueue, PathWatcher, WatchSettings, is_watched_path};

pub const DEFAULT_RELOAD_ATTEMPTS: u32 = 5;
pub const DEFAULT_RELOAD_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed resource file {path}: {message}")]
    Malformed { path: String, message: String },
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RELOAD_ATTEMPTS,
            backoff_step: DEFAULT_RELOAD_BACKOFF,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub preferred_culture: String,
    pub resource_extension: String,
    pub retry: RetryPolicy,
    pub debounce: Duration,
    pub poll_interval: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            preferred_culture: String::new(),
            resource_extension: "resx".to_owned(),
            retry: RetryPolicy::default(),
            debounce: Duration::from_millis(300),
            poll_interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Updated,
    Added,
    Unchanged,
    Removed,
    Ignored,
    Failed,
}

pub struct ResourceStore {
    snapshot: ArcSwap<StoreSnapshot>,
    loaded: AtomicBool,
    generation: AtomicU64,
    options: RwLock<StoreOptions>,
    reader: Arc<dyn ResourceReader>,
    reload_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    watcher: Mutex<Option<PathWatcher>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::with_reader(Arc::new(ResxReader))
    }

    pub fn with_reader(reader: Arc<dyn ResourceReader>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(StoreSnapshot::default()),
            loaded: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            options: RwLock::new(StoreOptions::default()),
            reader,
            reload_guards: Mutex::new(HashMap::new()),
            watcher: Mutex::new(None),
        }
    }

    pub fn load_all(
        self: &Arc<Self>,
        files: &[PathBuf],
        root_dir: &Path,
        options: StoreOptions,
    ) -> LoadSummary {
        let summary = self.load_tables(files, options);

        if let Err(err) = self.watch(root_dir) {
            tracing::warn!(
                root = %root_dir.display(),
                error = %err,
                "failed to watch resource files, changes will not be picked up"
            );
        }

        summary
    }

    pub fn load_tables(&self, files: &[PathBuf], options: StoreOptions) -> LoadSummary {
        self.loaded.store(false, Ordering::Release);
        let preferred_culture = options.preferred_culture.clone();
        *write_lock(&self.options) = options;

        self.snapshot.store(Arc::new(StoreSnapshot::new(
            self.next_generation(),
            preferred_culture.clone(),
            IndexMap::new(),
        )));

        let mut summary = LoadSummary::default();
        let mut tables = IndexMap::new();

        for file in files {
            match self.reader.read_table(file) {
                Ok(table) => {
                    summary.loaded += 1;
                    tables
                        .entry(table.path.clone())
                        .or_insert_with(|| Arc::new(table));
                }
                Err(err) => {
                    summary.skipped += 1;
                    tracing::warn!(
                        path = %file.display(),
                        error = %err,
                        "skipping resource file"
                    );
                }
            }
        }

        let snapshot = StoreSnapshot::new(self.next_generation(), preferred_culture, tables);
        tracing::info!(
            tables = snapshot.len(),
            search_terms = snapshot.search_terms().len(),
            skipped = summary.skipped,
            "resource tables loaded"
        );

        self.snapshot.store(Arc::new(snapshot));
        self.loaded.store(true, Ordering::Release);

        summary
    }

    pub fn watch(self: &Arc<Self>, root_dir: &Path) -> Result<(), StoreError> {
        let options = self.options();
        let store = Arc::downgrade(self);

        let watcher = PathWatcher::spawn(
            root_dir,
            WatchSettings {
                extension: options.resource_extension.clone(),
                debounce: options.debounce,
                poll_interval: options.poll_interval,
            },
            move |paths| {
                let Some(store) = store.upgrade() else {
                    return;
                };

                let spawned = thread::Builder::new()
                    .name("resviz-reload".to_owned())
                    .spawn(move || store.reload_batch(&paths));
                if let Err(err) = spawned {
                    tracing::error!(error = %err, "failed to spawn resource reload");
                }
            },
        )?;

        *lock(&self.watcher) = Some(watcher);
        Ok(())
    }

    fn reload_batch(&self, paths: &[PathBuf]) {
        for path in paths {
            let outcome = self.reload_one(path);
            tracing::info!(
                path = %path.display(),
                outcome = ?outcome,
                "resource file changed"
            );
        }
    }

    pub fn stop_watching(&self) {
        lock(&self.watcher).take();
    }

    pub fn reload_one(&self, path: &Path) -> ReloadOutcome {
        let key = normalize_path(&path.to_string_lossy());
        let guard = self.reload_guard(&key);
        let outcome = {
            let _serialized = lock(&guard);
            self.reload_serialized(&key, path)
        };
        self.release_reload_guard(&key, guard);
        outcome
    }

    fn reload_serialized(&self, key: &str, path: &Path) -> ReloadOutcome {
        let options = self.options();
        let previous = self.snapshot.load().table(key).cloned();

        if !path.exists() {
            if previous.is_none() {
                return ReloadOutcome::Ignored;
            }
            self.snapshot
                .rcu(|current| current.without_table(key, self.next_generation()));
            tracing::info!(path = %key, "resource file removed");
            return ReloadOutcome::Removed;
        }

        if previous.is_none() && !is_resource_of_interest(path, &options.preferred_culture) {
            return ReloadOutcome::Ignored;
        }

        let attempts = options.retry.attempts;
        for attempt in 1..=attempts {
            match self.reader.read_table(path) {
                Ok(table) => {
                    if previous
                        .as_ref()
                        .is_some_and(|old| old.content_hash == table.content_hash)
                    {
                        return ReloadOutcome::Unchanged;
                    }

                    let table = Arc::new(table);
                    self.snapshot
                        .rcu(|current| current.with_table(Arc::clone(&table), self.next_generation()));

                    return if previous.is_some() {
                        ReloadOutcome::Updated
                    } else {
                        ReloadOutcome::Added
                    };
                }
                Err(err) if attempt < attempts => {
                    let delay = options.retry.delay_after(attempt);
                    tracing::debug!(
                        path = %key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "resource reload failed, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(err) => {
                    tracing::warn!(
                        path = %key,
                        attempts,
                        error = %err,
                        "giving up on resource reload, keeping previous version"
                    );
                }
            }
        }

        ReloadOutcome::Failed
    }

    pub fn current(&self) -> Option<Arc<StoreSnapshot>> {
        if self.loaded.load(Ordering::Acquire) {
            Some(self.snapshot.load_full())
        } else {
            None
        }
    }

    pub fn query(&self, base_names: &[&str], preferred_culture: &str) -> Vec<Arc<ResourceTable>> {
        self.current()
            .map(|snapshot| snapshot.query(base_names, preferred_culture))
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn options(&self) -> StoreOptions {
        read_lock(&self.options).clone()
    }

    pub fn clear(&self) {
        self.stop_watching();
        self.loaded.store(false, Ordering::Release);
        self.snapshot.store(Arc::new(StoreSnapshot::new(
            self.next_generation(),
            String::new(),
            IndexMap::new(),
        )));
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn reload_guard(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            lock(&self.reload_guards)
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    // Guards are only cloned under the map lock, so a count of two (the map
    // and `guard`) means no other reload of `key` is waiting.
    fn release_reload_guard(&self, key: &str, guard: Arc<Mutex<()>>) {
        let mut guards = lock(&self.reload_guards);
        if Arc::strong_count(&guard) == 2 {
            guards.remove(key);
        }
    }

    #[cfg(test)]
    fn pending_reload_guards(&self) -> usize {
        lock(&self.reload_guards).len()
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
