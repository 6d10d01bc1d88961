use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use resviz_core::{ConstEntry, has_extension, is_ignored_path, normalize_path};
use walkdir::WalkDir;

use crate::extractor::{ConstExtractor, is_generated_source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildSummary {
    pub files: usize,
    pub constants: usize,
    pub failed: usize,
}

pub struct ConstantIndex {
    entries: RwLock<BTreeMap<String, Vec<ConstEntry>>>,
    source_extension: String,
    fully_parsed: AtomicBool,
    in_progress: AtomicBool,
    epoch: AtomicU64,
    revision: AtomicU64,
}

impl ConstantIndex {
    pub fn new(source_extension: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            source_extension: source_extension.into(),
            fully_parsed: AtomicBool::new(false),
            in_progress: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            revision: AtomicU64::new(0),
        }
    }

    pub fn is_fully_parsed(&self) -> bool {
        self.fully_parsed.load(Ordering::Acquire)
    }

    pub fn is_building(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn build_full(&self, root: &Path) -> Option<BuildSummary> {
        if !self.try_begin_build() {
            tracing::debug!(root = %root.display(), "constant index build already running");
            return None;
        }

        let summary = self.run_build(root, self.epoch.load(Ordering::Acquire));
        self.in_progress.store(false, Ordering::Release);
        summary
    }

    pub fn spawn_full_build(self: &Arc<Self>, root: PathBuf) -> Option<JoinHandle<()>> {
        if !self.try_begin_build() {
            return None;
        }

        let index = Arc::clone(self);
        let epoch = self.epoch.load(Ordering::Acquire);
        let spawned = thread::Builder::new()
            .name("resviz-consts".to_owned())
            .spawn(move || {
                index.run_build(&root, epoch);
                index.in_progress.store(false, Ordering::Release);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                self.in_progress.store(false, Ordering::Release);
                tracing::error!(error = %err, "failed to spawn constant index build");
                None
            }
        }
    }

    pub fn refresh_file(self: &Arc<Self>, root: &Path, path: &Path) {
        if self.is_fully_parsed() {
            self.update_file(path);
        } else {
            self.spawn_full_build(root.to_path_buf());
        }
    }

    pub fn update_file(&self, path: &Path) -> usize {
        let key = normalize_path(&path.to_string_lossy());
        if is_generated_source(&key) {
            return 0;
        }

        if !path.exists() {
            self.remove_file(path);
            return 0;
        }

        let parsed = ConstExtractor::new().and_then(|mut extractor| extractor.extract_from_path(path));
        match parsed {
            Ok(found) => self.replace_file(key, found),
            Err(err) => {
                tracing::warn!(path = %key, error = %err, "failed to parse constants");
                self.replace_file(key, Vec::new())
            }
        }
    }

    pub fn update_source(&self, path: &str, source: &str) -> usize {
        let key = normalize_path(path);
        if is_generated_source(&key) {
            return 0;
        }

        let parsed = ConstExtractor::new().and_then(|mut extractor| extractor.extract(&key, source));
        match parsed {
            Ok(found) => self.replace_file(key, found),
            Err(err) => {
                tracing::warn!(path = %key, error = %err, "failed to parse constants");
                0
            }
        }
    }

    pub fn remove_file(&self, path: &Path) {
        let key = normalize_path(&path.to_string_lossy());
        if write_entries(&self.entries).remove(&key).is_some() {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let mut entries = write_entries(&self.entries);
        entries.clear();
        self.fully_parsed.store(false, Ordering::Release);
        drop(entries);
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    pub fn get_display_text(&self, const_name: &str, qualifier: &str, file: &str) -> Option<String> {
        let file = normalize_path(file);
        let entries = read_entries(&self.entries);

        let matches = |entry: &&ConstEntry| {
            entry.key == const_name
                && entry.qualification.ends_with(qualifier)
                && !entry.value.trim().is_empty()
        };

        if let Some(entry) = entries
            .get(&file)
            .and_then(|local| local.iter().find(matches))
        {
            return Some(entry.value.clone());
        }

        entries
            .values()
            .flatten()
            .find(matches)
            .map(|entry| entry.value.clone())
    }

    pub fn entries_for(&self, path: &str) -> Vec<ConstEntry> {
        read_entries(&self.entries)
            .get(&normalize_path(path))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        read_entries(&self.entries).values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn try_begin_build(&self) -> bool {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn run_build(&self, root: &Path, epoch: u64) -> Option<BuildSummary> {
        let mut extractor = match ConstExtractor::new() {
            Ok(extractor) => extractor,
            Err(err) => {
                tracing::error!(error = %err, "failed to initialize constant extractor");
                return None;
            }
        };

        let mut summary = BuildSummary::default();
        for path in source_files(root, &self.source_extension) {
            if self.epoch.load(Ordering::Acquire) != epoch {
                tracing::info!(root = %root.display(), "constant index build abandoned");
                return None;
            }

            let key = normalize_path(&path.to_string_lossy());
            if is_generated_source(&key) {
                continue;
            }

            summary.files += 1;
            match extractor.extract_from_path(&path) {
                Ok(found) => match self.replace_file_for_build(key, found, epoch) {
                    Some(count) => summary.constants += count,
                    None => {
                        tracing::info!(root = %root.display(), "constant index build abandoned");
                        return None;
                    }
                },
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(path = %key, error = %err, "failed to parse constants");
                }
            }

            thread::yield_now();
        }

        {
            let _entries = write_entries(&self.entries);
            if self.epoch.load(Ordering::Acquire) != epoch {
                return None;
            }
            self.fully_parsed.store(true, Ordering::Release);
        }

        tracing::info!(
            root = %root.display(),
            files = summary.files,
            constants = summary.constants,
            failed = summary.failed,
            "constant index built"
        );
        Some(summary)
    }

    fn replace_file(&self, key: String, found: Vec<ConstEntry>) -> usize {
        let mut entries = write_entries(&self.entries);
        self.store_file(&mut entries, key, found)
    }

    // `reset` bumps the epoch before it takes the write lock, so checking it
    // under the lock keeps an abandoned build from writing after the clear.
    fn replace_file_for_build(&self, key: String, found: Vec<ConstEntry>, epoch: u64) -> Option<usize> {
        let mut entries = write_entries(&self.entries);
        if self.epoch.load(Ordering::Acquire) != epoch {
            return None;
        }
        Some(self.store_file(&mut entries, key, found))
    }

    fn store_file(
        &self,
        entries: &mut BTreeMap<String, Vec<ConstEntry>>,
        key: String,
        found: Vec<ConstEntry>,
    ) -> usize {
        let count = found.len();
        if found.is_empty() {
            entries.remove(&key);
        } else {
            entries.insert(key, found);
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
        count
    }
}

fn source_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            !is_ignored_path(relative)
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), extension))
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    files
}

fn read_entries(
    lock: &RwLock<BTreeMap<String, Vec<ConstEntry>>>,
) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<ConstEntry>>> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_entries(
    lock: &RwLock<BTreeMap<String, Vec<ConstEntry>>>,
) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Vec<ConstEntry>>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
