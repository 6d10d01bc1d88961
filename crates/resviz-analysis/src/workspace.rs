use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use resviz_config::ResvizConfig;
use resviz_core::{Annotation, has_extension, is_ignored_path, is_resource_of_interest, normalize_path};
use resviz_parse::ConstantIndex;
use resviz_store::{
    LoadSummary, PathWatcher, ResourceStore, RetryPolicy, StoreError, StoreOptions, StoreSnapshot,
    WatchSettings,
};
use walkdir::WalkDir;

use crate::alias::{AliasTracker, AliasUpdate};
use crate::resolver::{ResolveContext, resolve};
use crate::scanner::{ScanOptions, scan_line};

pub struct Workspace {
    root: PathBuf,
    config: ResvizConfig,
    store: Arc<ResourceStore>,
    constants: Arc<ConstantIndex>,
    aliases: Mutex<HashMap<String, AliasTracker>>,
    source_watcher: Mutex<Option<PathWatcher>>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, config: ResvizConfig) -> Self {
        let constants = ConstantIndex::new(config.watch.source_extension.clone());
        Self {
            root: root.into(),
            config,
            store: Arc::new(ResourceStore::new()),
            constants: Arc::new(constants),
            aliases: Mutex::new(HashMap::new()),
            source_watcher: Mutex::new(None),
        }
    }

    pub fn open(root: impl Into<PathBuf>, config: ResvizConfig) -> Self {
        let workspace = Self::new(root, config);

        let files = workspace.discover_resource_files();
        workspace
            .store
            .load_all(&files, &workspace.root, workspace.store_options());

        if let Err(err) = workspace.watch_sources() {
            tracing::warn!(
                root = %workspace.root.display(),
                error = %err,
                "failed to watch source files, constants refresh on save only"
            );
        }

        workspace.constants.spawn_full_build(workspace.root.clone());
        workspace
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ResvizConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    pub fn constants(&self) -> &Arc<ConstantIndex> {
        &self.constants
    }

    pub fn generation(&self) -> u64 {
        self.store
            .generation()
            .wrapping_add(self.constants.revision())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            preferred_culture: self.config.display.preferred_culture.clone(),
            resource_extension: self.config.watch.resource_extension.clone(),
            retry: RetryPolicy {
                attempts: self.config.watch.reload_attempts,
                backoff_step: self.config.watch.reload_backoff(),
            },
            debounce: self.config.watch.debounce(),
            poll_interval: self.config.watch.poll_interval(),
        }
    }

    pub fn discover_resource_files(&self) -> Vec<PathBuf> {
        let preferred_culture = self.config.display.preferred_culture.as_str();
        let mut files = walk_files(&self.root, &self.config.watch.resource_extension)
            .into_iter()
            .filter(|path| is_resource_of_interest(path, preferred_culture))
            .collect::<Vec<_>>();
        files.sort();
        files
    }

    pub fn reload_resources(&self) -> LoadSummary {
        let files = self.discover_resource_files();
        self.store.load_tables(&files, self.store_options())
    }

    pub fn build_constants(&self) {
        self.constants.build_full(&self.root);
    }

    pub fn watch_sources(&self) -> Result<(), StoreError> {
        let constants = Arc::clone(&self.constants);
        let root = self.root.clone();
        let watcher = PathWatcher::spawn(
            &self.root,
            WatchSettings {
                extension: self.config.watch.source_extension.clone(),
                debounce: self.config.watch.debounce(),
                poll_interval: self.config.watch.poll_interval(),
            },
            move |paths| {
                for path in paths {
                    tracing::debug!(path = %path.display(), "source file changed");
                    constants.refresh_file(&root, &path);
                }
            },
        )?;

        *lock(&self.source_watcher) = Some(watcher);
        Ok(())
    }

    pub fn document_saved(&self, file_path: &Path) {
        if has_extension(file_path, &self.config.watch.source_extension) {
            self.constants.refresh_file(&self.root, file_path);
        }
    }

    pub fn forget_document(&self, file_path: &str) {
        lock(&self.aliases).remove(&normalize_path(file_path));
    }

    pub fn annotate_line(&self, file_path: &str, line_number: usize, text: &str) -> Vec<Annotation> {
        let Some(snapshot) = self.store.current() else {
            return Vec::new();
        };
        if snapshot.search_terms().is_empty() {
            return Vec::new();
        }

        let key = normalize_path(file_path);
        let mut aliases = lock(&self.aliases);
        let tracker = aliases.entry(key.clone()).or_default();
        if self.config.display.support_namespace_aliases {
            tracker.observe_line(line_number, text, snapshot.search_terms());
        }

        self.annotate_with(&snapshot, tracker, &key, line_number, text)
    }

    pub fn annotate_document(&self, file_path: &str, text: &str) -> Vec<Annotation> {
        let Some(snapshot) = self.store.current() else {
            return Vec::new();
        };
        if snapshot.search_terms().is_empty() {
            return Vec::new();
        }

        let key = normalize_path(file_path);
        let mut aliases = lock(&self.aliases);
        let tracker = aliases.entry(key.clone()).or_default();

        if self.config.display.support_namespace_aliases {
            let mut cleared = tracker.retain_lines(text.lines().count()) == AliasUpdate::Cleared;
            for (line_number, line) in text.lines().enumerate() {
                cleared |= tracker.observe_line(line_number, line, snapshot.search_terms())
                    == AliasUpdate::Cleared;
            }

            if cleared {
                tracing::debug!(path = %key, "alias declarations edited, rebuilding");
                for (line_number, line) in text.lines().enumerate() {
                    tracker.observe_line(line_number, line, snapshot.search_terms());
                }
            }
        }

        let tracker: &AliasTracker = tracker;
        text.lines()
            .enumerate()
            .flat_map(|(line_number, line)| {
                self.annotate_with(&snapshot, tracker, &key, line_number, line)
            })
            .collect()
    }

    pub fn close(&self) {
        lock(&self.source_watcher).take();
        self.store.clear();
        self.constants.reset();
        lock(&self.aliases).clear();
        tracing::info!(root = %self.root.display(), "workspace closed");
    }

    fn annotate_with(
        &self,
        snapshot: &StoreSnapshot,
        tracker: &AliasTracker,
        file_path: &str,
        line_number: usize,
        text: &str,
    ) -> Vec<Annotation> {
        let alias_tokens = if self.config.display.support_namespace_aliases {
            tracker.tokens()
        } else {
            Vec::new()
        };

        let matches = scan_line(
            text,
            snapshot.search_terms(),
            &alias_tokens,
            ScanOptions {
                localizer_syntax: self.config.display.support_localizer_syntax,
            },
        );
        if matches.is_empty() {
            return Vec::new();
        }

        let context = ResolveContext {
            snapshot,
            constants: &self.constants,
            aliases: Some(tracker),
            file_path,
            preferred_culture: &self.config.display.preferred_culture,
        };

        matches
            .iter()
            .filter_map(|found| {
                resolve(found, &context).map(|display_text| Annotation {
                    line: line_number,
                    start_column: found.start,
                    end_column: found.end,
                    display_text,
                })
            })
            .collect()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.store.stop_watching();
    }
}

fn walk_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            !is_ignored_path(relative)
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), extension))
        .map(|entry| entry.into_path())
        .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
