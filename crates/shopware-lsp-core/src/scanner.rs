// Shopware LSP - Language Server for Shopware and Symfony projects
//
// Copyright (c) 2025 the shopware-lsp contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Incremental workspace scanner.
//!
//! A scan walks the workspace, hashes every candidate file, and dispatches
//! only the files whose recorded hash changed. Files are processed on the
//! rayon pool (one file per worker, sized to the logical CPU count);
//! indexers for a single file run sequentially so a parse is only ever read
//! from one thread at a time.
//!
//! All entry points are serialised against each other, which also
//! serialises `index_file`/`remove_file` calls for any given path. A second
//! `index_all` issued while one is running is coalesced into a no-op.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::hash_store::{content_hash, HashStore};
use crate::indexer::IndexerRegistry;
use crate::parser_pool::ParserPool;
use crate::tree_cache::TreeCache;

/// Cooperative cancellation handle for long-running scans.
///
/// Cancellation is best-effort: the file currently being processed
/// completes, then the worker stops picking up new ones.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Embedder-tunable scan settings.
#[derive(Clone)]
pub struct ScanConfig {
    /// Directory names skipped anywhere below the root, in addition to
    /// hidden directories and `vendor/bin`.
    pub skip_dirs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_dirs: vec!["node_modules".into(), "var".into(), "dist".into()],
        }
    }
}

/// Outcome counters for one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub indexed: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Indexed,
    Unchanged,
    Failed,
    Skipped,
}

type UpdateCallback = Box<dyn Fn(&[PathBuf]) + Send + Sync>;

struct WatcherHandle {
    _watcher: RecommendedWatcher,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Workspace discovery, hash diffing, parallel dispatch, and file watching.
pub struct FileScanner {
    registry: Arc<IndexerRegistry>,
    parsers: Arc<ParserPool>,
    hashes: Arc<HashStore>,
    config: ScanConfig,
    root: RwLock<Option<PathBuf>>,
    on_update: RwLock<Option<UpdateCallback>>,
    scanning: AtomicBool,
    scan_lock: Mutex<()>,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl FileScanner {
    pub fn new(
        registry: Arc<IndexerRegistry>,
        parsers: Arc<ParserPool>,
        hashes: Arc<HashStore>,
        config: ScanConfig,
    ) -> Self {
        Self {
            registry,
            parsers,
            hashes,
            config,
            root: RwLock::new(None),
            on_update: RwLock::new(None),
            scanning: AtomicBool::new(false),
            scan_lock: Mutex::new(()),
            watcher: Mutex::new(None),
        }
    }

    /// Set the workspace root. Done once, from `initialize`.
    pub fn set_root(&self, root: PathBuf) {
        *self.root.write() = Some(root);
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.root.read().clone()
    }

    /// Register the post-change notifier, invoked with the touched paths
    /// after every entry point that changed indexer state.
    pub fn set_on_update(&self, callback: impl Fn(&[PathBuf]) + Send + Sync + 'static) {
        *self.on_update.write() = Some(Box::new(callback));
    }

    /// Full diff scan of the workspace. With `force`, the hash store is
    /// cleared first and every file is treated as new. Concurrent calls are
    /// coalesced: the later one returns immediately as a no-op.
    pub fn index_all(&self, cancel: &CancelFlag, force: bool) -> Result<ScanSummary> {
        let Some(root) = self.root() else {
            warn!("index_all called without a workspace root");
            return Ok(ScanSummary::default());
        };
        if self.scanning.swap(true, Ordering::SeqCst) {
            debug!("index_all coalesced: a scan is already running");
            return Ok(ScanSummary::default());
        }
        let _flag = ResetOnDrop(&self.scanning);
        let _scan = self.scan_lock.lock();

        if force {
            info!("forced reindex: clearing hash store");
            self.hashes.clear();
        }

        let extensions = self.registry.extensions_union();
        let discovered = self.discover(&root, &extensions);
        debug!("discovered {} candidate files", discovered.len());

        // Files that vanished from disk since the last scan.
        let mut removed = Vec::new();
        for path in self.hashes.snapshot().into_keys() {
            if path.starts_with(&root) && !path.exists() {
                self.remove_one(&path);
                removed.push(path);
            }
        }

        let cache = TreeCache::new();
        let outcomes: Vec<(PathBuf, Outcome)> = discovered
            .into_par_iter()
            .map(|path| {
                let outcome = self.process_file(&path, &cache, cancel);
                (path, outcome)
            })
            .collect();
        cache.clear();

        if let Err(e) = self.hashes.flush() {
            warn!("failed to flush hash store: {e}");
        }

        let mut summary = ScanSummary {
            removed: removed.len(),
            ..ScanSummary::default()
        };
        let mut touched = removed;
        for (path, outcome) in outcomes {
            match outcome {
                Outcome::Indexed => {
                    summary.indexed += 1;
                    touched.push(path);
                }
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => {}
            }
        }
        info!(
            "scan complete: {} indexed, {} removed, {} unchanged, {} failed",
            summary.indexed, summary.removed, summary.unchanged, summary.failed
        );
        self.notify_update(&touched);
        Ok(summary)
    }

    /// Index the given paths, applying the same hash diffing as a full
    /// scan. Paths outside every indexer's extension set are ignored.
    pub fn index_files(&self, cancel: &CancelFlag, paths: &[PathBuf]) -> Result<ScanSummary> {
        let _scan = self.scan_lock.lock();

        let unique: Vec<&PathBuf> = {
            let mut seen = HashSet::new();
            paths.iter().filter(|p| seen.insert(*p)).collect()
        };

        let cache = TreeCache::new();
        let outcomes: Vec<(PathBuf, Outcome)> = unique
            .into_par_iter()
            .map(|path| {
                let outcome = self.process_file(path, &cache, cancel);
                (path.clone(), outcome)
            })
            .collect();
        cache.clear();

        if let Err(e) = self.hashes.flush() {
            warn!("failed to flush hash store: {e}");
        }

        let mut summary = ScanSummary::default();
        let mut touched = Vec::new();
        for (path, outcome) in outcomes {
            match outcome {
                Outcome::Indexed => {
                    summary.indexed += 1;
                    touched.push(path);
                }
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => {}
            }
        }
        self.notify_update(&touched);
        Ok(summary)
    }

    /// Remove the given paths from every interested indexer and from the
    /// hash store. Unknown paths are a no-op.
    pub fn remove_files(&self, paths: &[PathBuf]) -> Result<()> {
        let _scan = self.scan_lock.lock();

        let mut touched = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            if !seen.insert(path) {
                continue;
            }
            self.remove_one(path);
            touched.push(path.clone());
        }

        if let Err(e) = self.hashes.flush() {
            warn!("failed to flush hash store: {e}");
        }
        self.notify_update(&touched);
        Ok(())
    }

    /// Drop every recorded hash; the next `index_all` becomes a full
    /// rebuild.
    pub fn clear_hashes(&self) -> Result<()> {
        self.hashes.clear();
        self.hashes.flush()
    }

    fn remove_one(&self, path: &Path) {
        let Some(extension) = extension_of(path) else {
            return;
        };
        for indexer in self.registry.for_extension(&extension) {
            if let Err(e) = indexer.remove_file(path) {
                warn!("indexer {} failed to remove {}: {e}", indexer.id(), path.display());
            }
        }
        self.hashes.delete(path);
    }

    fn process_file(&self, path: &Path, cache: &TreeCache, cancel: &CancelFlag) -> Outcome {
        if cancel.is_cancelled() {
            return Outcome::Skipped;
        }
        let Some(extension) = extension_of(path) else {
            return Outcome::Skipped;
        };
        let indexers = self.registry.for_extension(&extension);
        if indexers.is_empty() {
            return Outcome::Skipped;
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("cannot read {}: {e}", path.display());
                return Outcome::Failed;
            }
        };

        let hash = content_hash(&bytes);
        if self.hashes.get(path) == Some(hash) {
            return Outcome::Unchanged;
        }

        let Some(tree) = cache.get_or_parse(path, &extension, &bytes, &self.parsers) else {
            warn!("parse failed for {}", path.display());
            return Outcome::Failed;
        };

        // One flaky indexer must not starve the others, and the hash is
        // still recorded so the file is not retried forever.
        for indexer in indexers {
            if let Err(e) = indexer.index_file(path, &tree, &bytes) {
                warn!("indexer {} failed on {}: {e}", indexer.id(), path.display());
            }
        }
        self.hashes.set(path, hash);
        Outcome::Indexed
    }

    fn discover(&self, root: &Path, extensions: &HashSet<String>) -> Vec<PathBuf> {
        let skip_dirs = &self.config.skip_dirs;
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                let parent = entry
                    .path()
                    .parent()
                    .and_then(Path::file_name)
                    .and_then(|n| n.to_str());
                !excluded_dir(&name, parent, skip_dirs)
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| extension_of(path).is_some_and(|ext| extensions.contains(&ext)))
            .collect()
    }

    fn notify_update(&self, touched: &[PathBuf]) {
        if let Some(callback) = self.on_update.read().as_ref() {
            callback(touched);
        }
    }

    /// Attach to OS file-change notifications under the workspace root and
    /// translate them into targeted index/remove calls on a background
    /// thread.
    pub fn start_watcher(self: &Arc<Self>) -> Result<()> {
        let Some(root) = self.root() else {
            return Err(Error::Watch("workspace root not set".into()));
        };
        let mut guard = self.watcher.lock();
        if guard.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            notify::Config::default(),
        )
        .map_err(|e| Error::Watch(e.to_string()))?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| Error::Watch(e.to_string()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let scanner = Arc::clone(self);
        let stop_flag = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("shopware-lsp-watcher".into())
            .spawn(move || scanner.watch_loop(&root, &rx, &stop_flag))?;

        *guard = Some(WatcherHandle {
            _watcher: watcher,
            stop,
            thread: Some(thread),
        });
        info!("file watcher started");
        Ok(())
    }

    fn watch_loop(
        &self,
        root: &Path,
        rx: &mpsc::Receiver<notify::Result<notify::Event>>,
        stop: &AtomicBool,
    ) {
        let extensions = self.registry.extensions_union();
        while !stop.load(Ordering::SeqCst) {
            let first = match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let mut pending: HashSet<PathBuf> = HashSet::new();
            collect_event_paths(first, &mut pending);
            while let Ok(event) = rx.try_recv() {
                collect_event_paths(event, &mut pending);
            }

            let mut to_index = Vec::new();
            let mut to_remove = Vec::new();
            for path in pending {
                if !self.watched(&path, root, &extensions) {
                    continue;
                }
                if path.exists() {
                    to_index.push(path);
                } else {
                    to_remove.push(path);
                }
            }

            let cancel = CancelFlag::new();
            if !to_index.is_empty() {
                debug!("watcher: indexing {} changed files", to_index.len());
                if let Err(e) = self.index_files(&cancel, &to_index) {
                    warn!("watcher index failed: {e}");
                }
            }
            if !to_remove.is_empty() {
                debug!("watcher: removing {} deleted files", to_remove.len());
                if let Err(e) = self.remove_files(&to_remove) {
                    warn!("watcher remove failed: {e}");
                }
            }
        }
    }

    fn watched(&self, path: &Path, root: &Path, extensions: &HashSet<String>) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        if !extension_of(path).is_some_and(|ext| extensions.contains(&ext)) {
            return false;
        }
        let components: Vec<&str> = relative.iter().filter_map(|c| c.to_str()).collect();
        let mut previous: Option<&str> = None;
        for dir in &components[..components.len().saturating_sub(1)] {
            if excluded_dir(dir, previous, &self.config.skip_dirs) {
                return false;
            }
            previous = Some(*dir);
        }
        true
    }

    /// Detach from file-change notifications and join the watch thread.
    pub fn stop_watcher(&self) {
        if let Some(mut handle) = self.watcher.lock().take() {
            handle.stop.store(true, Ordering::SeqCst);
            if let Some(thread) = handle.thread.take() {
                let _ = thread.join();
            }
            info!("file watcher stopped");
        }
    }
}

impl Drop for FileScanner {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

struct ResetOnDrop<'a>(&'a AtomicBool);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn excluded_dir(name: &str, parent: Option<&str>, skip_dirs: &[String]) -> bool {
    if name.starts_with('.') {
        return true;
    }
    if skip_dirs.iter().any(|skip| skip == name) {
        return true;
    }
    name == "bin" && parent == Some("vendor")
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn collect_event_paths(
    result: notify::Result<notify::Event>,
    pending: &mut HashSet<PathBuf>,
) {
    match result {
        Ok(event) => {
            if matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                pending.extend(event.paths);
            }
        }
        Err(e) => warn!("watch event error: {e}"),
    }
}
