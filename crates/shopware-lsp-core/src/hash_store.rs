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

//! Persistent path → content-hash map.
//!
//! The scanner compares a file's current hash against the stored one to
//! decide whether any indexer needs to see it again. Entries only exist for
//! files that were parsed and dispatched successfully, so clearing the store
//! turns the next scan into a full rebuild.
//!
//! Hashes are FNV-1a 64: deterministic across processes and platforms,
//! collision-resistant enough for workspace sizes, and cheap enough that
//! hashing never dominates a scan. The map is persisted as sorted JSON and
//! rewritten atomically (temp file + rename) at scan boundaries.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const FNV_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// FNV-1a 64 digest of the byte contents. Only equality matters.
pub fn content_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Durable map `path → content hash`, backed by `hashes.json` in the cache
/// directory.
pub struct HashStore {
    file: PathBuf,
    entries: Mutex<HashMap<PathBuf, u64>>,
    dirty: AtomicBool,
}

impl HashStore {
    /// Open (or create) the store under `cache_dir`. A missing or corrupt
    /// file starts the store empty; corruption is logged, not fatal, since
    /// the worst case is one full re-scan.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let file = cache_dir.join("hashes.json");
        let entries = match fs::read_to_string(&file) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, u64>>(&text) {
                Ok(map) => map
                    .into_iter()
                    .map(|(path, hash)| (PathBuf::from(path), hash))
                    .collect(),
                Err(e) => {
                    warn!("discarding corrupt hash store {}: {e}", file.display());
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(Error::Io(e)),
        };
        debug!("hash store opened with {} entries", entries.len());
        Ok(Self {
            file,
            entries: Mutex::new(entries),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn get(&self, path: &Path) -> Option<u64> {
        self.entries.lock().get(path).copied()
    }

    pub fn set(&self, path: &Path, hash: u64) {
        let previous = self.entries.lock().insert(path.to_path_buf(), hash);
        if previous != Some(hash) {
            self.dirty.store(true, Ordering::Release);
        }
    }

    /// Remove the entry for `path`. Unknown paths are a no-op.
    pub fn delete(&self, path: &Path) -> bool {
        let removed = self.entries.lock().remove(path).is_some();
        if removed {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    /// Drop every entry, forcing the next scan to treat all files as new.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            entries.clear();
            self.dirty.store(true, Ordering::Release);
        }
    }

    /// Copy of the current entries, for diffing and debugging.
    pub fn snapshot(&self) -> HashMap<PathBuf, u64> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Write the store to disk if it changed since the last flush. The file
    /// is replaced atomically so a crash mid-write cannot corrupt it.
    pub fn flush(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let sorted: BTreeMap<String, u64> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .map(|(path, hash)| (path.to_string_lossy().into_owned(), *hash))
                .collect()
        };
        let json = serde_json::to_string(&sorted)
            .map_err(|e| Error::Storage(format!("failed to serialize hash store: {e}")))?;
        let tmp = self.file.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.file)?;
        debug!("hash store flushed ({} entries)", sorted.len());
        Ok(())
    }
}
