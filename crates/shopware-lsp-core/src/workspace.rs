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

//! Cache directory resolution and the startup version gate.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Test/dev override for the cache directory location.
pub const CACHE_DIR_ENV: &str = "SHOPWARE_LSP_CACHE_DIR";

/// Version string that never triggers a forced rebuild.
pub const DEV_VERSION: &str = "dev";

const VERSION_FILE: &str = "version.txt";

/// Platform-conventional cache directory for the server, honoring the
/// `SHOPWARE_LSP_CACHE_DIR` override.
pub fn cache_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    let dirs = ProjectDirs::from("com", "shopware", "shopware-lsp")
        .ok_or_else(|| Error::Storage("failed to determine cache directory".into()))?;
    Ok(dirs.cache_dir().to_path_buf())
}

/// Resolve and create the cache directory. Failure here is fatal at
/// startup.
pub fn ensure_cache_dir() -> Result<PathBuf> {
    let dir = cache_dir()?;
    fs::create_dir_all(&dir)
        .map_err(|e| Error::Storage(format!("failed to create {}: {e}", dir.display())))?;
    Ok(dir)
}

/// Turn a document URI into a filesystem path by stripping a single
/// `file://` prefix. Anything else passes through unchanged.
pub fn normalize_uri(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Startup check that forces a full rebuild when the server version
/// changed since the last run.
pub struct VersionGate;

impl VersionGate {
    /// Whether the next scan must be forced. `dev` builds never force;
    /// a missing or empty version file counts as a first run and does.
    /// An inaccessible cache directory skips the gate entirely.
    pub fn check(cache_dir: &Path, current: &str) -> bool {
        if current == DEV_VERSION {
            return false;
        }
        if let Err(e) = fs::metadata(cache_dir) {
            warn!(
                "cache directory {} inaccessible, skipping version gate: {e}",
                cache_dir.display()
            );
            return false;
        }
        match fs::read_to_string(cache_dir.join(VERSION_FILE)) {
            Ok(text) => {
                let stored = text.trim();
                if stored != current {
                    info!("server version changed ({stored:?} -> {current:?}), forcing reindex");
                    true
                } else {
                    false
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("failed to read {VERSION_FILE}, skipping version gate: {e}");
                false
            }
        }
    }

    /// Persist the current version. Called after every gate check.
    pub fn record(cache_dir: &Path, current: &str) {
        if let Err(e) = fs::write(cache_dir.join(VERSION_FILE), format!("{current}\n")) {
            warn!("failed to write {VERSION_FILE}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn uri_normalisation_strips_a_single_prefix() {
        assert_eq!(
            normalize_uri("file:///ws/services.xml"),
            PathBuf::from("/ws/services.xml")
        );
        assert_eq!(normalize_uri("/ws/services.xml"), PathBuf::from("/ws/services.xml"));
        // Only one prefix is stripped.
        assert_eq!(
            normalize_uri("file://file:///x"),
            PathBuf::from("file:///x")
        );
    }

    #[test]
    fn first_run_forces() {
        let dir = tempdir().unwrap();
        assert!(VersionGate::check(dir.path(), "1.1.0"));
    }

    #[test]
    fn empty_version_file_forces() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), "").unwrap();
        assert!(VersionGate::check(dir.path(), "1.1.0"));
    }

    #[test]
    fn matching_version_does_not_force() {
        let dir = tempdir().unwrap();
        VersionGate::record(dir.path(), "1.1.0");
        assert!(!VersionGate::check(dir.path(), "1.1.0"));
    }

    #[test]
    fn changed_version_forces_and_record_updates() {
        let dir = tempdir().unwrap();
        VersionGate::record(dir.path(), "1.0.0");
        assert!(VersionGate::check(dir.path(), "1.1.0"));

        VersionGate::record(dir.path(), "1.1.0");
        assert_eq!(
            fs::read_to_string(dir.path().join(VERSION_FILE)).unwrap().trim(),
            "1.1.0"
        );
        assert!(!VersionGate::check(dir.path(), "1.1.0"));
    }

    #[test]
    fn dev_builds_never_force() {
        let dir = tempdir().unwrap();
        VersionGate::record(dir.path(), "1.0.0");
        assert!(!VersionGate::check(dir.path(), DEV_VERSION));
    }

    #[test]
    fn missing_cache_dir_skips_the_gate() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(!VersionGate::check(&gone, "1.1.0"));
    }
}
