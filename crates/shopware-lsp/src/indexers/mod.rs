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

//! The domain indexers and their shared plumbing.
//!
//! Every indexer keeps its facts in per-file buckets so `remove_file` and
//! the replace-prior-facts rule of `index_file` are a single map operation.
//! Stores persist as JSON under one cache subdirectory per indexer and
//! carry a `schema` number; a mismatched or unreadable store loads as empty
//! and the next scan rebuilds it.

pub mod php;
pub mod route;
pub mod service;
pub mod snippet;
pub mod template;
pub mod theme;

pub use php::PhpClassIndexer;
pub use route::RouteIndexer;
pub use service::ServiceIndexer;
pub use snippet::SnippetIndexer;
pub use template::TemplateIndexer;
pub use theme::ThemeConfigIndexer;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Location, Position, Range, Url};
use tracing::{debug, warn};

/// A single-line span inside one file, in UTF-16 character columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub path: PathBuf,
    pub line: u32,
    pub start_char: u32,
    pub end_char: u32,
}

impl SourceSpan {
    pub fn range(&self) -> Range {
        Range {
            start: Position {
                line: self.line,
                character: self.start_char,
            },
            end: Position {
                line: self.line,
                character: self.end_char,
            },
        }
    }

    /// LSP location for this span. `None` when the path cannot form a file
    /// URI (relative paths only occur in tests).
    pub fn location(&self) -> Option<Location> {
        let uri = Url::from_file_path(&self.path).ok()?;
        Some(Location {
            uri,
            range: self.range(),
        })
    }
}

/// Byte-offset → position conversion for one file's source.
///
/// tree-sitter points carry byte columns; LSP wants UTF-16 columns. The
/// index records every line start once and converts on demand.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                starts.push(offset + 1);
            }
        }
        Self { starts }
    }

    /// Line containing the byte offset.
    pub fn line_of(&self, offset: usize) -> u32 {
        (self.starts.partition_point(|start| *start <= offset) - 1) as u32
    }

    /// UTF-16 column of a byte offset within its line.
    pub fn utf16_column(&self, source: &str, offset: usize) -> u32 {
        let line_start = self.starts[self.line_of(offset) as usize];
        utf16_len(&source[line_start..offset.min(source.len())])
    }

    /// Span for `[start_byte, end_byte)`, anchored to the start line.
    pub fn span(&self, source: &str, path: &Path, start_byte: usize, end_byte: usize) -> SourceSpan {
        SourceSpan {
            path: path.to_path_buf(),
            line: self.line_of(start_byte),
            start_char: self.utf16_column(source, start_byte),
            end_char: self.utf16_column(source, end_byte),
        }
    }
}

pub(crate) fn utf16_len(text: &str) -> u32 {
    text.chars().map(char::len_utf16).sum::<usize>() as u32
}

/// Lowercase extension of a path, matching the scanner's normalisation.
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[derive(Serialize, Deserialize)]
struct Persisted<T> {
    schema: u32,
    data: T,
}

/// Load an indexer store from `<dir>/<file>`, tolerating absence,
/// corruption, and schema drift by starting empty.
pub(crate) fn load_store<T: DeserializeOwned + Default>(
    dir: Option<&Path>,
    file: &str,
    schema: u32,
) -> T {
    let Some(dir) = dir else {
        return T::default();
    };
    let path = dir.join(file);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("cannot read {}: {e}", path.display());
            }
            return T::default();
        }
    };
    match serde_json::from_str::<Persisted<T>>(&text) {
        Ok(persisted) if persisted.schema == schema => persisted.data,
        Ok(persisted) => {
            debug!(
                "discarding {} (schema {} != {schema})",
                path.display(),
                persisted.schema
            );
            T::default()
        }
        Err(e) => {
            warn!("discarding corrupt store {}: {e}", path.display());
            T::default()
        }
    }
}

/// Persist an indexer store to `<dir>/<file>`.
pub(crate) fn save_store<T: Serialize>(
    dir: Option<&Path>,
    file: &str,
    schema: u32,
    data: &T,
) -> shopware_lsp_core::Result<()> {
    let Some(dir) = dir else {
        return Ok(());
    };
    fs::create_dir_all(dir)?;
    let path = dir.join(file);
    let json = serde_json::to_string(&Persisted { schema, data })
        .map_err(|e| shopware_lsp_core::Error::Storage(e.to_string()))?;
    fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_index_maps_bytes_to_utf16_columns() {
        let source = "first\ngrüße: x\n";
        let index = LineIndex::new(source);

        let x = source.find(": x").unwrap() + 2;
        assert_eq!(index.line_of(x), 1);
        // "grüße" is five UTF-16 units but seven bytes.
        assert_eq!(index.utf16_column(source, x), 7);

        let span = index.span(source, Path::new("/ws/a.twig"), x, x + 1);
        assert_eq!(span.line, 1);
        assert_eq!(span.start_char, 7);
        assert_eq!(span.end_char, 8);
    }

    #[test]
    fn store_round_trips_and_rejects_schema_drift() {
        let dir = tempfile::tempdir().unwrap();
        let data = vec!["a".to_string(), "b".to_string()];
        save_store(Some(dir.path()), "keys.json", 1, &data).unwrap();

        let loaded: Vec<String> = load_store(Some(dir.path()), "keys.json", 1);
        assert_eq!(loaded, data);

        let drifted: Vec<String> = load_store(Some(dir.path()), "keys.json", 2);
        assert!(drifted.is_empty());

        let missing: Vec<String> = load_store(Some(dir.path()), "other.json", 1);
        assert!(missing.is_empty());
    }
}
