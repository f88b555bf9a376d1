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

//! Scan-local parse deduplication.
//!
//! Several indexers may care about the same file; the first one to need it
//! triggers the parse, the rest reuse the tree. The cache lives for a single
//! scan and is cleared when the scan ends, releasing every tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tree_sitter::Tree;

use crate::parser_pool::ParserPool;

/// Transient `path → tree` map owned by the scanner for one scan.
#[derive(Default)]
pub struct TreeCache {
    trees: DashMap<PathBuf, Arc<Tree>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached tree for `path`, parsing `bytes` on first access.
    /// `None` means the extension has no grammar or parsing failed.
    pub fn get_or_parse(
        &self,
        path: &Path,
        extension: &str,
        bytes: &[u8],
        parsers: &ParserPool,
    ) -> Option<Arc<Tree>> {
        if let Some(tree) = self.trees.get(path) {
            return Some(Arc::clone(&tree));
        }
        let tree = Arc::new(parsers.parse(extension, bytes)?);
        self.trees.insert(path.to_path_buf(), Arc::clone(&tree));
        Some(tree)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Release every cached tree.
    pub fn clear(&self) {
        self.trees.clear();
    }
}
