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

//! A single open editor document.
//!
//! Documents are immutable snapshots: every open/update builds a fresh
//! [`Document`] with the full text (full-text sync), a rope for position
//! arithmetic, and a re-parsed tree when the extension has a grammar. The
//! manager swaps snapshots under its lock; readers keep whatever snapshot
//! they grabbed, so a request never observes a half-applied edit.
//!
//! Positions are LSP-style `(line, character)` pairs with UTF-16 character
//! offsets. Conversion to byte offsets goes through the rope, which is the
//! single place where UTF-16 and UTF-8 views meet.

use std::path::PathBuf;
use std::sync::Arc;

use ropey::Rope;
use tree_sitter::{Node, Tree};

use crate::parser_pool::ParserPool;
use crate::workspace::normalize_uri;

/// Immutable snapshot of one open document.
pub struct Document {
    uri: String,
    version: i32,
    rope: Rope,
    source: Arc<String>,
    tree: Option<Arc<Tree>>,
}

impl Document {
    pub(crate) fn new(uri: &str, text: &str, version: i32, parsers: &ParserPool) -> Self {
        let extension = normalize_uri(uri)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let tree = extension
            .as_deref()
            .and_then(|ext| parsers.parse(ext, text.as_bytes()))
            .map(Arc::new);
        Self {
            uri: uri.to_string(),
            version,
            rope: Rope::from_str(text),
            source: Arc::new(text.to_string()),
            tree,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Filesystem path for the document (URI with the `file://` prefix
    /// stripped).
    pub fn path(&self) -> PathBuf {
        normalize_uri(&self.uri)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// The full text at this version.
    pub fn text(&self) -> &Arc<String> {
        &self.source
    }

    pub fn tree(&self) -> Option<&Arc<Tree>> {
        self.tree.as_ref()
    }

    /// Root node of the live tree, if the extension has a grammar.
    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(|tree| tree.root_node())
    }

    /// Convert an LSP position to a byte offset into the text. Out-of-range
    /// lines and characters clamp to the end of the document or line.
    pub fn offset_at(&self, line: u32, character: u32) -> usize {
        let line = line as usize;
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        let line_start = self.rope.line_to_char(line);
        let slice = self.rope.line(line);
        // Clamp inside the line's content, excluding the terminator.
        let mut content_chars = slice.len_chars();
        while content_chars > 0 && matches!(slice.char(content_chars - 1), '\n' | '\r') {
            content_chars -= 1;
        }
        let max_cu = slice.char_to_utf16_cu(content_chars);
        let cu = (character as usize).min(max_cu);
        let column = slice.utf16_cu_to_char(cu);
        self.rope.char_to_byte(line_start + column)
    }

    /// Resolve the position to a cursor over the innermost node containing
    /// it. `None` when the document has no tree.
    pub fn node_at(&self, line: u32, character: u32) -> Option<NodeCursor> {
        let tree = self.tree.as_ref()?;
        Some(NodeCursor {
            tree: Arc::clone(tree),
            source: Arc::clone(&self.source),
            offset: self.offset_at(line, character),
        })
    }
}

/// A byte offset paired with the tree and source it refers to.
///
/// Owning the `Arc`s lets the cursor outlive the document-map lock; the
/// node itself is re-derived on demand because tree-sitter nodes borrow the
/// tree.
#[derive(Clone)]
pub struct NodeCursor {
    tree: Arc<Tree>,
    source: Arc<String>,
    offset: usize,
}

impl NodeCursor {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Innermost node whose byte span contains the offset.
    ///
    /// Descends from the root taking the first child (named or unnamed)
    /// containing the offset, until no child does. When even the root does
    /// not contain the offset, falls back to the tree's named-descendant
    /// search.
    pub fn node(&self) -> Node<'_> {
        let root = self.tree.root_node();
        if self.offset < root.start_byte() || self.offset >= root.end_byte() {
            let clamped = self.offset.min(root.end_byte());
            return root
                .named_descendant_for_byte_range(clamped, clamped)
                .unwrap_or(root);
        }
        let mut node = root;
        'descend: loop {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    if child.start_byte() <= self.offset && self.offset < child.end_byte() {
                        node = child;
                        continue 'descend;
                    }
                }
            }
            return node;
        }
    }

    /// Text of the resolved node.
    pub fn node_text(&self) -> &str {
        self.node()
            .utf8_text(self.source.as_bytes())
            .unwrap_or_default()
    }
}
