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

//! In-memory store of editor-open documents.
//!
//! One readers–writer lock protects the whole map: `open`/`update`/`close`
//! are the writers, request handlers the readers. Because documents are
//! immutable snapshots, readers clone an `Arc` and drop the lock
//! immediately.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::document::{Document, NodeCursor};
use crate::parser_pool::ParserPool;

/// Owner of all open-document state.
pub struct DocumentManager {
    parsers: Arc<ParserPool>,
    documents: RwLock<HashMap<String, Arc<Document>>>,
}

impl DocumentManager {
    pub fn new(parsers: Arc<ParserPool>) -> Self {
        Self {
            parsers,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly opened document.
    pub fn open(&self, uri: &str, text: &str, version: i32) {
        self.upsert(uri, text, version);
    }

    /// Apply a full-text change. A change for an unknown URI behaves like an
    /// open.
    pub fn update(&self, uri: &str, text: &str, version: i32) {
        self.upsert(uri, text, version);
    }

    fn upsert(&self, uri: &str, text: &str, version: i32) {
        let mut documents = self.documents.write();
        if let Some(existing) = documents.get(uri) {
            if existing.version() > version {
                warn!(
                    "ignoring stale edit for {uri}: version {version} < {}",
                    existing.version()
                );
                return;
            }
        }
        let document = Document::new(uri, text, version, &self.parsers);
        debug!(
            "document stored: {uri} v{version} ({} bytes, tree: {})",
            text.len(),
            document.tree().is_some()
        );
        documents.insert(uri.to_string(), Arc::new(document));
    }

    /// Drop the document and its tree. Unknown URIs are a no-op.
    pub fn close(&self, uri: &str) -> bool {
        self.documents.write().remove(uri).is_some()
    }

    pub fn get(&self, uri: &str) -> Option<Arc<Document>> {
        self.documents.read().get(uri).cloned()
    }

    /// Current text of the document, if open.
    pub fn text(&self, uri: &str) -> Option<Arc<String>> {
        self.documents
            .read()
            .get(uri)
            .map(|doc| Arc::clone(doc.text()))
    }

    /// Live tree of the document. `None` when the document is not open or
    /// its extension has no grammar; the root node is reached through the
    /// returned handle.
    pub fn tree(&self, uri: &str) -> Option<Arc<tree_sitter::Tree>> {
        self.documents
            .read()
            .get(uri)
            .and_then(|doc| doc.tree().cloned())
    }

    /// Resolve the node at an LSP position together with the document
    /// snapshot it was resolved against.
    pub fn node_at(
        &self,
        uri: &str,
        line: u32,
        character: u32,
    ) -> Option<(NodeCursor, Arc<Document>)> {
        let document = self.get(uri)?;
        let cursor = document.node_at(line, character)?;
        Some((cursor, document))
    }

    /// URIs of all currently open documents.
    pub fn open_uris(&self) -> Vec<String> {
        self.documents.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Release every document. Called once during shutdown.
    pub fn close_all(&self) {
        let mut documents = self.documents.write();
        debug!("closing {} open documents", documents.len());
        documents.clear();
    }
}
