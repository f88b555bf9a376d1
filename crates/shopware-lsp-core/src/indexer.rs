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

//! The domain-indexer contract and the ordered registry.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;
use tree_sitter::Tree;

use crate::error::{Error, Result};

/// A consumer of parsed files that maintains its own queryable index.
///
/// Contract:
/// - `index_file` is idempotent and replaces every fact previously
///   attributed to the path; it must not assume prior state.
/// - `remove_file` drops every fact for the path and is a no-op for unknown
///   paths.
/// - After `close` no other method is called.
///
/// Query methods an indexer exposes beyond this trait must be safe to call
/// concurrently with each other and serialised against indexing writes
/// (indexers own their locks).
pub trait Indexer: Send + Sync {
    /// Stable identifier, unique across the registry.
    fn id(&self) -> &'static str;

    /// Lowercase extensions (no dot) this indexer consumes. The scanner
    /// skips hooks for files outside this set.
    fn extensions(&self) -> &'static [&'static str];

    fn index_file(&self, path: &Path, tree: &Tree, source: &[u8]) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Flush and release resources.
    fn close(&self) -> Result<()>;
}

/// Registration-ordered collection of indexers.
///
/// Built once before the server starts; afterwards it is only read, so the
/// registry itself needs no interior locking.
#[derive(Default)]
pub struct IndexerRegistry {
    indexers: Vec<Arc<dyn Indexer>>,
    closed: AtomicBool,
}

impl IndexerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, indexer: Arc<dyn Indexer>) -> Result<()> {
        let id = indexer.id();
        if id.is_empty() {
            return Err(Error::Registry("indexer id must not be empty".into()));
        }
        if self.indexers.iter().any(|existing| existing.id() == id) {
            return Err(Error::Registry(format!("duplicate indexer id: {id}")));
        }
        self.indexers.push(indexer);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Indexer>> {
        self.indexers.iter()
    }

    pub fn len(&self) -> usize {
        self.indexers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexers.is_empty()
    }

    /// Union of every registered indexer's extensions; the scanner's
    /// discovery filter.
    pub fn extensions_union(&self) -> HashSet<String> {
        self.indexers
            .iter()
            .flat_map(|indexer| indexer.extensions().iter().map(|ext| ext.to_string()))
            .collect()
    }

    /// Indexers interested in the given extension, in registration order.
    pub fn for_extension(&self, extension: &str) -> Vec<Arc<dyn Indexer>> {
        self.indexers
            .iter()
            .filter(|indexer| indexer.extensions().contains(&extension))
            .cloned()
            .collect()
    }

    /// Close every indexer exactly once. Errors are logged; the remaining
    /// indexers are still closed.
    pub fn close_all(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for indexer in &self.indexers {
            if let Err(e) = indexer.close() {
                warn!("indexer {} failed to close: {e}", indexer.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: &'static str,
        exts: &'static [&'static str],
    }

    impl Indexer for Dummy {
        fn id(&self) -> &'static str {
            self.id
        }
        fn extensions(&self) -> &'static [&'static str] {
            self.exts
        }
        fn index_file(&self, _: &Path, _: &Tree, _: &[u8]) -> Result<()> {
            Ok(())
        }
        fn remove_file(&self, _: &Path) -> Result<()> {
            Ok(())
        }
        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = IndexerRegistry::new();
        registry
            .register(Arc::new(Dummy { id: "service", exts: &["xml"] }))
            .unwrap();
        let err = registry
            .register(Arc::new(Dummy { id: "service", exts: &["yaml"] }))
            .unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
    }

    #[test]
    fn extension_union_and_lookup_respect_registration_order() {
        let mut registry = IndexerRegistry::new();
        registry
            .register(Arc::new(Dummy { id: "service", exts: &["xml", "yaml"] }))
            .unwrap();
        registry
            .register(Arc::new(Dummy { id: "route", exts: &["xml", "php"] }))
            .unwrap();

        let union = registry.extensions_union();
        assert_eq!(union.len(), 3);
        assert!(union.contains("php"));

        let for_xml = registry.for_extension("xml");
        assert_eq!(for_xml.len(), 2);
        assert_eq!(for_xml[0].id(), "service");
        assert_eq!(for_xml[1].id(), "route");
        assert!(registry.for_extension("twig").is_empty());
    }
}
