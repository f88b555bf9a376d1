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

//! Indexing substrate for the Shopware language server.
//!
//! This crate is protocol-free: it knows about files, syntax trees, and
//! indexers, but not about JSON-RPC or LSP types. The server crate wires it
//! to the editor.
//!
//! The moving parts, bottom up:
//!
//! - [`parser_pool`]: file extension → reusable tree-sitter parser.
//! - [`hash_store`]: persistent path → content-hash map that decides which
//!   files a scan may skip.
//! - [`tree_cache`]: scan-local parse deduplication across indexers.
//! - [`document`] / [`documents`]: open editor buffers with live trees and
//!   position → node resolution.
//! - [`indexer`]: the contract every domain indexer implements, plus the
//!   ordered registry.
//! - [`scanner`]: workspace discovery, hash diffing, parallel dispatch, and
//!   file watching.
//! - [`workspace`]: cache directory resolution and the version gate.

pub mod document;
pub mod documents;
pub mod error;
pub mod hash_store;
pub mod indexer;
pub mod parser_pool;
pub mod scanner;
pub mod tree_cache;
pub mod workspace;

pub use document::{Document, NodeCursor};
pub use documents::DocumentManager;
pub use error::{Error, Result};
pub use hash_store::{content_hash, HashStore};
pub use indexer::{Indexer, IndexerRegistry};
pub use parser_pool::ParserPool;
pub use scanner::{CancelFlag, FileScanner, ScanConfig, ScanSummary};
pub use tree_cache::TreeCache;
pub use workspace::VersionGate;

/// Crate version, used by the version gate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
