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

//! Error types for the indexing substrate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the core indexing machinery.
///
/// Only `Grammar` and `Storage` during startup are fatal; everything else is
/// reported per file and the surrounding operation keeps going.
#[derive(Debug, Error)]
pub enum Error {
    /// A tree-sitter grammar was rejected by the linked runtime.
    #[error("grammar error: {0}")]
    Grammar(String),

    /// The hash store or an indexer store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// The file watcher could not be created or attached.
    #[error("watch error: {0}")]
    Watch(String),

    /// An indexer was registered with a duplicate or invalid identifier.
    #[error("registry error: {0}")]
    Registry(String),

    /// A domain indexer failed on a single file.
    #[error("indexer {indexer} failed on {}: {message}", path.display())]
    Index {
        indexer: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
