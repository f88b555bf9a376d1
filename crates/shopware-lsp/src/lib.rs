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

//! Language server for Shopware and Symfony projects.
//!
//! The binary speaks LSP over stdio and stitches cross-file relations
//! between the project's XML service definitions, routes, Twig templates,
//! snippet files, PHP classes, and theme configuration. The indexing
//! engine underneath lives in `shopware-lsp-core`; this crate adds the
//! domain indexers, the per-capability providers, and the tower-lsp
//! dispatcher.

pub mod bootstrap;
pub mod commands;
pub mod indexers;
pub mod providers;
pub mod server;
pub mod xml;

pub use bootstrap::Bootstrap;
pub use server::ShopwareLanguageServer;

/// Server version, compared by the startup version gate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
