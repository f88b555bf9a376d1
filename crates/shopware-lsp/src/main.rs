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

//! Shopware language server binary.
//!
//! Speaks LSP over stdio; logs go to stderr. No positional arguments.
//!
//! ```bash
//! # Run the language server (stdio transport)
//! shopware-lsp
//!
//! # With debug logging
//! RUST_LOG=debug shopware-lsp
//! ```

use shopware_lsp::{Bootstrap, ShopwareLanguageServer};
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("shopware_lsp=info".parse().expect("valid log directive"))
                .add_directive(
                    "shopware_lsp_core=info".parse().expect("valid log directive"),
                ),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("starting shopware language server v{}", shopware_lsp::VERSION);

    let cache_dir = match shopware_lsp_core::workspace::ensure_cache_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!("cannot create cache directory: {e}");
            std::process::exit(1);
        }
    };

    let bootstrap = match Bootstrap::new(cache_dir) {
        Ok(bootstrap) => bootstrap,
        Err(e) => {
            tracing::error!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(|client| {
        ShopwareLanguageServer::new(client, bootstrap, shopware_lsp::VERSION.to_string())
    })
    .custom_method("shopware/forceReindex", ShopwareLanguageServer::force_reindex)
    .finish();

    Server::new(stdin, stdout, socket).serve(service).await;
}
