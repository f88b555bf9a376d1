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

//! Wires the substrate, the domain indexers, and the providers together.
//!
//! Everything is constructed before the server starts: indexers first,
//! then the providers that read them, in the registration order that
//! determines result concatenation.

use std::path::PathBuf;
use std::sync::Arc;

use shopware_lsp_core::{
    DocumentManager, FileScanner, HashStore, IndexerRegistry, ParserPool, Result, ScanConfig,
};

use crate::commands::{
    ServiceListCommand, SnippetCreateCommand, SnippetListCommand, TemplateBlocksCommand,
};
use crate::indexers::php::PhpClassEnricher;
use crate::indexers::{
    PhpClassIndexer, RouteIndexer, ServiceIndexer, SnippetIndexer, TemplateIndexer,
    ThemeConfigIndexer,
};
use crate::providers::code_action::MissingSnippetAction;
use crate::providers::code_lens::{ServiceLensProvider, TwigBlockLensProvider};
use crate::providers::completion::{
    ServiceIdCompletion, SnippetKeyCompletion, ThemeVariableCompletion, TwigBlockCompletion,
};
use crate::providers::definition::{
    PhpClassDefinitionProvider, RouteDefinitionProvider, ServiceDefinitionProvider,
    SnippetDefinitionProvider, TemplateDefinitionProvider,
};
use crate::providers::diagnostics::{ServiceClassDiagnostics, SnippetUsageDiagnostics};
use crate::providers::hover::{PhpClassHoverProvider, ServiceHoverProvider, SnippetHoverProvider};
use crate::providers::references::{ServiceReferencesProvider, TwigBlockReferencesProvider};
use crate::providers::ProviderRegistry;

/// All long-lived server state, ready to hand to the dispatcher.
pub struct Bootstrap {
    pub cache_dir: PathBuf,
    pub parsers: Arc<ParserPool>,
    pub documents: Arc<DocumentManager>,
    pub hashes: Arc<HashStore>,
    pub indexers: Arc<IndexerRegistry>,
    pub providers: Arc<ProviderRegistry>,
    pub scanner: Arc<FileScanner>,
}

impl Bootstrap {
    /// Build the full component graph. Grammar or storage failure here is
    /// fatal at startup.
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        let parsers = Arc::new(ParserPool::new()?);
        let documents = Arc::new(DocumentManager::new(Arc::clone(&parsers)));
        let hashes = Arc::new(HashStore::open(&cache_dir)?);

        let services = Arc::new(ServiceIndexer::new(Some(&cache_dir)));
        let php = Arc::new(PhpClassIndexer::new(Some(&cache_dir)));
        let routes = Arc::new(RouteIndexer::new(Some(&cache_dir)));
        let snippets = Arc::new(SnippetIndexer::new(Some(&cache_dir)));
        let templates = Arc::new(TemplateIndexer::new(Some(&cache_dir)));
        let theme = Arc::new(ThemeConfigIndexer::new(Some(&cache_dir)));

        let mut indexers = IndexerRegistry::new();
        indexers.register(Arc::clone(&services) as _)?;
        indexers.register(Arc::clone(&php) as _)?;
        indexers.register(Arc::clone(&routes) as _)?;
        indexers.register(Arc::clone(&snippets) as _)?;
        indexers.register(Arc::clone(&templates) as _)?;
        indexers.register(Arc::clone(&theme) as _)?;

        let mut providers = ProviderRegistry::new();

        providers.register_completion(Arc::new(ServiceIdCompletion::new(Arc::clone(&services))));
        providers.register_completion(Arc::new(SnippetKeyCompletion::new(Arc::clone(&snippets))));
        providers.register_completion(Arc::new(TwigBlockCompletion::new(Arc::clone(&templates))));
        providers.register_completion(Arc::new(ThemeVariableCompletion::new(Arc::clone(&theme))));

        providers.register_definition(Arc::new(ServiceDefinitionProvider::new(
            Arc::clone(&services),
            Arc::clone(&php),
        )));
        providers.register_definition(Arc::new(SnippetDefinitionProvider::new(Arc::clone(
            &snippets,
        ))));
        providers.register_definition(Arc::new(TemplateDefinitionProvider::new(Arc::clone(
            &templates,
        ))));
        providers.register_definition(Arc::new(RouteDefinitionProvider::new(
            Arc::clone(&routes),
            Arc::clone(&php),
        )));
        providers.register_definition(Arc::new(PhpClassDefinitionProvider));

        providers.register_references(Arc::new(ServiceReferencesProvider::new(Arc::clone(
            &services,
        ))));
        providers.register_references(Arc::new(TwigBlockReferencesProvider::new(Arc::clone(
            &templates,
        ))));

        providers.register_hover(Arc::new(ServiceHoverProvider::new(Arc::clone(&services))));
        providers.register_hover(Arc::new(SnippetHoverProvider::new(Arc::clone(&snippets))));
        providers.register_hover(Arc::new(PhpClassHoverProvider));

        providers.register_code_lens(Arc::new(TwigBlockLensProvider::new(Arc::clone(
            &templates,
        ))));
        providers.register_code_lens(Arc::new(ServiceLensProvider::new(Arc::clone(&services))));

        providers.register_code_action(Arc::new(MissingSnippetAction));

        providers.register_diagnostics(Arc::new(SnippetUsageDiagnostics::new(Arc::clone(
            &snippets,
        ))));
        providers.register_diagnostics(Arc::new(ServiceClassDiagnostics::new(Arc::clone(&php))));

        providers.register_command(Arc::new(ServiceListCommand::new(Arc::clone(&services))));
        providers.register_command(Arc::new(SnippetListCommand::new(Arc::clone(&snippets))));
        providers.register_command(Arc::new(SnippetCreateCommand::new(Arc::clone(&snippets))));
        providers.register_command(Arc::new(TemplateBlocksCommand::new(Arc::clone(
            &templates,
        ))));

        providers.register_enricher(Arc::new(PhpClassEnricher::new(Arc::clone(&php))));

        let indexers = Arc::new(indexers);
        let scanner = Arc::new(FileScanner::new(
            Arc::clone(&indexers),
            Arc::clone(&parsers),
            Arc::clone(&hashes),
            ScanConfig::default(),
        ));

        Ok(Self {
            cache_dir,
            parsers,
            documents,
            hashes,
            indexers: Arc::clone(&indexers),
            providers: Arc::new(providers),
            scanner,
        })
    }
}
