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

//! Go-to-definition providers.

use std::sync::Arc;

use tower_lsp::lsp_types::{Location, Range, Url};

use crate::indexers::{
    PhpClassIndexer, RouteIndexer, ServiceIndexer, SnippetIndexer, TemplateIndexer,
};
use crate::providers::{DefinitionProvider, RequestContext};

/// Service ids jump to their `<service>` element and to the backing class.
pub struct ServiceDefinitionProvider {
    services: Arc<ServiceIndexer>,
    php: Arc<PhpClassIndexer>,
}

impl ServiceDefinitionProvider {
    pub fn new(services: Arc<ServiceIndexer>, php: Arc<PhpClassIndexer>) -> Self {
        Self { services, php }
    }
}

impl DefinitionProvider for ServiceDefinitionProvider {
    fn definitions(&self, ctx: &RequestContext) -> Vec<Location> {
        if !matches!(ctx.extension().as_deref(), Some("xml" | "yaml" | "yml")) {
            return Vec::new();
        }
        let Some(id) = ctx.quoted_at() else {
            return Vec::new();
        };
        let Some(definition) = self.services.definition(&id) else {
            return Vec::new();
        };

        let mut locations = Vec::new();
        // Jumping from the defining span itself goes to the class instead.
        let at_definition = definition.span.path == ctx.path
            && definition.span.line == ctx.position.line;
        if !at_definition {
            locations.extend(definition.span.location());
        }
        if let Some(class) = definition
            .class
            .as_deref()
            .and_then(|class| self.php.class(class))
        {
            locations.extend(class.span.location());
        }
        locations
    }
}

/// Snippet keys jump to every translation file defining them.
pub struct SnippetDefinitionProvider {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetDefinitionProvider {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        Self { snippets }
    }
}

impl DefinitionProvider for SnippetDefinitionProvider {
    fn definitions(&self, ctx: &RequestContext) -> Vec<Location> {
        if ctx.extension().as_deref() != Some("twig") {
            return Vec::new();
        }
        let Some(key) = ctx.quoted_at() else {
            return Vec::new();
        };
        self.snippets
            .locations(&key)
            .into_iter()
            .filter_map(|span| span.location())
            .collect()
    }
}

/// `extends`/`include` targets jump to the template file.
pub struct TemplateDefinitionProvider {
    templates: Arc<TemplateIndexer>,
}

impl TemplateDefinitionProvider {
    pub fn new(templates: Arc<TemplateIndexer>) -> Self {
        Self { templates }
    }
}

impl DefinitionProvider for TemplateDefinitionProvider {
    fn definitions(&self, ctx: &RequestContext) -> Vec<Location> {
        if ctx.extension().as_deref() != Some("twig") {
            return Vec::new();
        }
        let Some(target) = ctx.quoted_at() else {
            return Vec::new();
        };
        // "@Storefront/storefront/…" and plain "storefront/…" both name the
        // path below a views directory.
        let logical = target
            .strip_prefix('@')
            .and_then(|rest| rest.split_once('/'))
            .map_or(target.as_str(), |(_, rest)| rest);

        let Some(path) = self.templates.template_by_logical(logical) else {
            return Vec::new();
        };
        let Ok(uri) = Url::from_file_path(&path) else {
            return Vec::new();
        };
        vec![Location {
            uri,
            range: Range::default(),
        }]
    }
}

/// Route names jump to their definition and their controller.
pub struct RouteDefinitionProvider {
    routes: Arc<RouteIndexer>,
    php: Arc<PhpClassIndexer>,
}

impl RouteDefinitionProvider {
    pub fn new(routes: Arc<RouteIndexer>, php: Arc<PhpClassIndexer>) -> Self {
        Self { routes, php }
    }
}

impl DefinitionProvider for RouteDefinitionProvider {
    fn definitions(&self, ctx: &RequestContext) -> Vec<Location> {
        let Some(name) = ctx.quoted_at() else {
            return Vec::new();
        };
        let Some(route) = self.routes.route(&name) else {
            return Vec::new();
        };

        let mut locations = Vec::new();
        let at_definition =
            route.span.path == ctx.path && route.span.line == ctx.position.line;
        if !at_definition {
            locations.extend(route.span.location());
        }
        if let Some(class) = route
            .controller
            .as_deref()
            .and_then(|controller| controller.split("::").next())
            .and_then(|class| self.php.class(class))
        {
            locations.extend(class.span.location());
        }
        locations
    }
}

/// Anything the enrichers resolved to a PHP class jumps to its declaration.
pub struct PhpClassDefinitionProvider;

impl DefinitionProvider for PhpClassDefinitionProvider {
    fn definitions(&self, ctx: &RequestContext) -> Vec<Location> {
        ctx.resolved_class
            .as_ref()
            .and_then(|class| class.span.location())
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::{DocumentManager, Indexer as _, ParserPool};
    use tower_lsp::lsp_types::Position;

    fn documents() -> DocumentManager {
        DocumentManager::new(Arc::new(ParserPool::new().unwrap()))
    }

    fn context(
        documents: &DocumentManager,
        uri: &str,
        text: &str,
        position: Position,
    ) -> RequestContext {
        let uri = Url::parse(uri).unwrap();
        documents.open(uri.as_str(), text, 1);
        RequestContext::new(documents, uri, position)
    }

    #[test]
    fn snippet_keys_resolve_to_their_translation_files() {
        let snippets = Arc::new(SnippetIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let json = r#"{"account": {"title": "Konto"}}"#;
        let tree = pool.parse("json", json.as_bytes()).unwrap();
        // Absolute path so a file URI can be formed.
        snippets
            .index_file(
                std::path::Path::new("/ws/snippet/de-DE.json"),
                &tree,
                json.as_bytes(),
            )
            .unwrap();

        let provider = SnippetDefinitionProvider::new(snippets);
        let documents = documents();
        let text = "{{ 'account.title'|trans }}";
        let ctx = context(
            &documents,
            "file:///ws/page.twig",
            text,
            Position::new(0, 8),
        );

        let locations = provider.definitions(&ctx);
        assert_eq!(locations.len(), 1);
        assert!(locations[0].uri.path().ends_with("de-DE.json"));
    }

    #[test]
    fn template_targets_resolve_with_and_without_bundle_prefix() {
        let templates = Arc::new(TemplateIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let base = "{% block page %}{% endblock %}";
        let tree = pool.parse("twig", base.as_bytes()).unwrap();
        templates
            .index_file(
                std::path::Path::new("/ws/Resources/views/storefront/page/index.html.twig"),
                &tree,
                base.as_bytes(),
            )
            .unwrap();

        let provider = TemplateDefinitionProvider::new(templates);
        let documents = documents();
        for text in [
            "{% sw_extends '@Storefront/storefront/page/index.html.twig' %}",
            "{% include 'storefront/page/index.html.twig' %}",
        ] {
            let ctx = context(
                &documents,
                "file:///ws/override.twig",
                text,
                Position::new(0, (text.len() - 6) as u32),
            );
            let locations = provider.definitions(&ctx);
            assert_eq!(locations.len(), 1, "for {text}");
            assert!(locations[0].uri.path().ends_with("index.html.twig"));
        }
    }

    #[test]
    fn unknown_symbols_resolve_to_nothing() {
        let provider = SnippetDefinitionProvider::new(Arc::new(SnippetIndexer::new(None)));
        let documents = documents();
        let ctx = context(
            &documents,
            "file:///ws/page.twig",
            "{{ 'missing.key'|trans }}",
            Position::new(0, 8),
        );
        assert!(provider.definitions(&ctx).is_empty());
    }
}
