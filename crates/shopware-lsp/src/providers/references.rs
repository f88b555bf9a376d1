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

//! Find-references providers.

use std::sync::Arc;

use tower_lsp::lsp_types::Location;

use crate::indexers::{ServiceIndexer, TemplateIndexer};
use crate::providers::{ReferenceProvider, RequestContext};

/// References to a service id from argument wiring and `parent=`.
pub struct ServiceReferencesProvider {
    services: Arc<ServiceIndexer>,
}

impl ServiceReferencesProvider {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        Self { services }
    }
}

impl ReferenceProvider for ServiceReferencesProvider {
    fn references(&self, ctx: &RequestContext) -> Vec<Location> {
        if !matches!(ctx.extension().as_deref(), Some("xml" | "yaml" | "yml")) {
            return Vec::new();
        }
        let Some(id) = ctx.quoted_at() else {
            return Vec::new();
        };
        let mut locations: Vec<Location> = self
            .services
            .references(&id)
            .into_iter()
            .filter_map(|reference| reference.span.location())
            .collect();
        if let Some(definition) = self.services.definition(&id) {
            locations.extend(definition.span.location());
        }
        locations
    }
}

/// Every template defining or overriding the block under the cursor.
pub struct TwigBlockReferencesProvider {
    templates: Arc<TemplateIndexer>,
}

impl TwigBlockReferencesProvider {
    pub fn new(templates: Arc<TemplateIndexer>) -> Self {
        Self { templates }
    }
}

impl ReferenceProvider for TwigBlockReferencesProvider {
    fn references(&self, ctx: &RequestContext) -> Vec<Location> {
        if ctx.extension().as_deref() != Some("twig") {
            return Vec::new();
        }
        let Some(name) = word_at(ctx) else {
            return Vec::new();
        };
        self.templates
            .blocks(&name)
            .into_iter()
            .filter_map(|span| span.location())
            .collect()
    }
}

/// Identifier (`[A-Za-z0-9_]+`) around the cursor.
fn word_at(ctx: &RequestContext) -> Option<String> {
    let document = ctx.document.as_ref()?;
    let text = document.text();
    let offset = document.offset_at(ctx.position.line, ctx.position.character);
    let bytes = text.as_bytes();
    let is_word = |byte: u8| byte.is_ascii_alphanumeric() || byte == b'_';

    let mut start = offset;
    while start > 0 && is_word(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < bytes.len() && is_word(bytes[end]) {
        end += 1;
    }
    (start < end).then(|| text[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::{DocumentManager, Indexer as _, ParserPool};
    use tower_lsp::lsp_types::{Position, Url};

    #[test]
    fn block_references_span_defining_and_overriding_templates() {
        let templates = Arc::new(TemplateIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        for (path, source) in [
            ("/ws/views/base.html.twig", "{% block page_header %}{% endblock %}"),
            ("/ws/views/child.html.twig", "{% block page_header %}override{% endblock %}"),
        ] {
            let tree = pool.parse("twig", source.as_bytes()).unwrap();
            templates
                .index_file(std::path::Path::new(path), &tree, source.as_bytes())
                .unwrap();
        }

        let provider = TwigBlockReferencesProvider::new(templates);
        let documents = DocumentManager::new(Arc::new(ParserPool::new().unwrap()));
        let uri = Url::parse("file:///ws/views/base.html.twig").unwrap();
        let text = "{% block page_header %}{% endblock %}";
        documents.open(uri.as_str(), text, 1);
        // Cursor inside the block name.
        let ctx = RequestContext::new(&documents, uri, Position::new(0, 12));

        let locations = provider.references(&ctx);
        assert_eq!(locations.len(), 2);
    }

    #[test]
    fn service_references_include_the_definition() {
        let services = Arc::new(ServiceIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let xml = r#"<container>
  <service id="swag.demo" class="Swag\Demo"/>
  <service id="swag.consumer"><argument type="service" id="swag.demo"/></service>
</container>"#;
        let tree = pool.parse("xml", xml.as_bytes()).unwrap();
        services
            .index_file(std::path::Path::new("/ws/services.xml"), &tree, xml.as_bytes())
            .unwrap();

        let provider = ServiceReferencesProvider::new(services);
        let documents = DocumentManager::new(Arc::new(ParserPool::new().unwrap()));
        let uri = Url::parse("file:///ws/services.xml").unwrap();
        documents.open(uri.as_str(), xml, 1);
        // Cursor inside the argument's id value on line 2.
        let character = xml.lines().nth(2).unwrap().find("swag.demo").unwrap() + 2;
        let ctx = RequestContext::new(&documents, uri, Position::new(2, character as u32));

        let locations = provider.references(&ctx);
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].range.start.line, 2);
        assert_eq!(locations[1].range.start.line, 1);
    }
}
