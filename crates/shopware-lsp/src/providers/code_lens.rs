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

//! Code-lens providers.
//!
//! Lenses are produced cheaply from the live buffer and resolved lazily:
//! the unresolved lens carries a `data` payload with the provider's `kind`
//! discriminator, and `codeLens/resolve` routes it back here for the
//! workspace-wide counting.

use std::sync::Arc;

use serde_json::{json, Value};
use tower_lsp::lsp_types::{CodeLens, Command};

use shopware_lsp_core::workspace::normalize_uri;
use shopware_lsp_core::Document;

use crate::indexers::template::extract_facts;
use crate::indexers::{service, ServiceIndexer, TemplateIndexer};
use crate::providers::CodeLensProvider;

pub const TWIG_BLOCK_LENS: &str = "twig.block.overrides";
pub const SERVICE_LENS: &str = "service.references";

/// "N override(s)" above every `{% block %}` definition.
pub struct TwigBlockLensProvider {
    templates: Arc<TemplateIndexer>,
}

impl TwigBlockLensProvider {
    pub fn new(templates: Arc<TemplateIndexer>) -> Self {
        Self { templates }
    }
}

impl CodeLensProvider for TwigBlockLensProvider {
    fn lens_kind(&self) -> &'static str {
        TWIG_BLOCK_LENS
    }

    fn lenses(&self, document: &Document) -> Vec<CodeLens> {
        let path = document.path();
        if crate::indexers::extension_of(&path).as_deref() != Some("twig") {
            return Vec::new();
        }
        let facts = extract_facts(document.text(), &path);
        facts
            .blocks
            .into_iter()
            .map(|block| CodeLens {
                range: block.span.range(),
                command: None,
                data: Some(json!({
                    "kind": TWIG_BLOCK_LENS,
                    "name": block.name,
                    "path": path.to_string_lossy(),
                })),
            })
            .collect()
    }

    fn resolve(&self, mut lens: CodeLens) -> CodeLens {
        let Some((name, path)) = lens_payload(&lens) else {
            return lens;
        };
        let overrides = self
            .templates
            .blocks(&name)
            .into_iter()
            .filter(|span| span.path != path)
            .count();
        lens.command = Some(Command {
            title: match overrides {
                1 => "1 override".to_string(),
                n => format!("{n} overrides"),
            },
            command: "shopware/template.blocks".to_string(),
            arguments: Some(vec![Value::String(name)]),
        });
        lens
    }
}

/// "N reference(s)" above every `<service>` definition.
pub struct ServiceLensProvider {
    services: Arc<ServiceIndexer>,
}

impl ServiceLensProvider {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        Self { services }
    }
}

impl CodeLensProvider for ServiceLensProvider {
    fn lens_kind(&self) -> &'static str {
        SERVICE_LENS
    }

    fn lenses(&self, document: &Document) -> Vec<CodeLens> {
        let path = document.path();
        if crate::indexers::extension_of(&path).as_deref() != Some("xml") {
            return Vec::new();
        }
        let Some(tree) = document.tree() else {
            return Vec::new();
        };
        let (definitions, _) = service::extract_xml(tree, document.text(), &path);
        definitions
            .into_iter()
            .map(|definition| CodeLens {
                range: definition.span.range(),
                command: None,
                data: Some(json!({
                    "kind": SERVICE_LENS,
                    "name": definition.id,
                    "path": path.to_string_lossy(),
                })),
            })
            .collect()
    }

    fn resolve(&self, mut lens: CodeLens) -> CodeLens {
        let Some((id, _)) = lens_payload(&lens) else {
            return lens;
        };
        let references = self.services.references(&id).len();
        lens.command = Some(Command {
            title: match references {
                1 => "1 reference".to_string(),
                n => format!("{n} references"),
            },
            command: String::new(),
            arguments: None,
        });
        lens
    }
}

fn lens_payload(lens: &CodeLens) -> Option<(String, std::path::PathBuf)> {
    let data = lens.data.as_ref()?;
    let name = data.get("name")?.as_str()?.to_string();
    let path = normalize_uri(data.get("path")?.as_str()?);
    Some((name, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::{DocumentManager, Indexer as _, ParserPool};

    #[test]
    fn block_lenses_resolve_to_override_counts() {
        let templates = Arc::new(TemplateIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        for (path, source) in [
            ("/ws/views/base.html.twig", "{% block header %}{% endblock %}"),
            ("/ws/views/a.html.twig", "{% block header %}{% endblock %}"),
            ("/ws/views/b.html.twig", "{% block header %}{% endblock %}"),
        ] {
            let tree = pool.parse("twig", source.as_bytes()).unwrap();
            templates
                .index_file(std::path::Path::new(path), &tree, source.as_bytes())
                .unwrap();
        }

        let provider = TwigBlockLensProvider::new(templates);
        let documents = DocumentManager::new(Arc::new(ParserPool::new().unwrap()));
        documents.open(
            "file:///ws/views/base.html.twig",
            "{% block header %}{% endblock %}",
            1,
        );
        let document = documents.get("file:///ws/views/base.html.twig").unwrap();

        let lenses = provider.lenses(&document);
        assert_eq!(lenses.len(), 1);
        assert!(lenses[0].command.is_none());

        let resolved = provider.resolve(lenses[0].clone());
        let command = resolved.command.unwrap();
        assert_eq!(command.title, "2 overrides");
        assert_eq!(command.command, "shopware/template.blocks");
    }

    #[test]
    fn service_lenses_count_references() {
        let services = Arc::new(ServiceIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let xml = r#"<container>
  <service id="swag.demo" class="Swag\Demo"/>
  <service id="a"><argument type="service" id="swag.demo"/></service>
</container>"#;
        let tree = pool.parse("xml", xml.as_bytes()).unwrap();
        services
            .index_file(std::path::Path::new("/ws/services.xml"), &tree, xml.as_bytes())
            .unwrap();

        let provider = ServiceLensProvider::new(services);
        let documents = DocumentManager::new(Arc::new(ParserPool::new().unwrap()));
        documents.open("file:///ws/services.xml", xml, 1);
        let document = documents.get("file:///ws/services.xml").unwrap();

        let lenses = provider.lenses(&document);
        assert_eq!(lenses.len(), 2);

        let resolved = provider.resolve(lenses[0].clone());
        assert_eq!(resolved.command.unwrap().title, "1 reference");
    }
}
