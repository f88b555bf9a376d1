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

//! `workspace/executeCommand` handlers contributed by the indexers.
//!
//! Command names live in the `shopware/` namespace; parameters and results
//! pass through as opaque JSON.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use crate::indexers::{ServiceIndexer, SnippetIndexer, TemplateIndexer};
use crate::providers::CommandHandler;

/// `shopware/service.list` → all known service ids.
pub struct ServiceListCommand {
    services: Arc<ServiceIndexer>,
}

impl ServiceListCommand {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        Self { services }
    }
}

impl CommandHandler for ServiceListCommand {
    fn command(&self) -> &'static str {
        "shopware/service.list"
    }

    fn execute(&self, _arguments: &[Value]) -> Option<Value> {
        Some(json!({ "services": self.services.all_ids() }))
    }
}

/// `shopware/snippet.list` → all known snippet keys.
pub struct SnippetListCommand {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetListCommand {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        Self { snippets }
    }
}

impl CommandHandler for SnippetListCommand {
    fn command(&self) -> &'static str {
        "shopware/snippet.list"
    }

    fn execute(&self, _arguments: &[Value]) -> Option<Value> {
        Some(json!({ "keys": self.snippets.all_keys() }))
    }
}

/// `shopware/snippet.create <key>` → insert the key into every snippet
/// file that lacks it.
pub struct SnippetCreateCommand {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetCreateCommand {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        Self { snippets }
    }
}

impl CommandHandler for SnippetCreateCommand {
    fn command(&self) -> &'static str {
        "shopware/snippet.create"
    }

    fn execute(&self, arguments: &[Value]) -> Option<Value> {
        let key = arguments.first()?.as_str()?;
        match self.snippets.create_key(key) {
            Ok(touched) => Some(json!({
                "created": touched
                    .iter()
                    .map(|path| path.to_string_lossy().into_owned())
                    .collect::<Vec<_>>(),
            })),
            Err(e) => {
                warn!("snippet.create failed for '{key}': {e}");
                Some(json!({ "error": e.to_string() }))
            }
        }
    }
}

/// `shopware/template.blocks <name>` → every template defining the block.
pub struct TemplateBlocksCommand {
    templates: Arc<TemplateIndexer>,
}

impl TemplateBlocksCommand {
    pub fn new(templates: Arc<TemplateIndexer>) -> Self {
        Self { templates }
    }
}

impl CommandHandler for TemplateBlocksCommand {
    fn command(&self) -> &'static str {
        "shopware/template.blocks"
    }

    fn execute(&self, arguments: &[Value]) -> Option<Value> {
        let name = arguments.first()?.as_str()?;
        let blocks: Vec<Value> = self
            .templates
            .blocks(name)
            .into_iter()
            .map(|span| {
                json!({
                    "path": span.path.to_string_lossy().into_owned(),
                    "line": span.line,
                })
            })
            .collect();
        Some(json!({ "blocks": blocks }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::{Indexer as _, ParserPool};

    #[test]
    fn service_list_returns_sorted_ids() {
        let services = Arc::new(ServiceIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let xml = r#"<container><service id="b"/><service id="a"/></container>"#;
        let tree = pool.parse("xml", xml.as_bytes()).unwrap();
        services
            .index_file(std::path::Path::new("/ws/services.xml"), &tree, xml.as_bytes())
            .unwrap();

        let command = ServiceListCommand::new(services);
        let result = command.execute(&[]).unwrap();
        assert_eq!(result["services"], json!(["a", "b"]));
    }

    #[test]
    fn template_blocks_returns_definition_sites() {
        let templates = Arc::new(TemplateIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let twig = "{% block header %}{% endblock %}";
        let tree = pool.parse("twig", twig.as_bytes()).unwrap();
        templates
            .index_file(
                std::path::Path::new("/ws/views/base.html.twig"),
                &tree,
                twig.as_bytes(),
            )
            .unwrap();

        let command = TemplateBlocksCommand::new(templates);
        let result = command
            .execute(&[Value::String("header".into())])
            .unwrap();
        assert_eq!(result["blocks"][0]["line"], json!(0));

        // Missing arguments short-circuit to None.
        assert!(command.execute(&[]).is_none());
    }
}
