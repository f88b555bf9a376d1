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

//! Container service definitions and references.
//!
//! XML files contribute `<service id class parent>` definitions, their
//! `<tag name>` children, and `<argument type="service" id>` references.
//! YAML files contribute the mappings under a top-level `services:` key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use shopware_lsp_core::{Indexer, Result};

use crate::indexers::{load_store, save_store, LineIndex, SourceSpan};
use crate::xml;

const STORE_FILE: &str = "services.json";
const SCHEMA: u32 = 1;

/// One `<service>` element or YAML service mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub id: String,
    pub class: Option<String>,
    pub tags: Vec<String>,
    pub span: SourceSpan,
}

/// A place that points at a service id (argument wiring or `parent=`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReference {
    pub id: String,
    pub span: SourceSpan,
}

#[derive(Default, Serialize, Deserialize)]
struct ServiceState {
    definitions: HashMap<PathBuf, Vec<ServiceDefinition>>,
    references: HashMap<PathBuf, Vec<ServiceReference>>,
}

/// Indexer for container service definitions.
pub struct ServiceIndexer {
    state: RwLock<ServiceState>,
    dir: Option<PathBuf>,
}

impl ServiceIndexer {
    pub fn new(cache_dir: Option<&Path>) -> Self {
        let dir = cache_dir.map(|dir| dir.join("services"));
        Self {
            state: RwLock::new(load_store(dir.as_deref(), STORE_FILE, SCHEMA)),
            dir,
        }
    }

    /// Definition for a service id, first match wins.
    pub fn definition(&self, id: &str) -> Option<ServiceDefinition> {
        self.state
            .read()
            .definitions
            .values()
            .flatten()
            .find(|definition| definition.id == id)
            .cloned()
    }

    pub fn definitions_in(&self, path: &Path) -> Vec<ServiceDefinition> {
        self.state
            .read()
            .definitions
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Every reference to the service id across the workspace.
    pub fn references(&self, id: &str) -> Vec<ServiceReference> {
        self.state
            .read()
            .references
            .values()
            .flatten()
            .filter(|reference| reference.id == id)
            .cloned()
            .collect()
    }

    /// All known service ids, sorted and deduplicated.
    pub fn all_ids(&self) -> Vec<String> {
        let state = self.state.read();
        let mut ids: Vec<String> = state
            .definitions
            .values()
            .flatten()
            .map(|definition| definition.id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl Indexer for ServiceIndexer {
    fn id(&self) -> &'static str {
        "service"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xml", "yaml", "yml"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, source: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(source);
        let (definitions, references) = match crate::indexers::extension_of(path).as_deref() {
            Some("xml") => extract_xml(tree, &text, path),
            _ => (extract_yaml(tree, &text, path), Vec::new()),
        };

        let mut state = self.state.write();
        if definitions.is_empty() {
            state.definitions.remove(path);
        } else {
            state.definitions.insert(path.to_path_buf(), definitions);
        }
        if references.is_empty() {
            state.references.remove(path);
        } else {
            state.references.insert(path.to_path_buf(), references);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.write();
        state.definitions.remove(path);
        state.references.remove(path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        save_store(self.dir.as_deref(), STORE_FILE, SCHEMA, &*self.state.read())
    }
}

/// Pull service definitions and references out of an XML tree. Also used by
/// the diagnostics provider against live documents.
pub(crate) fn extract_xml(
    tree: &Tree,
    source: &str,
    path: &Path,
) -> (Vec<ServiceDefinition>, Vec<ServiceReference>) {
    let bytes = source.as_bytes();
    let lines = LineIndex::new(source);
    let mut definitions = Vec::new();
    let mut references = Vec::new();

    xml::for_each_element(tree.root_node(), &mut |element| {
        match xml::element_name(element, bytes) {
            Some("service") => {
                let Some(id) = xml::attribute(element, bytes, "id") else {
                    return;
                };
                let class = xml::attribute(element, bytes, "class")
                    .map(|attr| attr.value.to_string())
                    .or_else(|| id.value.contains('\\').then(|| id.value.to_string()));

                let mut tags = Vec::new();
                let service_id = element.id();
                xml::for_each_element(element, &mut |child| {
                    if child.id() != service_id
                        && xml::element_name(child, bytes) == Some("tag")
                    {
                        if let Some(name) = xml::attribute(child, bytes, "name") {
                            tags.push(name.value.to_string());
                        }
                    }
                });

                if let Some(parent) = xml::attribute(element, bytes, "parent") {
                    references.push(ServiceReference {
                        id: parent.value.to_string(),
                        span: lines.span(source, path, parent.value_start, parent.value_end),
                    });
                }

                definitions.push(ServiceDefinition {
                    id: id.value.to_string(),
                    class,
                    tags,
                    span: lines.span(source, path, id.value_start, id.value_end),
                });
            }
            Some("argument") => {
                let is_service_ref = xml::attribute(element, bytes, "type")
                    .is_some_and(|attr| attr.value == "service");
                if !is_service_ref {
                    return;
                }
                if let Some(id) = xml::attribute(element, bytes, "id") {
                    references.push(ServiceReference {
                        id: id.value.to_string(),
                        span: lines.span(source, path, id.value_start, id.value_end),
                    });
                }
            }
            _ => {}
        }
    });

    (definitions, references)
}

fn extract_yaml(tree: &Tree, source: &str, path: &Path) -> Vec<ServiceDefinition> {
    let bytes = source.as_bytes();
    let lines = LineIndex::new(source);
    let mut definitions: Vec<ServiceDefinition> = Vec::new();
    let mut chain: Vec<String> = Vec::new();
    visit_yaml(tree.root_node(), bytes, source, path, &lines, &mut chain, &mut definitions);
    definitions
}

fn visit_yaml(
    node: Node<'_>,
    bytes: &[u8],
    source: &str,
    path: &Path,
    lines: &LineIndex,
    chain: &mut Vec<String>,
    definitions: &mut Vec<ServiceDefinition>,
) {
    let is_pair = matches!(node.kind(), "block_mapping_pair" | "flow_pair");
    let mut pushed = false;
    if is_pair {
        if let Some(key) = node.child_by_field_name("key") {
            let key_text = key.utf8_text(bytes).unwrap_or_default().to_string();

            if chain.len() == 1 && chain[0] == "services" && key_text != "_defaults" {
                let class = key_text.contains('\\').then(|| key_text.clone());
                definitions.push(ServiceDefinition {
                    id: key_text.clone(),
                    class,
                    tags: Vec::new(),
                    span: lines.span(source, path, key.start_byte(), key.end_byte()),
                });
            } else if chain.len() == 2 && chain[0] == "services" && key_text == "class" {
                if let Some(value) = node.child_by_field_name("value") {
                    let class = value.utf8_text(bytes).unwrap_or_default().trim().to_string();
                    if let Some(definition) = definitions
                        .iter_mut()
                        .rev()
                        .find(|definition| definition.id == chain[1])
                    {
                        definition.class = Some(class);
                    }
                }
            }

            chain.push(key_text);
            pushed = true;
        }
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            visit_yaml(child, bytes, source, path, lines, chain, definitions);
        }
    }
    if pushed {
        chain.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::ParserPool;

    const XML: &str = r#"<container>
  <services>
    <service id="swag.demo.command" class="Swag\Demo\Command">
      <argument type="service" id="swag.demo.repository"/>
      <tag name="console.command"/>
    </service>
    <service id="Swag\Demo\Repository"/>
  </services>
</container>"#;

    fn index_str(indexer: &ServiceIndexer, name: &str, ext: &str, source: &str) -> PathBuf {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse(ext, source.as_bytes()).unwrap();
        let path = PathBuf::from(format!("/ws/{name}"));
        indexer.index_file(&path, &tree, source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn xml_services_are_extracted_with_class_tags_and_references() {
        let indexer = ServiceIndexer::new(None);
        index_str(&indexer, "services.xml", "xml", XML);

        let command = indexer.definition("swag.demo.command").unwrap();
        assert_eq!(command.class.as_deref(), Some("Swag\\Demo\\Command"));
        assert_eq!(command.tags, vec!["console.command".to_string()]);
        assert_eq!(command.span.line, 2);

        // Class-less FQCN-style ids fall back to themselves.
        let repo = indexer.definition("Swag\\Demo\\Repository").unwrap();
        assert_eq!(repo.class.as_deref(), Some("Swag\\Demo\\Repository"));

        let references = indexer.references("swag.demo.repository");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].span.line, 3);
    }

    #[test]
    fn yaml_services_are_extracted() {
        let indexer = ServiceIndexer::new(None);
        let yaml = "services:\n  swag.demo.listener:\n    class: Swag\\Demo\\Listener\n  Swag\\Demo\\Subscriber: ~\n";
        index_str(&indexer, "services.yaml", "yaml", yaml);

        let listener = indexer.definition("swag.demo.listener").unwrap();
        assert_eq!(listener.class.as_deref(), Some("Swag\\Demo\\Listener"));
        assert_eq!(listener.span.line, 1);

        let subscriber = indexer.definition("Swag\\Demo\\Subscriber").unwrap();
        assert_eq!(subscriber.class.as_deref(), Some("Swag\\Demo\\Subscriber"));
    }

    #[test]
    fn reindexing_replaces_prior_facts() {
        let indexer = ServiceIndexer::new(None);
        let path = index_str(&indexer, "services.xml", "xml", XML);
        assert_eq!(indexer.all_ids().len(), 2);

        let pool = ParserPool::new().unwrap();
        let smaller = r#"<container><service id="swag.demo.command"/></container>"#;
        let tree = pool.parse("xml", smaller.as_bytes()).unwrap();
        indexer.index_file(&path, &tree, smaller.as_bytes()).unwrap();

        assert_eq!(indexer.all_ids(), vec!["swag.demo.command".to_string()]);
        assert!(indexer.references("swag.demo.repository").is_empty());
    }

    #[test]
    fn indexing_twice_is_idempotent() {
        let indexer = ServiceIndexer::new(None);
        index_str(&indexer, "services.xml", "xml", XML);
        let first = indexer.all_ids();
        index_str(&indexer, "services.xml", "xml", XML);
        assert_eq!(indexer.all_ids(), first);
        assert_eq!(indexer.references("swag.demo.repository").len(), 1);
    }

    #[test]
    fn remove_file_drops_every_fact() {
        let indexer = ServiceIndexer::new(None);
        let path = index_str(&indexer, "services.xml", "xml", XML);
        indexer.remove_file(&path).unwrap();
        assert!(indexer.all_ids().is_empty());
        assert!(indexer.references("swag.demo.repository").is_empty());
        // Unknown paths are fine.
        indexer.remove_file(Path::new("/ws/unknown.xml")).unwrap();
    }

    #[test]
    fn store_persists_across_instances() {
        let cache = tempfile::tempdir().unwrap();
        {
            let indexer = ServiceIndexer::new(Some(cache.path()));
            index_str(&indexer, "services.xml", "xml", XML);
            indexer.close().unwrap();
        }
        let reopened = ServiceIndexer::new(Some(cache.path()));
        assert_eq!(reopened.all_ids().len(), 2);
    }
}
