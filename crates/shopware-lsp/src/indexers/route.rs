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

//! Route names from routing XML and `#[Route]` controller attributes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use shopware_lsp_core::{Indexer, Result};

use crate::indexers::php::{file_namespace, visit};
use crate::indexers::{load_store, save_store, LineIndex, SourceSpan};
use crate::xml;

const STORE_FILE: &str = "routes.json";
const SCHEMA: u32 = 1;

/// One named route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub name: String,
    pub path: Option<String>,
    pub controller: Option<String>,
    pub span: SourceSpan,
}

#[derive(Default, Serialize, Deserialize)]
struct RouteState {
    routes: HashMap<PathBuf, Vec<RouteDefinition>>,
}

/// Indexer for route definitions.
pub struct RouteIndexer {
    state: RwLock<RouteState>,
    dir: Option<PathBuf>,
}

impl RouteIndexer {
    pub fn new(cache_dir: Option<&Path>) -> Self {
        let dir = cache_dir.map(|dir| dir.join("routes"));
        Self {
            state: RwLock::new(load_store(dir.as_deref(), STORE_FILE, SCHEMA)),
            dir,
        }
    }

    pub fn route(&self, name: &str) -> Option<RouteDefinition> {
        self.state
            .read()
            .routes
            .values()
            .flatten()
            .find(|route| route.name == name)
            .cloned()
    }

    pub fn all_names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state
            .routes
            .values()
            .flatten()
            .map(|route| route.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Routes handled by the given class (`Fqcn` or `Fqcn::method`).
    pub fn by_controller(&self, class: &str) -> Vec<RouteDefinition> {
        self.state
            .read()
            .routes
            .values()
            .flatten()
            .filter(|route| {
                route
                    .controller
                    .as_deref()
                    .is_some_and(|controller| controller == class || controller.starts_with(&format!("{class}::")))
            })
            .cloned()
            .collect()
    }
}

impl Indexer for RouteIndexer {
    fn id(&self) -> &'static str {
        "route"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xml", "php"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, source: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(source);
        let routes = match crate::indexers::extension_of(path).as_deref() {
            Some("php") => extract_php_routes(tree, &text, path),
            _ => extract_xml_routes(tree, &text, path),
        };
        let mut state = self.state.write();
        if routes.is_empty() {
            state.routes.remove(path);
        } else {
            state.routes.insert(path.to_path_buf(), routes);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.state.write().routes.remove(path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        save_store(self.dir.as_deref(), STORE_FILE, SCHEMA, &*self.state.read())
    }
}

fn extract_xml_routes(tree: &Tree, source: &str, path: &Path) -> Vec<RouteDefinition> {
    let bytes = source.as_bytes();
    let lines = LineIndex::new(source);
    let mut routes = Vec::new();

    xml::for_each_element(tree.root_node(), &mut |element| {
        if xml::element_name(element, bytes) != Some("route") {
            return;
        }
        let Some(id) = xml::attribute(element, bytes, "id") else {
            return;
        };
        routes.push(RouteDefinition {
            name: id.value.to_string(),
            path: xml::attribute(element, bytes, "path").map(|attr| attr.value.to_string()),
            controller: xml::attribute(element, bytes, "controller")
                .map(|attr| attr.value.to_string()),
            span: lines.span(source, path, id.value_start, id.value_end),
        });
    });

    routes
}

fn extract_php_routes(tree: &Tree, source: &str, path: &Path) -> Vec<RouteDefinition> {
    let bytes = source.as_bytes();
    let lines = LineIndex::new(source);
    let namespace = file_namespace(tree, bytes);
    let mut routes = Vec::new();

    visit(tree.root_node(), &mut |node| {
        if node.kind() != "attribute" {
            return;
        }
        let Some(attr_name) = attribute_name(node, bytes) else {
            return;
        };
        if attr_name != "Route" && !attr_name.ends_with("\\Route") {
            return;
        }

        let mut route_name: Option<(String, usize, usize)> = None;
        let mut route_path: Option<String> = None;
        if let Some(arguments) = named_child_of_kind(node, "arguments") {
            for i in 0..arguments.named_child_count() {
                let Some(argument) = arguments.named_child(i) else {
                    continue;
                };
                if argument.kind() != "argument" {
                    continue;
                }
                let label = argument
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(bytes).ok());
                let Some(string) = first_string(argument, bytes) else {
                    continue;
                };
                match label {
                    Some("name") => route_name = Some(string),
                    Some("path") => route_path = Some(string.0),
                    None if route_path.is_none() => route_path = Some(string.0),
                    _ => {}
                }
            }
        }

        let Some((name, start, end)) = route_name else {
            return;
        };
        routes.push(RouteDefinition {
            name,
            path: route_path,
            controller: enclosing_controller(node, bytes, namespace.as_deref()),
            span: lines.span(source, path, start, end),
        });
    });

    routes
}

fn attribute_name<'a>(attribute: Node<'_>, source: &'a [u8]) -> Option<&'a str> {
    for i in 0..attribute.named_child_count() {
        let child = attribute.named_child(i)?;
        if matches!(child.kind(), "name" | "qualified_name") {
            return child.utf8_text(source).ok();
        }
    }
    None
}

fn named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    (0..node.named_child_count())
        .filter_map(|i| node.named_child(i))
        .find(|child| child.kind() == kind)
}

/// First string literal inside `node`, unquoted, with its byte span.
fn first_string(node: Node<'_>, source: &[u8]) -> Option<(String, usize, usize)> {
    let mut found = None;
    visit(node, &mut |candidate| {
        if found.is_none() && candidate.kind() == "string_content" {
            found = Some((
                candidate.utf8_text(source).unwrap_or_default().to_string(),
                candidate.start_byte(),
                candidate.end_byte(),
            ));
        }
    });
    found
}

/// `Namespace\Class::method` for the declaration the attribute annotates.
fn enclosing_controller(
    attribute: Node<'_>,
    source: &[u8],
    namespace: Option<&str>,
) -> Option<String> {
    let mut method = None;
    let mut class = None;
    let mut current = attribute.parent();
    while let Some(node) = current {
        match node.kind() {
            "method_declaration" if method.is_none() => {
                method = node
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok());
            }
            "class_declaration" => {
                class = node
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok());
                break;
            }
            _ => {}
        }
        current = node.parent();
    }
    let class = class?;
    let fqcn = match namespace {
        Some(ns) => format!("{ns}\\{class}"),
        None => class.to_string(),
    };
    Some(match method {
        Some(method) => format!("{fqcn}::{method}"),
        None => fqcn,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::ParserPool;

    const ROUTES_XML: &str = r#"<routes>
  <route id="frontend.demo.list" path="/demo" controller="Swag\Demo\Controller\DemoController::list"/>
</routes>"#;

    const CONTROLLER_PHP: &str = r#"<?php

namespace Swag\Demo\Controller;

use Symfony\Component\Routing\Attribute\Route;

class DemoController
{
    #[Route('/demo/show', name: 'frontend.demo.show')]
    public function show(): void {}
}
"#;

    fn index_str(indexer: &RouteIndexer, name: &str, ext: &str, source: &str) -> PathBuf {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse(ext, source.as_bytes()).unwrap();
        let path = PathBuf::from(format!("/ws/{name}"));
        indexer.index_file(&path, &tree, source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn xml_routes_carry_path_and_controller() {
        let indexer = RouteIndexer::new(None);
        index_str(&indexer, "routes.xml", "xml", ROUTES_XML);

        let route = indexer.route("frontend.demo.list").unwrap();
        assert_eq!(route.path.as_deref(), Some("/demo"));
        assert_eq!(
            route.controller.as_deref(),
            Some("Swag\\Demo\\Controller\\DemoController::list")
        );
        assert_eq!(route.span.line, 1);
    }

    #[test]
    fn php_route_attributes_resolve_name_path_and_controller() {
        let indexer = RouteIndexer::new(None);
        index_str(&indexer, "DemoController.php", "php", CONTROLLER_PHP);

        let route = indexer.route("frontend.demo.show").unwrap();
        assert_eq!(route.path.as_deref(), Some("/demo/show"));
        assert_eq!(
            route.controller.as_deref(),
            Some("Swag\\Demo\\Controller\\DemoController::show")
        );

        let by_controller = indexer.by_controller("Swag\\Demo\\Controller\\DemoController");
        assert_eq!(by_controller.len(), 1);
    }

    #[test]
    fn reindex_and_remove_replace_facts() {
        let indexer = RouteIndexer::new(None);
        let path = index_str(&indexer, "routes.xml", "xml", ROUTES_XML);
        assert_eq!(indexer.all_names().len(), 1);

        index_str(&indexer, "routes.xml", "xml", "<routes/>");
        assert!(indexer.all_names().is_empty());

        index_str(&indexer, "routes.xml", "xml", ROUTES_XML);
        indexer.remove_file(&path).unwrap();
        assert!(indexer.all_names().is_empty());
    }
}
