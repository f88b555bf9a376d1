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

//! PHP class index: fully-qualified names to declaration sites.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use shopware_lsp_core::{Indexer, Result};

use crate::indexers::{load_store, save_store, LineIndex, SourceSpan};
use crate::providers::{ContextEnricher, RequestContext};

const STORE_FILE: &str = "classes.json";
const SCHEMA: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhpClassKind {
    Class,
    Interface,
    Trait,
    Enum,
}

/// One class-like declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpClass {
    pub fqcn: String,
    pub name: String,
    pub namespace: Option<String>,
    pub kind: PhpClassKind,
    pub span: SourceSpan,
}

#[derive(Default, Serialize, Deserialize)]
struct PhpState {
    classes: HashMap<PathBuf, Vec<PhpClass>>,
}

/// Indexer for PHP class, interface, trait, and enum declarations.
pub struct PhpClassIndexer {
    state: RwLock<PhpState>,
    dir: Option<PathBuf>,
}

impl PhpClassIndexer {
    pub fn new(cache_dir: Option<&Path>) -> Self {
        let dir = cache_dir.map(|dir| dir.join("php"));
        Self {
            state: RwLock::new(load_store(dir.as_deref(), STORE_FILE, SCHEMA)),
            dir,
        }
    }

    /// Look up a class by its fully-qualified name (no leading backslash).
    pub fn class(&self, fqcn: &str) -> Option<PhpClass> {
        self.state
            .read()
            .classes
            .values()
            .flatten()
            .find(|class| class.fqcn == fqcn)
            .cloned()
    }

    /// All classes sharing a short name, across namespaces.
    pub fn by_short_name(&self, name: &str) -> Vec<PhpClass> {
        self.state
            .read()
            .classes
            .values()
            .flatten()
            .filter(|class| class.name == name)
            .cloned()
            .collect()
    }

    pub fn classes_in(&self, path: &Path) -> Vec<PhpClass> {
        self.state
            .read()
            .classes
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state.read().classes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Indexer for PhpClassIndexer {
    fn id(&self) -> &'static str {
        "php-class"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["php"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, source: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(source);
        let classes = extract_classes(tree, &text, path);
        let mut state = self.state.write();
        if classes.is_empty() {
            state.classes.remove(path);
        } else {
            state.classes.insert(path.to_path_buf(), classes);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.state.write().classes.remove(path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        save_store(self.dir.as_deref(), STORE_FILE, SCHEMA, &*self.state.read())
    }
}

/// Namespace declared in the file, if any. Shared with the route indexer
/// for controller attribution.
pub(crate) fn file_namespace(tree: &Tree, source: &[u8]) -> Option<String> {
    let mut namespace = None;
    visit(tree.root_node(), &mut |node| {
        if node.kind() == "namespace_definition" {
            if let Some(name) = node.child_by_field_name("name") {
                namespace = Some(name.utf8_text(source).unwrap_or_default().to_string());
            }
        }
    });
    namespace
}

fn extract_classes(tree: &Tree, source: &str, path: &Path) -> Vec<PhpClass> {
    let bytes = source.as_bytes();
    let lines = LineIndex::new(source);
    let mut namespace: Option<String> = None;
    let mut classes = Vec::new();

    visit(tree.root_node(), &mut |node| {
        let kind = match node.kind() {
            "namespace_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    namespace = Some(name.utf8_text(bytes).unwrap_or_default().to_string());
                }
                return;
            }
            "class_declaration" => PhpClassKind::Class,
            "interface_declaration" => PhpClassKind::Interface,
            "trait_declaration" => PhpClassKind::Trait,
            "enum_declaration" => PhpClassKind::Enum,
            _ => return,
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = name_node.utf8_text(bytes).unwrap_or_default().to_string();
        let fqcn = match &namespace {
            Some(ns) => format!("{ns}\\{name}"),
            None => name.clone(),
        };
        classes.push(PhpClass {
            fqcn,
            name,
            namespace: namespace.clone(),
            kind,
            span: lines.span(source, path, name_node.start_byte(), name_node.end_byte()),
        });
    });

    classes
}

pub(crate) fn visit(node: Node<'_>, f: &mut impl FnMut(Node<'_>)) {
    f(node);
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            visit(child, f);
        }
    }
}

/// Fills [`RequestContext::resolved_class`] from the symbol under the
/// cursor: quoted or bare FQCNs resolve exactly, bare short names resolve
/// to the first declaration found.
pub struct PhpClassEnricher {
    php: Arc<PhpClassIndexer>,
}

impl PhpClassEnricher {
    pub fn new(php: Arc<PhpClassIndexer>) -> Self {
        Self { php }
    }
}

impl ContextEnricher for PhpClassEnricher {
    fn enrich(&self, ctx: &mut RequestContext) {
        if ctx.resolved_class.is_some() {
            return;
        }
        let Some(cursor) = &ctx.node else {
            return;
        };
        let text = cursor
            .node_text()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim_start_matches('\\')
            .to_string();
        if text.is_empty() || text.len() > 256 {
            return;
        }
        // "App\Controller\DemoController::index" style references resolve
        // via their class part.
        let class_part = text.split("::").next().unwrap_or(&text);
        ctx.resolved_class = if class_part.contains('\\') {
            self.php.class(class_part)
        } else {
            self.php.by_short_name(class_part).into_iter().next()
        };
    }
}
