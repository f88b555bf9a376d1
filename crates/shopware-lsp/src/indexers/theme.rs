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

//! Theme configuration: `theme.json` config fields and SCSS variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use shopware_lsp_core::{Indexer, Result};

use crate::indexers::{load_store, save_store, LineIndex, SourceSpan};

const STORE_FILE: &str = "theme.json";
const SCHEMA: u32 = 1;

/// A field under `config.fields` in a `theme.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeField {
    pub name: String,
    pub span: SourceSpan,
}

/// A `$variable:` definition in an SCSS file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScssVariable {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Default, Serialize, Deserialize)]
struct ThemeState {
    fields: HashMap<PathBuf, Vec<ThemeField>>,
    variables: HashMap<PathBuf, Vec<ScssVariable>>,
}

/// Indexer for theme configuration surfaces.
pub struct ThemeConfigIndexer {
    state: RwLock<ThemeState>,
    dir: Option<PathBuf>,
}

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_-]*)\s*:").expect("static pattern"))
}

impl ThemeConfigIndexer {
    pub fn new(cache_dir: Option<&Path>) -> Self {
        let dir = cache_dir.map(|dir| dir.join("theme"));
        Self {
            state: RwLock::new(load_store(dir.as_deref(), STORE_FILE, SCHEMA)),
            dir,
        }
    }

    pub fn field(&self, name: &str) -> Option<ThemeField> {
        self.state
            .read()
            .fields
            .values()
            .flatten()
            .find(|field| field.name == name)
            .cloned()
    }

    pub fn all_fields(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state
            .fields
            .values()
            .flatten()
            .map(|field| field.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Definition sites of an SCSS variable.
    pub fn variable(&self, name: &str) -> Vec<SourceSpan> {
        self.state
            .read()
            .variables
            .values()
            .flatten()
            .filter(|variable| variable.name == name)
            .map(|variable| variable.span.clone())
            .collect()
    }

    pub fn all_variables(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state
            .variables
            .values()
            .flatten()
            .map(|variable| variable.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Indexer for ThemeConfigIndexer {
    fn id(&self) -> &'static str {
        "theme-config"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json", "scss"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, source: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(source);
        let mut state = self.state.write();
        match crate::indexers::extension_of(path).as_deref() {
            Some("scss") => {
                let variables = extract_variables(&text, path);
                if variables.is_empty() {
                    state.variables.remove(path);
                } else {
                    state.variables.insert(path.to_path_buf(), variables);
                }
            }
            _ => {
                let fields = if path.file_name().and_then(|n| n.to_str()) == Some("theme.json") {
                    extract_fields(tree, &text, path)
                } else {
                    Vec::new()
                };
                if fields.is_empty() {
                    state.fields.remove(path);
                } else {
                    state.fields.insert(path.to_path_buf(), fields);
                }
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.write();
        state.fields.remove(path);
        state.variables.remove(path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        save_store(self.dir.as_deref(), STORE_FILE, SCHEMA, &*self.state.read())
    }
}

fn extract_variables(source: &str, path: &Path) -> Vec<ScssVariable> {
    let lines = LineIndex::new(source);
    variable_re()
        .captures_iter(source)
        .filter_map(|captures| captures.get(1))
        .map(|group| ScssVariable {
            name: group.as_str().to_string(),
            span: lines.span(source, path, group.start(), group.end()),
        })
        .collect()
}

/// Keys of the `config.fields` object in a `theme.json`.
fn extract_fields(tree: &Tree, source: &str, path: &Path) -> Vec<ThemeField> {
    let bytes = source.as_bytes();
    let lines = LineIndex::new(source);
    let mut fields = Vec::new();

    let Some(root) = (0..tree.root_node().named_child_count())
        .filter_map(|i| tree.root_node().named_child(i))
        .find(|node| node.kind() == "object")
    else {
        return fields;
    };
    let Some(config) = object_member(root, bytes, "config") else {
        return fields;
    };
    let Some(field_map) = object_member(config, bytes, "fields") else {
        return fields;
    };

    for i in 0..field_map.named_child_count() {
        let Some(pair) = field_map.named_child(i) else {
            continue;
        };
        if pair.kind() != "pair" {
            continue;
        }
        let Some(key) = pair
            .child_by_field_name("key")
            .and_then(|key| string_content(key))
        else {
            continue;
        };
        fields.push(ThemeField {
            name: key.utf8_text(bytes).unwrap_or_default().to_string(),
            span: lines.span(source, path, key.start_byte(), key.end_byte()),
        });
    }
    fields
}

/// Value object of a `"name": {...}` member.
fn object_member<'t>(object: Node<'t>, source: &[u8], name: &str) -> Option<Node<'t>> {
    for i in 0..object.named_child_count() {
        let pair = object.named_child(i)?;
        if pair.kind() != "pair" {
            continue;
        }
        let key = pair.child_by_field_name("key").and_then(string_content)?;
        if key.utf8_text(source).ok() == Some(name) {
            let value = pair.child_by_field_name("value")?;
            return (value.kind() == "object").then_some(value);
        }
    }
    None
}

fn string_content(string: Node<'_>) -> Option<Node<'_>> {
    (0..string.named_child_count())
        .filter_map(|i| string.named_child(i))
        .find(|node| node.kind() == "string_content")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::ParserPool;

    const THEME: &str = r#"{
  "name": "SwagTheme",
  "config": {
    "fields": {
      "sw-color-brand-primary": { "type": "color" },
      "sw-logo-desktop": { "type": "media" }
    }
  }
}"#;

    fn index_str(indexer: &ThemeConfigIndexer, name: &str, ext: &str, source: &str) -> PathBuf {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse(ext, source.as_bytes()).unwrap();
        let path = PathBuf::from(format!("/ws/{name}"));
        indexer.index_file(&path, &tree, source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn theme_fields_are_extracted_from_config() {
        let indexer = ThemeConfigIndexer::new(None);
        index_str(&indexer, "theme.json", "json", THEME);

        assert_eq!(
            indexer.all_fields(),
            vec![
                "sw-color-brand-primary".to_string(),
                "sw-logo-desktop".to_string()
            ]
        );
        assert_eq!(indexer.field("sw-color-brand-primary").unwrap().span.line, 4);
        assert!(indexer.field("name").is_none());
    }

    #[test]
    fn other_json_files_contribute_no_fields() {
        let indexer = ThemeConfigIndexer::new(None);
        index_str(&indexer, "composer.json", "json", THEME);
        assert!(indexer.all_fields().is_empty());
    }

    #[test]
    fn scss_variables_are_extracted() {
        let indexer = ThemeConfigIndexer::new(None);
        let scss = "$sw-color-brand-primary: #008490;\n.btn {\n  $local-padding: 4px;\n}\n";
        index_str(&indexer, "base.scss", "scss", scss);

        assert_eq!(
            indexer.all_variables(),
            vec![
                "local-padding".to_string(),
                "sw-color-brand-primary".to_string()
            ]
        );
        let spans = indexer.variable("sw-color-brand-primary");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].line, 0);
        assert_eq!(spans[0].start_char, 1);
    }

    #[test]
    fn remove_clears_both_fact_kinds() {
        let indexer = ThemeConfigIndexer::new(None);
        let json = index_str(&indexer, "theme.json", "json", THEME);
        let scss = index_str(&indexer, "base.scss", "scss", "$x: 1;");

        indexer.remove_file(&json).unwrap();
        indexer.remove_file(&scss).unwrap();
        assert!(indexer.all_fields().is_empty());
        assert!(indexer.all_variables().is_empty());
    }
}
