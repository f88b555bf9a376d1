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

//! Snippet keys from translation JSON files.
//!
//! A snippet file is a JSON file whose stem is a locale (`de-DE.json`,
//! `en.json`) or that lives under a `snippet` directory. Nested objects
//! flatten to dotted keys (`account.login.title`), each with the position
//! of its innermost key for navigation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use shopware_lsp_core::{Error, Indexer, Result};

use crate::indexers::{load_store, save_store, LineIndex, SourceSpan};

const STORE_FILE: &str = "snippets.json";
const SCHEMA: u32 = 1;

/// One flattened snippet key in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetEntry {
    pub key: String,
    pub value: Option<String>,
    pub span: SourceSpan,
}

#[derive(Default, Serialize, Deserialize)]
struct SnippetState {
    entries: HashMap<PathBuf, Vec<SnippetEntry>>,
}

/// Indexer for snippet translation files.
pub struct SnippetIndexer {
    state: RwLock<SnippetState>,
    dir: Option<PathBuf>,
}

fn locale_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}([-_][A-Za-z]{2})?$").expect("static pattern"))
}

/// Whether the path looks like a snippet translation file.
pub fn is_snippet_file(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return false;
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if locale_re().is_match(stem) {
        return true;
    }
    path.components()
        .any(|component| component.as_os_str() == "snippet")
}

impl SnippetIndexer {
    pub fn new(cache_dir: Option<&Path>) -> Self {
        let dir = cache_dir.map(|dir| dir.join("snippets"));
        Self {
            state: RwLock::new(load_store(dir.as_deref(), STORE_FILE, SCHEMA)),
            dir,
        }
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.state
            .read()
            .entries
            .values()
            .flatten()
            .any(|entry| entry.key == key)
    }

    /// Every definition site of a key, across locales.
    pub fn locations(&self, key: &str) -> Vec<SourceSpan> {
        self.state
            .read()
            .entries
            .values()
            .flatten()
            .filter(|entry| entry.key == key)
            .map(|entry| entry.span.clone())
            .collect()
    }

    /// `(locale, translation)` pairs for a key, derived from the file stem.
    pub fn translations(&self, key: &str) -> Vec<(String, String)> {
        let state = self.state.read();
        let mut out = Vec::new();
        for (path, entries) in &state.entries {
            let locale = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
                .to_string();
            for entry in entries {
                if entry.key == key {
                    if let Some(value) = &entry.value {
                        out.push((locale.clone(), value.clone()));
                    }
                }
            }
        }
        out.sort();
        out
    }

    /// All known keys, sorted and deduplicated.
    pub fn all_keys(&self) -> Vec<String> {
        let state = self.state.read();
        let mut keys: Vec<String> = state
            .entries
            .values()
            .flatten()
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Insert `key` (with an empty translation) into every indexed snippet
    /// file that lacks it. Returns the touched files; the watcher picks the
    /// writes up and reindexes them.
    pub fn create_key(&self, key: &str) -> Result<Vec<PathBuf>> {
        if key.is_empty() {
            return Err(Error::Storage("snippet key must not be empty".into()));
        }
        let files: Vec<PathBuf> = self.state.read().entries.keys().cloned().collect();
        let mut touched = Vec::new();
        for path in files {
            if self
                .state
                .read()
                .entries
                .get(&path)
                .is_some_and(|entries| entries.iter().any(|entry| entry.key == key))
            {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            let mut root: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| Error::Storage(format!("{}: {e}", path.display())))?;
            let mut node = &mut root;
            for part in key.split('.') {
                let object = node
                    .as_object_mut()
                    .ok_or_else(|| Error::Storage(format!("{}: not an object", path.display())))?;
                node = object
                    .entry(part.to_string())
                    .or_insert_with(|| serde_json::Value::Object(Default::default()));
            }
            if node.is_object() && node.as_object().is_some_and(|o| o.is_empty()) {
                *node = serde_json::Value::String(String::new());
            }
            let json = serde_json::to_string_pretty(&root)
                .map_err(|e| Error::Storage(e.to_string()))?;
            fs::write(&path, json)?;
            touched.push(path);
        }
        Ok(touched)
    }
}

impl Indexer for SnippetIndexer {
    fn id(&self) -> &'static str {
        "snippet"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, source: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        if !is_snippet_file(path) {
            state.entries.remove(path);
            return Ok(());
        }
        let text = String::from_utf8_lossy(source);
        let entries = flatten_keys(tree, &text, path);
        if entries.is_empty() {
            state.entries.remove(path);
        } else {
            state.entries.insert(path.to_path_buf(), entries);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.state.write().entries.remove(path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        save_store(self.dir.as_deref(), STORE_FILE, SCHEMA, &*self.state.read())
    }
}

fn flatten_keys(tree: &Tree, source: &str, path: &Path) -> Vec<SnippetEntry> {
    let bytes = source.as_bytes();
    let lines = LineIndex::new(source);
    let mut entries = Vec::new();

    // document -> value
    let Some(root_object) = (0..tree.root_node().named_child_count())
        .filter_map(|i| tree.root_node().named_child(i))
        .find(|node| node.kind() == "object")
    else {
        return entries;
    };

    let mut prefix = Vec::new();
    flatten_object(root_object, bytes, source, path, &lines, &mut prefix, &mut entries);
    entries
}

fn flatten_object(
    object: Node<'_>,
    bytes: &[u8],
    source: &str,
    path: &Path,
    lines: &LineIndex,
    prefix: &mut Vec<String>,
    entries: &mut Vec<SnippetEntry>,
) {
    for i in 0..object.named_child_count() {
        let Some(pair) = object.named_child(i) else {
            continue;
        };
        if pair.kind() != "pair" {
            continue;
        }
        let Some(key_node) = pair.child_by_field_name("key") else {
            continue;
        };
        let Some(content) = string_content(key_node) else {
            continue;
        };
        let key_text = content.utf8_text(bytes).unwrap_or_default().to_string();

        prefix.push(key_text);
        let value = pair.child_by_field_name("value");
        match value.map(|v| (v, v.kind())) {
            Some((nested, "object")) => {
                flatten_object(nested, bytes, source, path, lines, prefix, entries);
            }
            other => {
                let value_text = other.and_then(|(v, kind)| {
                    (kind == "string")
                        .then(|| string_content(v))
                        .flatten()
                        .and_then(|content| content.utf8_text(bytes).ok())
                        .map(str::to_string)
                });
                entries.push(SnippetEntry {
                    key: prefix.join("."),
                    value: value_text,
                    span: lines.span(source, path, content.start_byte(), content.end_byte()),
                });
            }
        }
        prefix.pop();
    }
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

    const DE: &str = r#"{
  "account": {
    "login": {
      "title": "Anmeldung",
      "submit": "Einloggen"
    }
  },
  "footer": { "copyright": "© Swag" }
}"#;

    fn index_str(indexer: &SnippetIndexer, name: &str, source: &str) -> PathBuf {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse("json", source.as_bytes()).unwrap();
        let path = PathBuf::from(format!("/ws/Resources/snippet/{name}"));
        indexer.index_file(&path, &tree, source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn snippet_file_detection() {
        assert!(is_snippet_file(Path::new("/ws/snippet/de-DE.json")));
        assert!(is_snippet_file(Path::new("/ws/translations/en.json")));
        assert!(is_snippet_file(Path::new("/ws/Resources/snippet/storefront.json")));
        assert!(!is_snippet_file(Path::new("/ws/composer.json")));
        assert!(!is_snippet_file(Path::new("/ws/snippet/de-DE.xml")));
    }

    #[test]
    fn nested_keys_flatten_with_positions_and_values() {
        let indexer = SnippetIndexer::new(None);
        index_str(&indexer, "de-DE.json", DE);

        assert!(indexer.has_key("account.login.title"));
        assert!(indexer.has_key("footer.copyright"));
        assert!(!indexer.has_key("account.login"));

        let locations = indexer.locations("account.login.submit");
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].line, 4);

        assert_eq!(
            indexer.translations("account.login.title"),
            vec![("de-DE".to_string(), "Anmeldung".to_string())]
        );
    }

    #[test]
    fn multiple_locales_aggregate_per_key() {
        let indexer = SnippetIndexer::new(None);
        index_str(&indexer, "de-DE.json", r#"{"greeting": "Hallo"}"#);
        index_str(&indexer, "en-GB.json", r#"{"greeting": "Hello"}"#);

        assert_eq!(indexer.locations("greeting").len(), 2);
        assert_eq!(
            indexer.translations("greeting"),
            vec![
                ("de-DE".to_string(), "Hallo".to_string()),
                ("en-GB".to_string(), "Hello".to_string()),
            ]
        );
    }

    #[test]
    fn non_snippet_json_is_ignored() {
        let indexer = SnippetIndexer::new(None);
        let pool = ParserPool::new().unwrap();
        let source = r#"{"name": "swag/demo"}"#;
        let tree = pool.parse("json", source.as_bytes()).unwrap();
        indexer
            .index_file(Path::new("/ws/composer.json"), &tree, source.as_bytes())
            .unwrap();
        assert!(indexer.all_keys().is_empty());
    }

    #[test]
    fn reindex_replaces_and_remove_clears() {
        let indexer = SnippetIndexer::new(None);
        let path = index_str(&indexer, "de-DE.json", DE);
        assert_eq!(indexer.all_keys().len(), 3);

        index_str(&indexer, "de-DE.json", r#"{"only": "eins"}"#);
        assert_eq!(indexer.all_keys(), vec!["only".to_string()]);

        indexer.remove_file(&path).unwrap();
        assert!(indexer.all_keys().is_empty());
    }

    #[test]
    fn create_key_writes_missing_keys_into_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("de-DE.json");
        fs::write(&file, r#"{"existing": "da"}"#).unwrap();

        let indexer = SnippetIndexer::new(None);
        let pool = ParserPool::new().unwrap();
        let source = fs::read_to_string(&file).unwrap();
        let tree = pool.parse("json", source.as_bytes()).unwrap();
        indexer.index_file(&file, &tree, source.as_bytes()).unwrap();

        let touched = indexer.create_key("account.login.title").unwrap();
        assert_eq!(touched, vec![file.clone()]);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(written["account"]["login"]["title"], "");
        assert_eq!(written["existing"], "da");
    }
}
