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

//! Extension-keyed pool of tree-sitter parsers.
//!
//! A `tree_sitter::Parser` holds mutable state and must never be used from
//! two threads at once, so the pool hands out parser instances with a
//! take/return discipline: a caller takes an idle parser for the extension
//! (or a fresh one if none is idle), parses, and puts it back. The scanner's
//! worker threads therefore never contend on a shared parser.
//!
//! Twig templates are parsed with the HTML grammar and SCSS with the CSS
//! grammar; both grammars degrade the non-host constructs to text or error
//! nodes, which downstream consumers tolerate.

use std::collections::HashMap;

use parking_lot::Mutex;
use tree_sitter::{Language, Parser, Tree};

use crate::error::{Error, Result};

/// Extensions (lowercase, no dot) the pool can parse.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["php", "xml", "twig", "yaml", "yml", "json", "scss"];

/// Maps a lowercase file extension to a grammar-bound parser.
pub struct ParserPool {
    languages: HashMap<&'static str, Language>,
    idle: Mutex<HashMap<&'static str, Vec<Parser>>>,
}

impl ParserPool {
    /// Create the pool and validate every grammar against the linked
    /// tree-sitter runtime. A rejected grammar is fatal at startup.
    pub fn new() -> Result<Self> {
        let mut languages: HashMap<&'static str, Language> = HashMap::new();
        languages.insert("php", Language::from(tree_sitter_php::LANGUAGE_PHP));
        languages.insert("xml", Language::from(tree_sitter_xml::LANGUAGE_XML));
        languages.insert("twig", Language::from(tree_sitter_html::LANGUAGE));
        languages.insert("yaml", Language::from(tree_sitter_yaml::LANGUAGE));
        languages.insert("yml", Language::from(tree_sitter_yaml::LANGUAGE));
        languages.insert("json", Language::from(tree_sitter_json::LANGUAGE));
        languages.insert("scss", Language::from(tree_sitter_css::LANGUAGE));

        for (ext, language) in &languages {
            let mut probe = Parser::new();
            probe
                .set_language(language)
                .map_err(|e| Error::Grammar(format!("grammar for .{ext} rejected: {e}")))?;
        }

        Ok(Self {
            languages,
            idle: Mutex::new(HashMap::new()),
        })
    }

    /// Whether the extension has a registered grammar.
    pub fn supports(&self, extension: &str) -> bool {
        self.languages
            .contains_key(extension.to_ascii_lowercase().as_str())
    }

    /// Parse `bytes` as the given extension. Returns `None` when the
    /// extension has no grammar or the parser produced no tree.
    ///
    /// The returned tree may contain error nodes; callers must tolerate
    /// them.
    pub fn parse(&self, extension: &str, bytes: &[u8]) -> Option<Tree> {
        let ext = extension.to_ascii_lowercase();
        let (key, language) = self.languages.get_key_value(ext.as_str())?;
        let mut parser = self.take(key, language);
        let tree = parser.parse(bytes, None);
        self.give_back(key, parser);
        tree
    }

    fn take(&self, key: &'static str, language: &Language) -> Parser {
        if let Some(parser) = self.idle.lock().get_mut(key).and_then(Vec::pop) {
            return parser;
        }
        let mut parser = Parser::new();
        parser
            .set_language(language)
            .expect("grammar validated at pool construction");
        parser
    }

    fn give_back(&self, key: &'static str, parser: Parser) {
        self.idle.lock().entry(key).or_default().push(parser);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_supported_extensions_have_grammars() {
        let pool = ParserPool::new().unwrap();
        for ext in SUPPORTED_EXTENSIONS {
            assert!(pool.supports(ext), "missing grammar for .{ext}");
        }
    }

    #[test]
    fn extension_matching_is_case_insensitive() {
        let pool = ParserPool::new().unwrap();
        assert!(pool.supports("XML"));
        assert!(pool.parse("JSON", b"{}").is_some());
    }

    #[test]
    fn unknown_extension_yields_no_tree() {
        let pool = ParserPool::new().unwrap();
        assert!(!pool.supports("md"));
        assert!(pool.parse("md", b"# nope").is_none());
    }

    #[test]
    fn php_parses_to_a_program() {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse("php", b"<?php class Foo {}").unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[test]
    fn json_parses_to_a_document() {
        let pool = ParserPool::new().unwrap();
        let source = br#"{"swag.example": "value"}"#;
        let tree = pool.parse("json", source).unwrap();
        assert_eq!(tree.root_node().kind(), "document");
        assert_eq!(tree.root_node().end_byte(), source.len());
    }

    #[test]
    fn malformed_input_still_produces_a_root() {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse("xml", b"<container><service id=").unwrap();
        assert!(tree.root_node().has_error());
    }

    #[test]
    fn parsers_are_reused_after_return() {
        let pool = ParserPool::new().unwrap();
        assert!(pool.parse("yaml", b"services: {}").is_some());
        assert!(pool.parse("yaml", b"parameters: {}").is_some());
        assert_eq!(pool.idle.lock().get("yaml").map(Vec::len), Some(1));
    }
}
