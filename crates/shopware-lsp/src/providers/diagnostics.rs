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

//! Diagnostics providers. They run against live buffers so unsaved edits
//! are checked, and cross-reference the workspace indexes.

use std::sync::Arc;

use serde_json::json;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

use shopware_lsp_core::Document;

use crate::indexers::template::extract_facts;
use crate::indexers::{service, PhpClassIndexer, SnippetIndexer};
use crate::providers::DiagnosticsProvider;

pub const MISSING_SNIPPET_CODE: &str = "snippet.missing";
pub const MISSING_CLASS_CODE: &str = "service.class-missing";

const SOURCE: &str = "shopware-lsp";

/// `'key'|trans` usages whose key exists in no snippet file.
pub struct SnippetUsageDiagnostics {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetUsageDiagnostics {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        Self { snippets }
    }
}

impl DiagnosticsProvider for SnippetUsageDiagnostics {
    fn diagnostics(&self, document: &Document) -> Vec<Diagnostic> {
        let path = document.path();
        if crate::indexers::extension_of(&path).as_deref() != Some("twig") {
            return Vec::new();
        }
        extract_facts(document.text(), &path)
            .snippet_usages
            .into_iter()
            .filter(|usage| !self.snippets.has_key(&usage.key))
            .map(|usage| Diagnostic {
                range: usage.span.range(),
                severity: Some(DiagnosticSeverity::WARNING),
                code: Some(NumberOrString::String(MISSING_SNIPPET_CODE.to_string())),
                source: Some(SOURCE.to_string()),
                message: format!("Unknown snippet key '{}'", usage.key),
                data: Some(json!({ "key": usage.key })),
                ..Diagnostic::default()
            })
            .collect()
    }
}

/// `<service class="…">` values that resolve to no indexed PHP class.
pub struct ServiceClassDiagnostics {
    php: Arc<PhpClassIndexer>,
}

impl ServiceClassDiagnostics {
    pub fn new(php: Arc<PhpClassIndexer>) -> Self {
        Self { php }
    }
}

impl DiagnosticsProvider for ServiceClassDiagnostics {
    fn diagnostics(&self, document: &Document) -> Vec<Diagnostic> {
        let path = document.path();
        if crate::indexers::extension_of(&path).as_deref() != Some("xml") {
            return Vec::new();
        }
        // Before the first scan finishes the class index is empty; stay
        // quiet instead of flagging every service.
        if self.php.is_empty() {
            return Vec::new();
        }
        let Some(tree) = document.tree() else {
            return Vec::new();
        };

        let (definitions, _) = service::extract_xml(tree, document.text(), &path);
        definitions
            .into_iter()
            .filter_map(|definition| {
                let class = definition.class?;
                if self.php.class(&class).is_some() {
                    return None;
                }
                Some(Diagnostic {
                    range: definition.span.range(),
                    severity: Some(DiagnosticSeverity::WARNING),
                    code: Some(NumberOrString::String(MISSING_CLASS_CODE.to_string())),
                    source: Some(SOURCE.to_string()),
                    message: format!("Class '{class}' not found in the workspace"),
                    ..Diagnostic::default()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::{DocumentManager, Indexer as _, ParserPool};

    fn documents() -> DocumentManager {
        DocumentManager::new(Arc::new(ParserPool::new().unwrap()))
    }

    #[test]
    fn unknown_snippet_keys_are_flagged_known_ones_are_not() {
        let snippets = Arc::new(SnippetIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let json = r#"{"known": "ok"}"#;
        let tree = pool.parse("json", json.as_bytes()).unwrap();
        snippets
            .index_file(
                std::path::Path::new("/ws/snippet/de-DE.json"),
                &tree,
                json.as_bytes(),
            )
            .unwrap();

        let provider = SnippetUsageDiagnostics::new(snippets);
        let documents = documents();
        documents.open(
            "file:///ws/page.twig",
            "{{ 'known'|trans }}\n{{ 'missing.key'|trans }}",
            1,
        );
        let document = documents.get("file:///ws/page.twig").unwrap();

        let diagnostics = provider.diagnostics(&document);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 1);
        assert!(diagnostics[0].message.contains("missing.key"));
        assert_eq!(
            diagnostics[0].code,
            Some(NumberOrString::String(MISSING_SNIPPET_CODE.into()))
        );
    }

    #[test]
    fn service_classes_missing_from_the_index_are_flagged() {
        let php = Arc::new(PhpClassIndexer::new(None));
        let pool = ParserPool::new().unwrap();
        let source = "<?php namespace Swag; class Known {}";
        let tree = pool.parse("php", source.as_bytes()).unwrap();
        php.index_file(
            std::path::Path::new("/ws/src/Known.php"),
            &tree,
            source.as_bytes(),
        )
        .unwrap();

        let provider = ServiceClassDiagnostics::new(php);
        let documents = documents();
        let xml = r#"<container>
  <service id="a" class="Swag\Known"/>
  <service id="b" class="Swag\Unknown"/>
</container>"#;
        documents.open("file:///ws/services.xml", xml, 1);
        let document = documents.get("file:///ws/services.xml").unwrap();

        let diagnostics = provider.diagnostics(&document);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Swag\\Unknown"));
        assert_eq!(diagnostics[0].range.start.line, 2);
    }

    #[test]
    fn empty_class_index_stays_quiet() {
        let provider = ServiceClassDiagnostics::new(Arc::new(PhpClassIndexer::new(None)));
        let documents = documents();
        documents.open(
            "file:///ws/services.xml",
            r#"<container><service id="a" class="Swag\X"/></container>"#,
            1,
        );
        let document = documents.get("file:///ws/services.xml").unwrap();
        assert!(provider.diagnostics(&document).is_empty());
    }
}
