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

//! Completion providers.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind};

use crate::indexers::{ServiceIndexer, SnippetIndexer, TemplateIndexer, ThemeConfigIndexer};
use crate::providers::{CompletionProvider, RequestContext};
use crate::xml;

/// Service ids inside `<argument id="…">` and `parent="…"` values.
pub struct ServiceIdCompletion {
    services: Arc<ServiceIndexer>,
}

impl ServiceIdCompletion {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        Self { services }
    }
}

impl CompletionProvider for ServiceIdCompletion {
    fn trigger_characters(&self) -> &'static [&'static str] {
        &["\""]
    }

    fn complete(&self, ctx: &RequestContext) -> Vec<CompletionItem> {
        if ctx.extension().as_deref() != Some("xml") {
            return Vec::new();
        }
        let Some(cursor) = &ctx.node else {
            return Vec::new();
        };
        let source = cursor.source().as_bytes();
        let Some((element, attribute)) = xml::attribute_context(cursor.node(), source) else {
            return Vec::new();
        };
        let wants_service_id =
            (element == "argument" && attribute == "id") || attribute == "parent";
        if !wants_service_id {
            return Vec::new();
        }

        self.services
            .all_ids()
            .into_iter()
            .map(|id| {
                let detail = self
                    .services
                    .definition(&id)
                    .and_then(|definition| definition.class);
                CompletionItem {
                    label: id,
                    kind: Some(CompletionItemKind::VALUE),
                    detail,
                    ..CompletionItem::default()
                }
            })
            .collect()
    }
}

fn quote_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"['"]([A-Za-z0-9_.-]*)$"#).expect("static pattern"))
}

/// Snippet keys inside Twig strings, filtered by the typed prefix.
pub struct SnippetKeyCompletion {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetKeyCompletion {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        Self { snippets }
    }
}

impl CompletionProvider for SnippetKeyCompletion {
    fn trigger_characters(&self) -> &'static [&'static str] {
        &["'", "\""]
    }

    fn complete(&self, ctx: &RequestContext) -> Vec<CompletionItem> {
        if ctx.extension().as_deref() != Some("twig") {
            return Vec::new();
        }
        let Some(prefix) = ctx.line_prefix() else {
            return Vec::new();
        };
        let Some(captures) = quote_prefix_re().captures(&prefix) else {
            return Vec::new();
        };
        let typed = captures.get(1).map_or("", |group| group.as_str());

        self.snippets
            .all_keys()
            .into_iter()
            .filter(|key| key.starts_with(typed))
            .map(|key| {
                let detail = self
                    .snippets
                    .translations(&key)
                    .into_iter()
                    .next()
                    .map(|(locale, value)| format!("{locale}: {value}"));
                CompletionItem {
                    label: key,
                    kind: Some(CompletionItemKind::VALUE),
                    detail,
                    ..CompletionItem::default()
                }
            })
            .collect()
    }
}

fn block_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{%-?\s*block\s+[A-Za-z0-9_]*$").expect("static pattern"))
}

/// Known block names after `{% block `, for overriding parent templates.
pub struct TwigBlockCompletion {
    templates: Arc<TemplateIndexer>,
}

impl TwigBlockCompletion {
    pub fn new(templates: Arc<TemplateIndexer>) -> Self {
        Self { templates }
    }
}

impl CompletionProvider for TwigBlockCompletion {
    fn complete(&self, ctx: &RequestContext) -> Vec<CompletionItem> {
        if ctx.extension().as_deref() != Some("twig") {
            return Vec::new();
        }
        let Some(prefix) = ctx.line_prefix() else {
            return Vec::new();
        };
        if !block_prefix_re().is_match(&prefix) {
            return Vec::new();
        }

        self.templates
            .all_block_names()
            .into_iter()
            .map(|name| CompletionItem {
                label: name,
                kind: Some(CompletionItemKind::FUNCTION),
                ..CompletionItem::default()
            })
            .collect()
    }
}

fn variable_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$[A-Za-z0-9_-]*$").expect("static pattern"))
}

/// Theme SCSS variables after `$`.
pub struct ThemeVariableCompletion {
    theme: Arc<ThemeConfigIndexer>,
}

impl ThemeVariableCompletion {
    pub fn new(theme: Arc<ThemeConfigIndexer>) -> Self {
        Self { theme }
    }
}

impl CompletionProvider for ThemeVariableCompletion {
    fn trigger_characters(&self) -> &'static [&'static str] {
        &["$"]
    }

    fn complete(&self, ctx: &RequestContext) -> Vec<CompletionItem> {
        if ctx.extension().as_deref() != Some("scss") {
            return Vec::new();
        }
        let Some(prefix) = ctx.line_prefix() else {
            return Vec::new();
        };
        if !variable_prefix_re().is_match(&prefix) {
            return Vec::new();
        }

        self.theme
            .all_variables()
            .into_iter()
            .map(|name| CompletionItem {
                label: format!("${name}"),
                insert_text: Some(name),
                kind: Some(CompletionItemKind::VARIABLE),
                ..CompletionItem::default()
            })
            .collect()
    }
}
