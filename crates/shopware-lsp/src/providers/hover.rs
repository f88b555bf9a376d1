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

//! Hover providers. Each produces a markdown section; the registry joins
//! them into one hover.

use std::sync::Arc;

use crate::indexers::{ServiceIndexer, SnippetIndexer};
use crate::providers::{HoverProvider, RequestContext};

/// Class, tags, and definition site for a service id.
pub struct ServiceHoverProvider {
    services: Arc<ServiceIndexer>,
}

impl ServiceHoverProvider {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        Self { services }
    }
}

impl HoverProvider for ServiceHoverProvider {
    fn hover(&self, ctx: &RequestContext) -> Option<String> {
        if !matches!(ctx.extension().as_deref(), Some("xml" | "yaml" | "yml")) {
            return None;
        }
        let id = ctx.quoted_at()?;
        let definition = self.services.definition(&id)?;

        let mut section = format!("**Service** `{id}`");
        if let Some(class) = &definition.class {
            section.push_str(&format!("\n\nClass: `{class}`"));
        }
        if !definition.tags.is_empty() {
            section.push_str(&format!("\n\nTags: {}", definition.tags.join(", ")));
        }
        section.push_str(&format!(
            "\n\nDefined in {}:{}",
            definition.span.path.display(),
            definition.span.line + 1
        ));
        Some(section)
    }
}

/// Translations per locale for a snippet key.
pub struct SnippetHoverProvider {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetHoverProvider {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        Self { snippets }
    }
}

impl HoverProvider for SnippetHoverProvider {
    fn hover(&self, ctx: &RequestContext) -> Option<String> {
        if ctx.extension().as_deref() != Some("twig") {
            return None;
        }
        let key = ctx.quoted_at()?;
        let translations = self.snippets.translations(&key);
        if translations.is_empty() {
            return None;
        }
        let mut section = format!("**Snippet** `{key}`");
        for (locale, value) in translations {
            section.push_str(&format!("\n- `{locale}`: {value}"));
        }
        Some(section)
    }
}

/// FQCN and declaration site for whatever resolved to a PHP class.
pub struct PhpClassHoverProvider;

impl HoverProvider for PhpClassHoverProvider {
    fn hover(&self, ctx: &RequestContext) -> Option<String> {
        let class = ctx.resolved_class.as_ref()?;
        Some(format!(
            "**{:?}** `{}`\n\nDeclared in {}:{}",
            class.kind,
            class.fqcn,
            class.span.path.display(),
            class.span.line + 1
        ))
    }
}
