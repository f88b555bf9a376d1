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

//! Per-capability provider registries.
//!
//! Each LSP capability has an ordered list of providers. The dispatcher
//! resolves the node under the cursor once, lets the enrichers attach
//! language-specific context, then fans the request out in registration
//! order and concatenates the results. Providers are expected to answer
//! from indexer state without blocking; anything slow belongs in an
//! indexer.

pub mod code_action;
pub mod code_lens;
pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod hover;
pub mod references;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeLens, CompletionItem, Diagnostic, Hover,
    HoverContents, Location, MarkupContent, MarkupKind, Position, Range, Url,
};

use shopware_lsp_core::workspace::normalize_uri;
use shopware_lsp_core::{Document, DocumentManager, NodeCursor};

use crate::indexers::php::PhpClass;

/// Everything a provider may need to answer one request.
pub struct RequestContext {
    pub uri: Url,
    pub path: PathBuf,
    pub position: Position,
    pub document: Option<Arc<Document>>,
    pub node: Option<NodeCursor>,
    /// Filled by [`ContextEnricher`]s, e.g. the PHP class under the cursor.
    pub resolved_class: Option<PhpClass>,
}

impl RequestContext {
    pub fn new(documents: &DocumentManager, uri: Url, position: Position) -> Self {
        let path = uri
            .to_file_path()
            .unwrap_or_else(|_| normalize_uri(uri.as_str()));
        let document = documents.get(uri.as_str());
        let node = document
            .as_ref()
            .and_then(|doc| doc.node_at(position.line, position.character));
        Self {
            uri,
            path,
            position,
            document,
            node,
            resolved_class: None,
        }
    }

    /// Lowercase extension of the document's path.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Text of the cursor line up to the cursor.
    pub fn line_prefix(&self) -> Option<String> {
        let document = self.document.as_ref()?;
        let start = document.offset_at(self.position.line, 0);
        let end = document.offset_at(self.position.line, self.position.character);
        Some(document.text()[start..end].to_string())
    }

    /// The quote-delimited string around the cursor, if any, limited to the
    /// cursor line.
    pub fn quoted_at(&self) -> Option<String> {
        let document = self.document.as_ref()?;
        let text = document.text();
        let offset = document.offset_at(self.position.line, self.position.character);
        let line_start = document.offset_at(self.position.line, 0);
        let line_end = text[line_start..]
            .find('\n')
            .map_or(text.len(), |i| line_start + i);
        let line = &text[line_start..line_end];
        let cursor = offset - line_start;

        let open = line[..cursor].rfind(['\'', '"'])?;
        let quote = line.as_bytes()[open] as char;
        let close = line[cursor..].find(quote)? + cursor;
        (open + 1 <= close).then(|| line[open + 1..close].to_string())
    }
}

pub trait CompletionProvider: Send + Sync {
    /// Characters that should trigger this provider; merged and
    /// deduplicated during capability advertisement.
    fn trigger_characters(&self) -> &'static [&'static str] {
        &[]
    }

    fn complete(&self, ctx: &RequestContext) -> Vec<CompletionItem>;
}

pub trait DefinitionProvider: Send + Sync {
    fn definitions(&self, ctx: &RequestContext) -> Vec<Location>;
}

pub trait ReferenceProvider: Send + Sync {
    fn references(&self, ctx: &RequestContext) -> Vec<Location>;
}

pub trait HoverProvider: Send + Sync {
    /// Markdown content for the hover, if this provider has something to
    /// say.
    fn hover(&self, ctx: &RequestContext) -> Option<String>;
}

pub trait CodeLensProvider: Send + Sync {
    /// Discriminator stamped into `CodeLens.data.kind` so `resolve` can be
    /// routed back to the provider that produced the lens.
    fn lens_kind(&self) -> &'static str;

    fn lenses(&self, document: &Document) -> Vec<CodeLens>;

    fn resolve(&self, lens: CodeLens) -> CodeLens;
}

pub trait CodeActionProvider: Send + Sync {
    /// Action kinds this provider can produce; merged and deduplicated
    /// during capability advertisement.
    fn kinds(&self) -> Vec<CodeActionKind>;

    fn actions(
        &self,
        ctx: &RequestContext,
        range: Range,
        diagnostics: &[Diagnostic],
    ) -> Vec<CodeActionOrCommand>;
}

pub trait DiagnosticsProvider: Send + Sync {
    fn diagnostics(&self, document: &Document) -> Vec<Diagnostic>;
}

/// Handler for one `workspace/executeCommand` command.
pub trait CommandHandler: Send + Sync {
    fn command(&self) -> &'static str;

    /// Parameters pass through as opaque JSON.
    fn execute(&self, arguments: &[Value]) -> Option<Value>;
}

/// Hook that augments the request context before provider fan-out.
pub trait ContextEnricher: Send + Sync {
    fn enrich(&self, ctx: &mut RequestContext);
}

/// Ordered provider lists, one per capability.
#[derive(Default)]
pub struct ProviderRegistry {
    completion: Vec<Arc<dyn CompletionProvider>>,
    definition: Vec<Arc<dyn DefinitionProvider>>,
    references: Vec<Arc<dyn ReferenceProvider>>,
    hover: Vec<Arc<dyn HoverProvider>>,
    code_lens: Vec<Arc<dyn CodeLensProvider>>,
    code_action: Vec<Arc<dyn CodeActionProvider>>,
    diagnostics: Vec<Arc<dyn DiagnosticsProvider>>,
    commands: Vec<Arc<dyn CommandHandler>>,
    enrichers: Vec<Arc<dyn ContextEnricher>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_completion(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.completion.push(provider);
    }

    pub fn register_definition(&mut self, provider: Arc<dyn DefinitionProvider>) {
        self.definition.push(provider);
    }

    pub fn register_references(&mut self, provider: Arc<dyn ReferenceProvider>) {
        self.references.push(provider);
    }

    pub fn register_hover(&mut self, provider: Arc<dyn HoverProvider>) {
        self.hover.push(provider);
    }

    pub fn register_code_lens(&mut self, provider: Arc<dyn CodeLensProvider>) {
        self.code_lens.push(provider);
    }

    pub fn register_code_action(&mut self, provider: Arc<dyn CodeActionProvider>) {
        self.code_action.push(provider);
    }

    pub fn register_diagnostics(&mut self, provider: Arc<dyn DiagnosticsProvider>) {
        self.diagnostics.push(provider);
    }

    pub fn register_command(&mut self, handler: Arc<dyn CommandHandler>) {
        self.commands.push(handler);
    }

    pub fn register_enricher(&mut self, enricher: Arc<dyn ContextEnricher>) {
        self.enrichers.push(enricher);
    }

    /// Merged trigger characters, registration order, first occurrence
    /// wins.
    pub fn trigger_characters(&self) -> Vec<String> {
        let mut merged = Vec::new();
        for provider in &self.completion {
            for trigger in provider.trigger_characters() {
                if !merged.iter().any(|existing: &String| existing == trigger) {
                    merged.push((*trigger).to_string());
                }
            }
        }
        merged
    }

    /// Merged code-action kinds, deduplicated.
    pub fn code_action_kinds(&self) -> Vec<CodeActionKind> {
        let mut merged: Vec<CodeActionKind> = Vec::new();
        for provider in &self.code_action {
            for kind in provider.kinds() {
                if !merged.contains(&kind) {
                    merged.push(kind);
                }
            }
        }
        merged
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|handler| handler.command().to_string())
            .collect()
    }

    pub fn enrich(&self, ctx: &mut RequestContext) {
        for enricher in &self.enrichers {
            enricher.enrich(ctx);
        }
    }

    pub fn complete(&self, ctx: &RequestContext) -> Vec<CompletionItem> {
        self.completion
            .iter()
            .flat_map(|provider| provider.complete(ctx))
            .collect()
    }

    pub fn definitions(&self, ctx: &RequestContext) -> Vec<Location> {
        self.definition
            .iter()
            .flat_map(|provider| provider.definitions(ctx))
            .collect()
    }

    pub fn references(&self, ctx: &RequestContext) -> Vec<Location> {
        self.references
            .iter()
            .flat_map(|provider| provider.references(ctx))
            .collect()
    }

    /// Concatenated hover sections, rendered as one markdown hover.
    pub fn hover(&self, ctx: &RequestContext) -> Option<Hover> {
        let sections: Vec<String> = self
            .hover
            .iter()
            .filter_map(|provider| provider.hover(ctx))
            .collect();
        if sections.is_empty() {
            return None;
        }
        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: sections.join("\n\n---\n\n"),
            }),
            range: None,
        })
    }

    pub fn code_lenses(&self, document: &Document) -> Vec<CodeLens> {
        self.code_lens
            .iter()
            .flat_map(|provider| provider.lenses(document))
            .collect()
    }

    /// Route a lens back to its producer via the `kind` discriminator.
    pub fn resolve_code_lens(&self, lens: CodeLens) -> CodeLens {
        let kind = lens
            .data
            .as_ref()
            .and_then(|data| data.get("kind"))
            .and_then(Value::as_str)
            .map(str::to_string);
        match kind {
            Some(kind) => match self
                .code_lens
                .iter()
                .find(|provider| provider.lens_kind() == kind)
            {
                Some(provider) => provider.resolve(lens),
                None => lens,
            },
            None => lens,
        }
    }

    pub fn code_actions(
        &self,
        ctx: &RequestContext,
        range: Range,
        diagnostics: &[Diagnostic],
    ) -> Vec<CodeActionOrCommand> {
        self.code_action
            .iter()
            .flat_map(|provider| provider.actions(ctx, range, diagnostics))
            .collect()
    }

    pub fn diagnostics(&self, document: &Document) -> Vec<Diagnostic> {
        self.diagnostics
            .iter()
            .flat_map(|provider| provider.diagnostics(document))
            .collect()
    }

    /// Dispatch an executed command to its registered handler.
    pub fn execute(&self, command: &str, arguments: &[Value]) -> Option<Value> {
        self.commands
            .iter()
            .find(|handler| handler.command() == command)
            .and_then(|handler| handler.execute(arguments))
    }
}

/// Convenience for action providers wrapping a command into a quick fix.
pub(crate) fn quick_fix(
    title: String,
    diagnostic: Diagnostic,
    command: tower_lsp::lsp_types::Command,
) -> CodeActionOrCommand {
    CodeActionOrCommand::CodeAction(CodeAction {
        title,
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![diagnostic]),
        command: Some(command),
        ..CodeAction::default()
    })
}
