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

//! Code-action providers.

use tower_lsp::lsp_types::{
    CodeActionKind, CodeActionOrCommand, Command, Diagnostic, NumberOrString, Range,
};

use crate::providers::diagnostics::MISSING_SNIPPET_CODE;
use crate::providers::{quick_fix, CodeActionProvider, RequestContext};

/// Quick fix for unknown snippet keys: create the key in every snippet
/// file via the `shopware/snippet.create` command.
pub struct MissingSnippetAction;

impl CodeActionProvider for MissingSnippetAction {
    fn kinds(&self) -> Vec<CodeActionKind> {
        vec![CodeActionKind::QUICKFIX]
    }

    fn actions(
        &self,
        _ctx: &RequestContext,
        _range: Range,
        diagnostics: &[Diagnostic],
    ) -> Vec<CodeActionOrCommand> {
        diagnostics
            .iter()
            .filter(|diagnostic| {
                diagnostic.code
                    == Some(NumberOrString::String(MISSING_SNIPPET_CODE.to_string()))
            })
            .filter_map(|diagnostic| {
                let key = diagnostic
                    .data
                    .as_ref()?
                    .get("key")?
                    .as_str()?
                    .to_string();
                Some(quick_fix(
                    format!("Create snippet '{key}'"),
                    diagnostic.clone(),
                    Command {
                        title: format!("Create snippet '{key}'"),
                        command: "shopware/snippet.create".to_string(),
                        arguments: Some(vec![serde_json::Value::String(key)]),
                    },
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shopware_lsp_core::{DocumentManager, ParserPool};
    use std::sync::Arc;
    use tower_lsp::lsp_types::{Position, Url};

    fn context() -> RequestContext {
        let documents = DocumentManager::new(Arc::new(ParserPool::new().unwrap()));
        RequestContext::new(
            &documents,
            Url::parse("file:///ws/page.twig").unwrap(),
            Position::new(0, 0),
        )
    }

    fn missing_snippet_diagnostic(key: &str) -> Diagnostic {
        Diagnostic {
            code: Some(NumberOrString::String(MISSING_SNIPPET_CODE.to_string())),
            data: Some(json!({ "key": key })),
            ..Diagnostic::default()
        }
    }

    #[test]
    fn missing_snippet_diagnostics_get_a_create_quick_fix() {
        let provider = MissingSnippetAction;
        let diagnostics = vec![
            missing_snippet_diagnostic("account.title"),
            Diagnostic::default(),
        ];

        let actions = provider.actions(&context(), Range::default(), &diagnostics);
        assert_eq!(actions.len(), 1);
        let CodeActionOrCommand::CodeAction(action) = &actions[0] else {
            panic!("expected a code action");
        };
        assert_eq!(action.title, "Create snippet 'account.title'");
        assert_eq!(action.kind, Some(CodeActionKind::QUICKFIX));
        let command = action.command.as_ref().unwrap();
        assert_eq!(command.command, "shopware/snippet.create");
        assert_eq!(
            command.arguments,
            Some(vec![serde_json::Value::String("account.title".into())])
        );
    }
}
