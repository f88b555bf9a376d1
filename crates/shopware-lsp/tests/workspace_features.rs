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

//! Feature flows against a scanned workspace: scan with the real indexer
//! registry, then answer requests through the provider registry.

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};
use tower_lsp::lsp_types::{Position, Range, Url};

use shopware_lsp::providers::RequestContext;
use shopware_lsp::Bootstrap;
use shopware_lsp_core::CancelFlag;

struct Workspace {
    root: TempDir,
    _cache: TempDir,
    bootstrap: Bootstrap,
}

impl Workspace {
    fn new() -> Self {
        let root = tempdir().unwrap();
        let cache = tempdir().unwrap();
        let bootstrap = Bootstrap::new(cache.path().to_path_buf()).unwrap();
        bootstrap.scanner.set_root(root.path().to_path_buf());
        Self {
            root,
            _cache: cache,
            bootstrap,
        }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn scan(&self) {
        self.bootstrap
            .scanner
            .index_all(&CancelFlag::new(), false)
            .unwrap();
    }

    /// Open a live buffer and build a request context at `position`.
    fn context(&self, path: &std::path::Path, text: &str, position: Position) -> RequestContext {
        let uri = Url::from_file_path(path).unwrap();
        self.bootstrap.documents.open(uri.as_str(), text, 1);
        let mut ctx = RequestContext::new(&self.bootstrap.documents, uri, position);
        self.bootstrap.providers.enrich(&mut ctx);
        ctx
    }

    fn seed_project(&self) {
        self.write(
            "src/Resources/config/services.xml",
            r#"<container>
  <service id="swag.demo.command" class="Swag\Demo\Command\DemoCommand">
    <argument type="service" id="swag.demo.repository"/>
  </service>
  <service id="swag.demo.repository" class="Swag\Demo\DemoRepository"/>
</container>"#,
        );
        self.write(
            "src/Command/DemoCommand.php",
            "<?php\n\nnamespace Swag\\Demo\\Command;\n\nclass DemoCommand\n{\n}\n",
        );
        self.write(
            "src/DemoRepository.php",
            "<?php\n\nnamespace Swag\\Demo;\n\nclass DemoRepository\n{\n}\n",
        );
        self.write(
            "src/Resources/snippet/de-DE.json",
            r#"{"demo": {"headline": "Überschrift"}}"#,
        );
        self.write(
            "src/Resources/views/storefront/page/demo.html.twig",
            "{% block demo_content %}{{ 'demo.headline'|trans }}{% endblock %}",
        );
    }
}

#[test]
fn scanned_services_complete_inside_argument_values() {
    let workspace = Workspace::new();
    workspace.seed_project();
    workspace.scan();

    let xml_path = workspace.root.path().join("src/Resources/config/other.xml");
    let text = r#"<container><argument type="service" id=""/></container>"#;
    let cursor = text.find("id=\"").unwrap() + 4;
    let ctx = workspace.context(&xml_path, text, Position::new(0, cursor as u32));

    let labels: Vec<String> = workspace
        .bootstrap
        .providers
        .complete(&ctx)
        .into_iter()
        .map(|item| item.label)
        .collect();
    assert_eq!(
        labels,
        vec!["swag.demo.command".to_string(), "swag.demo.repository".to_string()]
    );
}

#[test]
fn service_definition_jumps_to_xml_and_class() {
    let workspace = Workspace::new();
    workspace.seed_project();
    workspace.scan();

    let xml_path = workspace.root.path().join("src/Resources/config/other.xml");
    let text = r#"<container><argument type="service" id="swag.demo.repository"/></container>"#;
    let cursor = text.find("swag.demo.repository").unwrap() + 3;
    let ctx = workspace.context(&xml_path, text, Position::new(0, cursor as u32));

    let locations = workspace.bootstrap.providers.definitions(&ctx);
    assert_eq!(locations.len(), 2);
    assert!(locations[0].uri.path().ends_with("services.xml"));
    assert!(locations[1].uri.path().ends_with("DemoRepository.php"));
}

#[test]
fn snippet_definition_and_hover_resolve_from_twig() {
    let workspace = Workspace::new();
    workspace.seed_project();
    workspace.scan();

    let twig_path = workspace
        .root
        .path()
        .join("src/Resources/views/storefront/page/demo.html.twig");
    let text = "{{ 'demo.headline'|trans }}";
    let cursor = text.find("headline").unwrap() as u32;
    let ctx = workspace.context(&twig_path, text, Position::new(0, cursor));

    let locations = workspace.bootstrap.providers.definitions(&ctx);
    assert_eq!(locations.len(), 1);
    assert!(locations[0].uri.path().ends_with("de-DE.json"));

    let hover = workspace.bootstrap.providers.hover(&ctx).unwrap();
    let tower_lsp::lsp_types::HoverContents::Markup(markup) = hover.contents else {
        panic!("expected markdown hover");
    };
    assert!(markup.value.contains("Überschrift"));
}

#[test]
fn missing_snippet_key_yields_diagnostic_and_quick_fix() {
    let workspace = Workspace::new();
    workspace.seed_project();
    workspace.scan();

    let twig_path = workspace
        .root
        .path()
        .join("src/Resources/views/storefront/page/broken.html.twig");
    let text = "{{ 'demo.missing'|trans }}";
    let ctx = workspace.context(&twig_path, text, Position::new(0, 6));

    let document = workspace
        .bootstrap
        .documents
        .get(ctx.uri.as_str())
        .unwrap();
    let diagnostics = workspace.bootstrap.providers.diagnostics(&document);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("demo.missing"));

    let actions = workspace.bootstrap.providers.code_actions(
        &ctx,
        Range::default(),
        &diagnostics,
    );
    assert_eq!(actions.len(), 1);
}

#[test]
fn commands_list_scanned_state() {
    let workspace = Workspace::new();
    workspace.seed_project();
    workspace.scan();

    let services = workspace
        .bootstrap
        .providers
        .execute("shopware/service.list", &[])
        .unwrap();
    assert_eq!(
        services["services"],
        serde_json::json!(["swag.demo.command", "swag.demo.repository"])
    );

    let keys = workspace
        .bootstrap
        .providers
        .execute("shopware/snippet.list", &[])
        .unwrap();
    assert_eq!(keys["keys"], serde_json::json!(["demo.headline"]));

    assert!(workspace
        .bootstrap
        .providers
        .execute("shopware/unknown", &[])
        .is_none());
}

#[test]
fn block_references_resolve_across_scanned_templates() {
    let workspace = Workspace::new();
    workspace.seed_project();
    workspace.write(
        "custom/views/override/demo.html.twig",
        "{% block demo_content %}changed{% endblock %}",
    );
    workspace.scan();

    let twig_path = workspace
        .root
        .path()
        .join("src/Resources/views/storefront/page/demo.html.twig");
    let text = "{% block demo_content %}{{ 'demo.headline'|trans }}{% endblock %}";
    let ctx = workspace.context(&twig_path, text, Position::new(0, 12));

    let locations = workspace.bootstrap.providers.references(&ctx);
    assert_eq!(locations.len(), 2);
}
