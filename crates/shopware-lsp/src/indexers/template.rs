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

//! Twig template facts: blocks, inheritance edges, and snippet usage.
//!
//! Twig files are parsed with the HTML grammar for document-manager
//! purposes; the Twig constructs themselves are extracted lexically so the
//! facts do not depend on how the host grammar degrades `{% %}` regions.
//! A template's logical path is its path below the nearest `views`
//! directory, which is how `extends`/`include` targets name each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::Tree;

use shopware_lsp_core::{Indexer, Result};

use crate::indexers::{load_store, save_store, LineIndex, SourceSpan};

const STORE_FILE: &str = "templates.json";
const SCHEMA: u32 = 1;

/// `{% block name %}` definition site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub name: String,
    pub span: SourceSpan,
}

/// `extends`/`include` edge to another template's logical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateReference {
    pub target: String,
    pub span: SourceSpan,
}

/// `'key'|trans` usage site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetUsage {
    pub key: String,
    pub span: SourceSpan,
}

/// Everything known about one template file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFacts {
    pub logical_path: Option<String>,
    pub blocks: Vec<BlockDefinition>,
    pub extends: Vec<TemplateReference>,
    pub snippet_usages: Vec<SnippetUsage>,
}

#[derive(Default, Serialize, Deserialize)]
struct TemplateState {
    templates: HashMap<PathBuf, TemplateFacts>,
}

/// Indexer for Twig templates.
pub struct TemplateIndexer {
    state: RwLock<TemplateState>,
    dir: Option<PathBuf>,
}

fn block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{%-?\s*block\s+([A-Za-z_][A-Za-z0-9_]*)").expect("static pattern")
    })
}

fn extends_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{%-?\s*(?:sw_extends|sw_include|extends|include)\s+['"]([^'"]+)['"]"#)
            .expect("static pattern")
    })
}

fn trans_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"['"]([A-Za-z0-9_][A-Za-z0-9_.-]*)['"]\s*\|\s*trans"#).expect("static pattern")
    })
}

/// Logical template path: the part below the last `views` directory.
pub fn logical_path(path: &Path) -> Option<String> {
    let components: Vec<&str> = path
        .components()
        .filter_map(|component| component.as_os_str().to_str())
        .collect();
    let views = components.iter().rposition(|component| *component == "views")?;
    let rest = &components[views + 1..];
    (!rest.is_empty()).then(|| rest.join("/"))
}

/// Extract all facts from template text. Shared with the diagnostics
/// provider, which runs it over live buffers.
pub(crate) fn extract_facts(source: &str, path: &Path) -> TemplateFacts {
    let lines = LineIndex::new(source);
    let span = |start: usize, end: usize| lines.span(source, path, start, end);

    let blocks = block_re()
        .captures_iter(source)
        .filter_map(|captures| captures.get(1))
        .map(|group| BlockDefinition {
            name: group.as_str().to_string(),
            span: span(group.start(), group.end()),
        })
        .collect();

    let extends = extends_re()
        .captures_iter(source)
        .filter_map(|captures| captures.get(1))
        .map(|group| TemplateReference {
            target: group.as_str().to_string(),
            span: span(group.start(), group.end()),
        })
        .collect();

    let snippet_usages = trans_re()
        .captures_iter(source)
        .filter_map(|captures| captures.get(1))
        .map(|group| SnippetUsage {
            key: group.as_str().to_string(),
            span: span(group.start(), group.end()),
        })
        .collect();

    TemplateFacts {
        logical_path: logical_path(path),
        blocks,
        extends,
        snippet_usages,
    }
}

impl TemplateIndexer {
    pub fn new(cache_dir: Option<&Path>) -> Self {
        let dir = cache_dir.map(|dir| dir.join("templates"));
        Self {
            state: RwLock::new(load_store(dir.as_deref(), STORE_FILE, SCHEMA)),
            dir,
        }
    }

    /// Every definition site of a block name, across templates.
    pub fn blocks(&self, name: &str) -> Vec<SourceSpan> {
        self.state
            .read()
            .templates
            .values()
            .flat_map(|facts| &facts.blocks)
            .filter(|block| block.name == name)
            .map(|block| block.span.clone())
            .collect()
    }

    pub fn blocks_in(&self, path: &Path) -> Vec<BlockDefinition> {
        self.state
            .read()
            .templates
            .get(path)
            .map(|facts| facts.blocks.clone())
            .unwrap_or_default()
    }

    pub fn all_block_names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state
            .templates
            .values()
            .flat_map(|facts| &facts.blocks)
            .map(|block| block.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// File backing a logical template path.
    pub fn template_by_logical(&self, logical: &str) -> Option<PathBuf> {
        self.state
            .read()
            .templates
            .iter()
            .find(|(_, facts)| facts.logical_path.as_deref() == Some(logical))
            .map(|(path, _)| path.clone())
    }

    pub fn snippet_usages_in(&self, path: &Path) -> Vec<SnippetUsage> {
        self.state
            .read()
            .templates
            .get(path)
            .map(|facts| facts.snippet_usages.clone())
            .unwrap_or_default()
    }

    /// Templates whose `extends`/`include` targets the given logical path.
    pub fn referencing(&self, logical: &str) -> Vec<TemplateReference> {
        self.state
            .read()
            .templates
            .values()
            .flat_map(|facts| &facts.extends)
            .filter(|reference| reference.target == logical)
            .cloned()
            .collect()
    }
}

impl Indexer for TemplateIndexer {
    fn id(&self) -> &'static str {
        "template"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["twig"]
    }

    fn index_file(&self, path: &Path, _tree: &Tree, source: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(source);
        let facts = extract_facts(&text, path);
        self.state.write().templates.insert(path.to_path_buf(), facts);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.state.write().templates.remove(path);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        save_store(self.dir.as_deref(), STORE_FILE, SCHEMA, &*self.state.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopware_lsp_core::ParserPool;

    const TWIG: &str = r#"{% sw_extends '@Storefront/storefront/page/product-detail/index.html.twig' %}

{% block page_product_detail_content %}
    <h1>{{ 'detail.headline'|trans }}</h1>
    {% include 'storefront/component/buy-widget.html.twig' %}
{% endblock %}

{%- block page_product_detail_price %}
    {{ "detail.price.label" | trans }}
{% endblock %}
"#;

    fn index_str(indexer: &TemplateIndexer, name: &str, source: &str) -> PathBuf {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse("twig", source.as_bytes()).unwrap();
        let path = PathBuf::from(format!("/ws/Resources/views/storefront/page/{name}"));
        indexer.index_file(&path, &tree, source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn blocks_extends_and_trans_usages_are_extracted() {
        let indexer = TemplateIndexer::new(None);
        let path = index_str(&indexer, "index.html.twig", TWIG);

        let blocks = indexer.blocks_in(&path);
        assert_eq!(
            blocks.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            vec!["page_product_detail_content", "page_product_detail_price"]
        );
        assert_eq!(blocks[0].span.line, 2);

        let usages = indexer.snippet_usages_in(&path);
        assert_eq!(
            usages.iter().map(|u| u.key.as_str()).collect::<Vec<_>>(),
            vec!["detail.headline", "detail.price.label"]
        );

        let referencing =
            indexer.referencing("@Storefront/storefront/page/product-detail/index.html.twig");
        assert_eq!(referencing.len(), 1);
        let include = indexer.referencing("storefront/component/buy-widget.html.twig");
        assert_eq!(include.len(), 1);
    }

    #[test]
    fn logical_paths_derive_from_the_views_directory() {
        assert_eq!(
            logical_path(Path::new(
                "/ws/Resources/views/storefront/page/index.html.twig"
            ))
            .as_deref(),
            Some("storefront/page/index.html.twig")
        );
        assert_eq!(logical_path(Path::new("/ws/no/views.twig")), None);
    }

    #[test]
    fn block_lookup_spans_multiple_templates() {
        let indexer = TemplateIndexer::new(None);
        index_str(&indexer, "index.html.twig", TWIG);
        index_str(
            &indexer,
            "override.html.twig",
            "{% block page_product_detail_content %}{% endblock %}",
        );

        assert_eq!(indexer.blocks("page_product_detail_content").len(), 2);
        assert_eq!(indexer.blocks("page_product_detail_price").len(), 1);
        assert!(indexer.blocks("missing").is_empty());
    }

    #[test]
    fn umlauts_in_block_names_produce_utf16_spans() {
        let indexer = TemplateIndexer::new(None);
        // The name regex stops at non-ASCII, so pin the position math with a
        // preceding umlaut instead: the block keyword sits after it.
        let source = "{# grüße #}\n{% block footer %}{% endblock %}";
        let path = index_str(&indexer, "footer.html.twig", source);
        let blocks = indexer.blocks_in(&path);
        assert_eq!(blocks[0].name, "footer");
        assert_eq!(blocks[0].span.line, 1);
        assert_eq!(blocks[0].span.start_char, 9);
    }

    #[test]
    fn reindex_replaces_and_remove_clears() {
        let indexer = TemplateIndexer::new(None);
        let path = index_str(&indexer, "index.html.twig", TWIG);
        index_str(&indexer, "index.html.twig", "{% block only %}{% endblock %}");
        assert_eq!(indexer.all_block_names(), vec!["only".to_string()]);

        indexer.remove_file(&path).unwrap();
        assert!(indexer.all_block_names().is_empty());
    }

    #[test]
    fn template_lookup_by_logical_path() {
        let indexer = TemplateIndexer::new(None);
        let path = index_str(&indexer, "index.html.twig", TWIG);
        assert_eq!(
            indexer.template_by_logical("storefront/page/index.html.twig"),
            Some(path)
        );
        assert_eq!(indexer.template_by_logical("storefront/missing.html.twig"), None);
    }
}
