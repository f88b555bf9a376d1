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

//! Small helpers over the XML grammar's tree shape.
//!
//! The XML grammar follows the W3C production names: an `element` wraps an
//! `STag` (or `EmptyElemTag`) holding a `Name` and `Attribute` nodes, where
//! each `Attribute` is `Name "=" AttValue` and the `AttValue` text still
//! carries its quotes.

use tree_sitter::Node;

/// An attribute with its unquoted value and the value node's byte span
/// (quotes excluded).
pub struct XmlAttribute<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub value_start: usize,
    pub value_end: usize,
}

fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

/// Tag name of an `element` node.
pub fn element_name<'a>(element: Node<'_>, source: &'a [u8]) -> Option<&'a str> {
    let tag = start_tag(element)?;
    for i in 0..tag.child_count() {
        let child = tag.child(i)?;
        if child.kind() == "Name" {
            return Some(node_text(child, source));
        }
    }
    None
}

fn start_tag(element: Node<'_>) -> Option<Node<'_>> {
    for i in 0..element.child_count() {
        let child = element.child(i)?;
        if matches!(child.kind(), "STag" | "EmptyElemTag") {
            return Some(child);
        }
    }
    None
}

/// All attributes of an `element` node.
pub fn attributes<'a>(element: Node<'_>, source: &'a [u8]) -> Vec<XmlAttribute<'a>> {
    let Some(tag) = start_tag(element) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for i in 0..tag.child_count() {
        let Some(attribute) = tag.child(i) else {
            continue;
        };
        if attribute.kind() != "Attribute" {
            continue;
        }
        let mut name = None;
        let mut value_node = None;
        for j in 0..attribute.child_count() {
            let Some(part) = attribute.child(j) else {
                continue;
            };
            match part.kind() {
                "Name" => name = Some(part),
                "AttValue" => value_node = Some(part),
                _ => {}
            }
        }
        if let (Some(name), Some(value)) = (name, value_node) {
            let raw = node_text(value, source);
            let trimmed = raw.trim_matches(|c| c == '"' || c == '\'');
            let quote = usize::from(raw.len() > trimmed.len());
            out.push(XmlAttribute {
                name: node_text(name, source),
                value: trimmed,
                value_start: value.start_byte() + quote,
                value_end: value.end_byte().saturating_sub(quote),
            });
        }
    }
    out
}

/// Value of a single attribute, by name.
pub fn attribute<'a>(element: Node<'_>, source: &'a [u8], name: &str) -> Option<XmlAttribute<'a>> {
    attributes(element, source)
        .into_iter()
        .find(|attr| attr.name == name)
}

/// Depth-first visit of every `element` node under `root`.
pub fn for_each_element<'t>(root: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "element" {
            f(node);
        }
        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push(child);
            }
        }
    }
}

/// Climb from a node inside an attribute value to `(element name,
/// attribute name)`. Used to decide completion/definition contexts.
pub fn attribute_context<'a>(node: Node<'_>, source: &'a [u8]) -> Option<(&'a str, &'a str)> {
    let mut current = node;
    let attribute = loop {
        if current.kind() == "Attribute" {
            break current;
        }
        current = current.parent()?;
    };
    let mut attr_name = None;
    for i in 0..attribute.child_count() {
        let child = attribute.child(i)?;
        if child.kind() == "Name" {
            attr_name = Some(node_text(child, source));
            break;
        }
    }
    // Attribute -> STag/EmptyElemTag -> element
    let element = attribute.parent()?.parent()?;
    Some((element_name(element, source)?, attr_name?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopware_lsp_core::ParserPool;

    const SOURCE: &[u8] =
        br#"<container><service id="swag.demo" class="Swag\Demo"><tag name="console.command"/></service></container>"#;

    fn with_tree(f: impl FnOnce(Node<'_>)) {
        let pool = ParserPool::new().unwrap();
        let tree = pool.parse("xml", SOURCE).unwrap();
        f(tree.root_node());
    }

    #[test]
    fn elements_and_attributes_are_walkable() {
        with_tree(|root| {
            let mut names = Vec::new();
            for_each_element(root, &mut |element| {
                names.push(element_name(element, SOURCE).unwrap_or("?").to_string());
            });
            assert_eq!(names, vec!["container", "service", "tag"]);
        });
    }

    #[test]
    fn attribute_values_are_unquoted_with_correct_spans() {
        with_tree(|root| {
            let mut id = None;
            for_each_element(root, &mut |element| {
                if element_name(element, SOURCE) == Some("service") {
                    id = attribute(element, SOURCE, "id")
                        .map(|attr| (attr.value.to_string(), attr.value_start, attr.value_end));
                }
            });
            let (value, start, end) = id.unwrap();
            assert_eq!(value, "swag.demo");
            assert_eq!(&SOURCE[start..end], b"swag.demo");
        });
    }

    #[test]
    fn attribute_context_resolves_from_inside_a_value() {
        with_tree(|root| {
            // Byte offset inside "swag.demo".
            let offset = SOURCE
                .windows(b"swag.demo".len())
                .position(|w| w == b"swag.demo")
                .unwrap()
                + 2;
            let node = root
                .named_descendant_for_byte_range(offset, offset)
                .unwrap();
            let (element, attr) = attribute_context(node, SOURCE).unwrap();
            assert_eq!(element, "service");
            assert_eq!(attr, "id");
        });
    }
}
