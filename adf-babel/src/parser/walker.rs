//! Block-sequence walker.
//!
//! Flattens the children of an AST container into a sequence and consumes
//! it with lookaheads for the paired-HTML constructs a markdown parser
//! sees as separate blocks: `<details>…</details>`, layout section/column
//! divs and bodied-extension divs. Everything else dispatches to the
//! per-kind converters.

use comrak::nodes::{AstNode, NodeValue};
use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;

use super::html_blocks::{
    bodied_extension_div_open, details_close, details_open_title, div_close, is_any_div_open,
    layout_column_open, layout_section_open,
};
use super::ParseState;

impl ParseState<'_> {
    /// Convert a flat sequence of sibling blocks.
    pub(crate) fn convert_sequence<'a>(
        &mut self,
        nodes: &[&'a AstNode<'a>],
    ) -> Result<Vec<Node>, ConvertError> {
        let mut out = Vec::new();
        let mut index = 0;

        while index < nodes.len() {
            self.check_cancelled()?;
            let node = nodes[index];

            if let Some(literal) = html_block_literal(node) {
                if self.config.detect_expand_html() {
                    if let Some(title) = details_open_title(&literal) {
                        if let Some(close) = find_details_close(nodes, index) {
                            let expand =
                                self.consume_details(&nodes[index + 1..close], &title, node)?;
                            out.push(expand);
                            index = close + 1;
                            continue;
                        }
                    }
                }

                if layout_section_open(&literal) {
                    if let Some(close) = find_div_close(nodes, index) {
                        let section = self.consume_layout_section(&nodes[index + 1..close])?;
                        if let Some(section) = section {
                            out.push(section);
                        }
                        index = close + 1;
                        continue;
                    }
                }

                if self.config.detect_bodied_extension_html() {
                    if let Some(attrs) = bodied_extension_div_open(&literal) {
                        if let Some(close) = find_div_close(nodes, index) {
                            let inner = self.convert_sequence(&nodes[index + 1..close])?;
                            out.push(bodied_extension_node(attrs.0, attrs.1, attrs.2, inner));
                            index = close + 1;
                            continue;
                        }
                    }
                }
            }

            if let Some(converted) = self.convert_block_node(node)? {
                out.push(converted);
            }
            index += 1;
        }

        Ok(self.finalize_blocks(out))
    }

    fn consume_details<'a>(
        &mut self,
        inner: &[&'a AstNode<'a>],
        title: &str,
        open_node: &'a AstNode<'a>,
    ) -> Result<Node, ConvertError> {
        let nested = self.html_expand_depth > 0 || has_nested_parent(open_node);

        self.html_expand_depth += 1;
        let content = self.convert_sequence(inner);
        self.html_expand_depth -= 1;
        let content = content?;

        let mut expand = Node {
            kind: if nested { "nestedExpand" } else { "expand" }.to_string(),
            content,
            ..Node::default()
        };
        if !title.is_empty() {
            expand.set_attr("title", Value::String(title.to_string()));
        }
        Ok(expand)
    }

    /// Inside a layout section, column divs pair with their own closing
    /// tags; stray blocks between columns become direct section children.
    fn consume_layout_section<'a>(
        &mut self,
        inner: &[&'a AstNode<'a>],
    ) -> Result<Option<Node>, ConvertError> {
        let mut columns = Vec::new();
        let mut index = 0;

        while index < inner.len() {
            self.check_cancelled()?;
            let node = inner[index];

            if let Some(literal) = html_block_literal(node) {
                if let Some(width) = layout_column_open(&literal) {
                    if let Some(close) = find_div_close(inner, index) {
                        let content = self.convert_sequence(&inner[index + 1..close])?;
                        let mut column = Node {
                            kind: "layoutColumn".to_string(),
                            content,
                            ..Node::default()
                        };
                        if let Some(width) = width {
                            if let Some(number) = serde_json::Number::from_f64(width) {
                                column.set_attr("width", Value::Number(number));
                            }
                        }
                        columns.push(column);
                        index = close + 1;
                        continue;
                    }
                }
            }

            if let Some(converted) = self.convert_block_node(node)? {
                columns.push(converted);
            }
            index += 1;
        }

        if columns.is_empty() {
            return Ok(None);
        }

        Ok(Some(Node {
            kind: "layoutSection".to_string(),
            content: columns,
            ..Node::default()
        }))
    }
}

impl ParseState<'_> {
    /// Inline-block merging: a block converter that returns an inline-kind
    /// node gets wrapped into (or appended onto) a surrounding paragraph,
    /// and a plain paragraph directly after such a wrapper merges into it.
    /// Applied at the document level and inside every consumed region.
    pub(crate) fn finalize_blocks(&mut self, blocks: Vec<Node>) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::new();
        let mut last_was_inline_wrapper = false;

        for block in blocks {
            if super::is_inline_block_kind(&block.kind) {
                if last_was_inline_wrapper
                    || matches!(out.last(), Some(prev) if prev.kind == "paragraph" && prev.attrs.is_none())
                {
                    let prev = out.last_mut().expect("previous paragraph exists");
                    super::append_inline_node(&mut prev.content, block);
                } else {
                    out.push(Node {
                        kind: "paragraph".to_string(),
                        content: vec![block],
                        ..Node::default()
                    });
                }
                last_was_inline_wrapper = true;
                continue;
            }

            if last_was_inline_wrapper && block.kind == "paragraph" && block.attrs.is_none() {
                let prev = out.last_mut().expect("previous paragraph exists");
                for child in block.content {
                    super::append_inline_node(&mut prev.content, child);
                }
                last_was_inline_wrapper = false;
                continue;
            }

            last_was_inline_wrapper = false;
            out.push(block);
        }

        out
    }
}

pub(crate) fn html_block_literal<'a>(node: &'a AstNode<'a>) -> Option<String> {
    match &node.data.borrow().value {
        NodeValue::HtmlBlock(block) => Some(block.literal.trim().to_string()),
        _ => None,
    }
}

/// Scan forward for the `</details>` balancing the opener at `open`.
fn find_details_close<'a>(nodes: &[&'a AstNode<'a>], open: usize) -> Option<usize> {
    let mut depth = 1;
    for (offset, node) in nodes[open + 1..].iter().enumerate() {
        if let Some(literal) = html_block_literal(node) {
            if details_open_title(&literal).is_some() || literal.to_lowercase().starts_with("<details") {
                depth += 1;
            } else if details_close(&literal) {
                depth -= 1;
                if depth == 0 {
                    return Some(open + 1 + offset);
                }
            }
        }
    }
    None
}

/// Scan forward for the `</div>` balancing the div opener at `open`.
fn find_div_close<'a>(nodes: &[&'a AstNode<'a>], open: usize) -> Option<usize> {
    let mut depth = 1;
    for (offset, node) in nodes[open + 1..].iter().enumerate() {
        if let Some(literal) = html_block_literal(node) {
            if is_any_div_open(&literal) {
                depth += 1;
            } else if div_close(&literal) {
                depth -= 1;
                if depth == 0 {
                    return Some(open + 1 + offset);
                }
            }
        }
    }
    None
}

fn has_nested_parent<'a>(node: &'a AstNode<'a>) -> bool {
    match node.parent() {
        Some(parent) => matches!(
            parent.data.borrow().value,
            NodeValue::Item(_) | NodeValue::TaskItem(_) | NodeValue::BlockQuote
        ),
        None => false,
    }
}

fn bodied_extension_node(
    key: String,
    extension_type: String,
    parameters: Option<Value>,
    content: Vec<Node>,
) -> Node {
    let mut node = Node {
        kind: "bodiedExtension".to_string(),
        content,
        ..Node::default()
    };
    if !key.is_empty() {
        node.set_attr("extensionKey", Value::String(key));
    }
    if !extension_type.is_empty() {
        node.set_attr("extensionType", Value::String(extension_type));
    }
    if let Some(parameters) = parameters {
        node.set_attr("parameters", parameters);
    }
    node
}
