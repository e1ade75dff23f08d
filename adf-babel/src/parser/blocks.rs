//! Per-kind block converters: paragraphs, headings, blockquotes, code
//! blocks and the HTMLBlock regex dispatch.

use comrak::nodes::{AstNode, NodeCodeBlock, NodeValue};
use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::inline::collect_text;
use super::mark_stack::MarkStack;
use super::pandoc::{extract_text_align, parse_attributes, read_attr_block};
use super::ParseState;

impl ParseState<'_> {
    /// Dispatch a single block AST node. `Ok(None)` means the block
    /// produced nothing (empty or consumed elsewhere).
    pub(crate) fn convert_block_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
    ) -> Result<Option<Node>, ConvertError> {
        self.check_cancelled()?;

        let data = node.data.borrow();
        match &data.value {
            NodeValue::Paragraph => {
                drop(data);
                self.convert_paragraph_node(node)
            }
            NodeValue::Heading(heading) => {
                let level = heading.level as i64;
                drop(data);
                self.convert_heading_node(node, level)
            }
            NodeValue::BlockQuote => {
                drop(data);
                self.convert_blockquote_node(node)
            }
            NodeValue::ThematicBreak => Ok(Some(Node::bare("rule"))),
            NodeValue::CodeBlock(code_block) => {
                let code_block = code_block.clone();
                drop(data);
                self.convert_code_block_node(&code_block)
            }
            NodeValue::List(list) => {
                let list = list.clone();
                drop(data);
                self.convert_list_node(node, &list)
            }
            NodeValue::Table(table) => {
                let alignments = table.alignments.clone();
                drop(data);
                self.convert_table_node(node, &alignments)
            }
            NodeValue::HtmlBlock(block) => {
                let literal = block.literal.clone();
                drop(data);
                self.convert_html_block_node(&literal)
            }
            other => {
                let kind = format!("{other:?}");
                let kind = kind.split(['(', ' ']).next().unwrap_or("unknown").to_string();
                drop(data);

                let mut text = String::new();
                collect_text(node, &mut text);
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }

                self.warn(
                    WarningKind::UnknownNode,
                    &kind,
                    format!("unsupported markdown block node: {kind}"),
                );
                Ok(Some(Node {
                    kind: "paragraph".to_string(),
                    content: vec![Node::text(text, Vec::new())],
                    ..Node::default()
                }))
            }
        }
    }

    fn convert_paragraph_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
    ) -> Result<Option<Node>, ConvertError> {
        let content = self.convert_inline_children(node, &mut MarkStack::new())?;
        let content = self.normalize_paragraph_inline(content);

        if content.is_empty() {
            return Ok(None);
        }
        // A paragraph whose sole result is a block replacement unwraps.
        if content.len() == 1 && is_paragraph_block_replacement(&content[0].kind) {
            return Ok(Some(content.into_iter().next().expect("one element")));
        }

        Ok(Some(Node {
            kind: "paragraph".to_string(),
            content,
            ..Node::default()
        }))
    }

    fn convert_heading_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        level: i64,
    ) -> Result<Option<Node>, ConvertError> {
        let mut content = self.convert_inline_children(node, &mut MarkStack::new())?;
        content = self.apply_inline_patterns(content);

        let mut alignment: Option<String> = None;
        if self.config.detect_align_pandoc() {
            alignment = take_trailing_attr_alignment(&mut content);
        }

        let level = (level + self.config.heading_offset).clamp(1, 6);

        let mut heading = Node {
            kind: "heading".to_string(),
            content,
            ..Node::default()
        };
        heading.set_attr("level", Value::Number(level.into()));
        if let Some(alignment) = alignment {
            heading.set_attr("layout", Value::String(alignment));
        }

        Ok(Some(heading))
    }

    fn convert_blockquote_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
    ) -> Result<Option<Node>, ConvertError> {
        let children: Vec<&AstNode<'_>> = node.children().collect();
        let content = self.convert_sequence(&children)?;

        if let Some(panel) = self.try_panel_blockquote(&content) {
            return Ok(Some(panel));
        }
        if let Some(decision) = self.try_decision_blockquote(&content) {
            return Ok(Some(decision));
        }
        if let Some(expand) = self.try_expand_blockquote(node, &content) {
            return Ok(Some(expand));
        }

        Ok(Some(Node {
            kind: "blockquote".to_string(),
            content,
            ..Node::default()
        }))
    }

    fn convert_code_block_node(
        &mut self,
        code_block: &NodeCodeBlock,
    ) -> Result<Option<Node>, ConvertError> {
        let info = code_block.info.trim();
        let language = info.split_whitespace().next().unwrap_or("");
        let text = code_block.literal.trim_end_matches('\n');

        if let Some(extension) = self.parse_extension_fence(language, text)? {
            return Ok(Some(extension));
        }

        let language = self
            .config
            .language_map
            .get(language)
            .map(String::as_str)
            .unwrap_or(language);

        let mut code = Node::bare("codeBlock");
        if !language.is_empty() {
            code.set_attr("language", Value::String(language.to_string()));
        }
        if !text.is_empty() {
            code.content = vec![Node::text(text, Vec::new())];
        }

        Ok(Some(code))
    }

    /// Inline block-style nodes mixed with other inline content degrade to
    /// placeholder text; a sole one is handled by paragraph unwrapping.
    pub(crate) fn normalize_paragraph_inline(&mut self, content: Vec<Node>) -> Vec<Node> {
        let content = self.apply_inline_patterns(content);
        if content.len() <= 1 {
            return content;
        }

        let mut normalized = Vec::with_capacity(content.len());
        for node in content {
            if is_paragraph_block_replacement(&node.kind) {
                self.warn(
                    WarningKind::DroppedFeature,
                    &node.kind,
                    "inline block-style node mixed with text; converted to placeholder text",
                );
                super::append_inline_node(
                    &mut normalized,
                    Node::text("[Embedded content]", Vec::new()),
                );
                continue;
            }
            super::append_inline_node(&mut normalized, node);
        }

        normalized
    }
}

pub(crate) fn is_paragraph_block_replacement(kind: &str) -> bool {
    matches!(kind, "mediaSingle" | "table")
}

/// When the last text child of a heading ends with a `{...}` Pandoc
/// attribute block carrying alignment, pull it off and return it.
fn take_trailing_attr_alignment(content: &mut Vec<Node>) -> Option<String> {
    let last = content.last_mut()?;
    if last.kind != "text" {
        return None;
    }

    let text = last.text_value().trim_end().to_string();
    let brace = text.rfind('{')?;
    let (raw, end) = read_attr_block(text.as_bytes(), brace)?;
    if !text[end..].trim().is_empty() {
        return None;
    }

    let (_, attrs) = parse_attributes(&raw);
    let alignment = match attrs.get("align") {
        Some(value) if matches!(value.as_str(), "left" | "center" | "right") => value.clone(),
        _ => extract_text_align(attrs.get("style").map(String::as_str).unwrap_or(""))?,
    };

    let trimmed = text[..brace].trim_end().to_string();
    if trimmed.is_empty() {
        content.pop();
    } else {
        last.text = Some(trimmed);
    }

    Some(alignment)
}

#[cfg(test)]
mod tests {
    use crate::ast::Doc;
    use crate::parser::config::AlignmentDetection;
    use crate::parser::{MarkdownParser, ReverseConfig};

    fn parse_doc_with(config: ReverseConfig, markdown: &str) -> Doc {
        let result = MarkdownParser::new(config).unwrap().parse(markdown).unwrap();
        serde_json::from_slice(&result.adf).unwrap()
    }

    fn parse_doc(markdown: &str) -> Doc {
        parse_doc_with(ReverseConfig::default(), markdown)
    }

    #[test]
    fn heading_level_lands_in_attrs() {
        let doc = parse_doc("### Three\n");
        assert_eq!(doc.content[0].kind, "heading");
        assert_eq!(doc.content[0].int_attr("level", 0), 3);
    }

    #[test]
    fn heading_trailing_pandoc_attr_becomes_layout() {
        let config = ReverseConfig {
            alignment_detection: AlignmentDetection::Pandoc,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "## Title {style=\"text-align: center;\"}\n");
        let heading = &doc.content[0];
        assert_eq!(heading.str_attr("layout", ""), "center");
        assert_eq!(heading.content[0].text_value(), "Title");
    }

    #[test]
    fn fenced_code_keeps_language_and_applies_map() {
        let mut config = ReverseConfig::default();
        config
            .language_map
            .insert("golang".to_string(), "go".to_string());
        let doc = parse_doc_with(config, "```golang\npackage main\n```\n");
        let code = &doc.content[0];
        assert_eq!(code.kind, "codeBlock");
        assert_eq!(code.str_attr("language", ""), "go");
        assert_eq!(code.content[0].text_value(), "package main");
    }

    #[test]
    fn plain_blockquote_stays_blockquote() {
        let doc = parse_doc("> just a quote\n");
        assert_eq!(doc.content[0].kind, "blockquote");
        assert_eq!(doc.content[0].content[0].kind, "paragraph");
    }

    #[test]
    fn thematic_break_is_a_rule() {
        let doc = parse_doc("---\n");
        assert_eq!(doc.content[0].kind, "rule");
    }

    #[test]
    fn sole_image_paragraph_unwraps_to_media_single() {
        let doc = parse_doc("![Cat](https://example.com/cat.png)\n");
        assert_eq!(doc.content[0].kind, "mediaSingle");
        assert_eq!(doc.content[0].content[0].kind, "media");
    }

    #[test]
    fn image_mixed_with_text_degrades_to_placeholder() {
        let result = MarkdownParser::new(ReverseConfig::default())
            .unwrap()
            .parse("before ![Cat](https://example.com/cat.png) after\n")
            .unwrap();
        let doc: Doc = serde_json::from_slice(&result.adf).unwrap();
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.kind, "paragraph");
        let joined: String = paragraph
            .content
            .iter()
            .map(|node| node.text_value())
            .collect();
        assert!(joined.contains("[Embedded content]"));
        assert!(!result.warnings.is_empty());
    }
}
