//! Blockquote detectors: panels (callout and bold forms), decision lists
//! and blockquote-style expands, tried in that order.

use comrak::nodes::{AstNode, NodeValue};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::ast::{Mark, Node};
use crate::parser::config::{DecisionDetection, ExpandDetection, PanelDetection};

use super::ParseState;

static PANEL_CALLOUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[!([a-z]+)(?::\s*([^\]]+))?\](?:\s*(.*))?$").unwrap());

impl ParseState<'_> {
    pub(crate) fn try_panel_blockquote(&mut self, content: &[Node]) -> Option<Node> {
        if content.is_empty() || self.config.panel_detection == PanelDetection::None {
            return None;
        }

        let first = as_paragraph(&content[0])?;

        if matches!(
            self.config.panel_detection,
            PanelDetection::Github | PanelDetection::Title | PanelDetection::All
        ) {
            if let Some(panel) = detect_callout_panel(first, &content[1..]) {
                return Some(panel);
            }
        }

        if matches!(
            self.config.panel_detection,
            PanelDetection::Bold | PanelDetection::All
        ) {
            if let Some(panel) = detect_bold_panel(first, &content[1..]) {
                return Some(panel);
            }
        }

        None
    }

    pub(crate) fn try_decision_blockquote(&mut self, content: &[Node]) -> Option<Node> {
        if content.is_empty() || self.config.decision_detection == DecisionDetection::None {
            return None;
        }

        let mut items: Vec<Node> = Vec::new();

        for block in content {
            if let Some(paragraph) = as_paragraph(block) {
                if let Some((state, trimmed)) = self.parse_decision_prefix(paragraph) {
                    let mut item = Node::bare("decisionItem");
                    if !state.is_empty() {
                        item.set_attr("state", Value::String(state));
                    }
                    if !trimmed.content.is_empty() {
                        item.content.push(trimmed);
                    }
                    items.push(item);
                    continue;
                }
            }

            // Trailing blocks attach to the item they follow.
            match items.last_mut() {
                Some(item) => item.content.push(block.clone()),
                None => return None,
            }
        }

        if items.is_empty() {
            return None;
        }

        Some(Node {
            kind: "decisionList".to_string(),
            content: items,
            ..Node::default()
        })
    }

    fn parse_decision_prefix(&self, paragraph: &Node) -> Option<(String, Node)> {
        let (label, remainder) = leading_strong_prefix(&paragraph.content)?;
        let (remainder, has_colon) = trim_leading_colon(&remainder)?;
        if !has_colon {
            return None;
        }

        let state = self.match_decision_label(&label)?;

        Some((
            state,
            Node {
                kind: "paragraph".to_string(),
                content: remainder,
                ..Node::default()
            },
        ))
    }

    /// Match a strong label against the known decision forms. The mojibake
    /// variant is the latin-1 mis-decode of the check mark recorded in old
    /// fixtures; it is accepted but never emitted.
    fn match_decision_label(&self, label: &str) -> Option<String> {
        let normalized = label.trim().to_uppercase();
        let emoji = matches!(
            self.config.decision_detection,
            DecisionDetection::Emoji | DecisionDetection::All
        );
        let text = matches!(
            self.config.decision_detection,
            DecisionDetection::Text | DecisionDetection::All
        );

        match normalized.as_str() {
            "? DECISION" if emoji => Some("UNDECIDED".to_string()),
            "DECIDED" if text => Some("DECIDED".to_string()),
            "UNDECIDED" if text => Some("UNDECIDED".to_string()),
            "DECISION" => Some(String::new()),
            other => {
                let prefix = other.strip_suffix(" DECISION")?;
                if emoji && (prefix == "\u{2713}" || is_mojibake_check_mark(prefix)) {
                    Some("DECIDED".to_string())
                } else {
                    None
                }
            }
        }
    }

    pub(crate) fn try_expand_blockquote<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        content: &[Node],
    ) -> Option<Node> {
        if matches!(
            self.config.expand_detection,
            ExpandDetection::None | ExpandDetection::Html
        ) {
            return None;
        }

        let kind = if self.is_nested_expand_context(node) {
            "nestedExpand"
        } else {
            "expand"
        };

        if let Some((title, remaining)) = extract_expand_title(content) {
            let mut expand = Node {
                kind: kind.to_string(),
                content: remaining,
                ..Node::default()
            };
            expand.set_attr("title", Value::String(title));
            return Some(expand);
        }

        if self.config.expand_detection == ExpandDetection::Blockquote {
            return Some(Node {
                kind: kind.to_string(),
                content: content.to_vec(),
                ..Node::default()
            });
        }

        None
    }

    fn is_nested_expand_context<'a>(&self, node: &'a AstNode<'a>) -> bool {
        if self.html_expand_depth > 0 || self.pandoc_expand_depth > 0 {
            return true;
        }
        match node.parent() {
            Some(parent) => matches!(
                parent.data.borrow().value,
                NodeValue::Item(_) | NodeValue::TaskItem(_) | NodeValue::BlockQuote
            ),
            None => false,
        }
    }
}

fn detect_callout_panel(first: &Node, remaining: &[Node]) -> Option<Node> {
    let text = paragraph_plain_text(first);
    let captures = PANEL_CALLOUT.captures(text.trim())?;

    let panel_type = normalize_panel_type(captures.get(1).map_or("", |m| m.as_str()))?;

    let mut panel = Node::bare("panel");
    panel.set_attr("panelType", Value::String(panel_type));

    if let Some(title) = captures.get(2) {
        let title = title.as_str().trim();
        if !title.is_empty() {
            panel.set_attr("title", Value::String(title.to_string()));
        }
    }

    if let Some(rest) = captures.get(3) {
        let rest = rest.as_str().trim();
        if !rest.is_empty() {
            panel.content.push(Node {
                kind: "paragraph".to_string(),
                content: vec![Node::text(rest, Vec::new())],
                ..Node::default()
            });
        }
    }

    panel.content.extend(remaining.iter().cloned());
    Some(panel)
}

fn detect_bold_panel(first: &Node, remaining: &[Node]) -> Option<Node> {
    let (label, remainder) = leading_strong_prefix(&first.content)?;
    let panel_type = normalize_panel_type(&label)?;

    let (trimmed_remainder, has_colon) = trim_leading_colon(&remainder)?;
    if !has_colon {
        return None;
    }

    let mut panel = Node::bare("panel");
    panel.set_attr("panelType", Value::String(panel_type));

    if !trimmed_remainder.is_empty() {
        panel.content.push(Node {
            kind: "paragraph".to_string(),
            content: trimmed_remainder,
            ..Node::default()
        });
    }
    panel.content.extend(remaining.iter().cloned());

    Some(panel)
}

/// The uppercased latin-1 and cp1252 mis-decodes of the UTF-8 check mark,
/// as they appear in recorded fixtures.
fn is_mojibake_check_mark(prefix: &str) -> bool {
    matches!(
        prefix,
        "\u{c2}\u{9c}\u{93}" | "\u{c2}\u{152}\u{201c}" | "\u{e2}\u{9c}\u{93}" | "\u{e2}\u{153}\u{201c}"
    )
}

fn normalize_panel_type(value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    match lowered.as_str() {
        "info" | "note" | "success" | "warning" | "error" => Some(lowered),
        _ => None,
    }
}

/// First paragraph made solely of consecutive strong text becomes the
/// expand title; everything after it is the body.
fn extract_expand_title(content: &[Node]) -> Option<(String, Vec<Node>)> {
    let first = as_paragraph(content.first()?)?;
    let (title, remainder) = leading_strong_prefix(&first.content)?;
    if !inline_plain_text(&remainder).trim().is_empty() {
        return None;
    }
    Some((title, content[1..].to_vec()))
}

fn as_paragraph(node: &Node) -> Option<&Node> {
    if node.kind == "paragraph" {
        Some(node)
    } else {
        None
    }
}

/// Joined label of the leading run of strong-marked text children, plus
/// the rest of the paragraph.
fn leading_strong_prefix(content: &[Node]) -> Option<(String, Vec<Node>)> {
    let mut label = String::new();
    let mut index = 0;

    while index < content.len() {
        let node = &content[index];
        if node.kind != "text" || !has_strong_mark(&node.marks) {
            break;
        }
        label.push_str(node.text_value());
        index += 1;
    }

    if index == 0 {
        return None;
    }

    Some((label.trim().to_string(), content[index..].to_vec()))
}

fn has_strong_mark(marks: &[Mark]) -> bool {
    marks.iter().any(|mark| mark.kind == "strong")
}

/// Strip a leading `:` (after optional whitespace) from the first
/// non-blank text node. Returns the trimmed content and whether the colon
/// was found; any non-text node before the colon aborts the match.
fn trim_leading_colon(content: &[Node]) -> Option<(Vec<Node>, bool)> {
    if content.is_empty() {
        return None;
    }

    let mut trimmed = content.to_vec();
    for index in 0..trimmed.len() {
        if trimmed[index].kind != "text" {
            return None;
        }

        let text = trimmed[index].text_value().to_string();
        if text.trim().is_empty() {
            continue;
        }

        let after_space = text.trim_start_matches([' ', '\t']);
        let rest = after_space.strip_prefix(':')?;
        trimmed[index].text = Some(rest.trim_start_matches([' ', '\t']).to_string());

        let mut out = trimmed.split_off(index);
        if !out.is_empty() && out[0].kind == "text" && out[0].text_value().is_empty() {
            out.remove(0);
        }
        return Some((out, true));
    }

    None
}

pub(crate) fn paragraph_plain_text(paragraph: &Node) -> String {
    inline_plain_text(&paragraph.content)
}

pub(crate) fn inline_plain_text(content: &[Node]) -> String {
    let mut out = String::new();
    for node in content {
        match node.kind.as_str() {
            "text" => out.push_str(node.text_value()),
            "hardBreak" => out.push('\n'),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::ast::Doc;
    use crate::parser::config::{DecisionDetection, ExpandDetection, PanelDetection};
    use crate::parser::{MarkdownParser, ReverseConfig};

    fn parse_doc_with(config: ReverseConfig, markdown: &str) -> Doc {
        let result = MarkdownParser::new(config).unwrap().parse(markdown).unwrap();
        serde_json::from_slice(&result.adf).unwrap()
    }

    fn parse_doc(markdown: &str) -> Doc {
        parse_doc_with(ReverseConfig::default(), markdown)
    }

    #[test]
    fn github_callout_becomes_panel() {
        let doc = parse_doc("> [!WARNING]\n> watch out\n");
        let panel = &doc.content[0];
        assert_eq!(panel.kind, "panel");
        assert_eq!(panel.str_attr("panelType", ""), "warning");
        assert_eq!(panel.content[0].kind, "paragraph");
        assert_eq!(panel.content[0].content[0].text_value(), "watch out");
    }

    #[test]
    fn callout_with_title_and_same_line_text() {
        let config = ReverseConfig {
            panel_detection: PanelDetection::Title,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "> [!NOTE: Read me] trailing\n> body\n");
        let panel = &doc.content[0];
        assert_eq!(panel.str_attr("panelType", ""), "note");
        assert_eq!(panel.str_attr("title", ""), "Read me");
        assert_eq!(panel.content[0].content[0].text_value(), "trailing");
    }

    #[test]
    fn bold_panel_detection() {
        let config = ReverseConfig {
            panel_detection: PanelDetection::Bold,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "> **Info**: First\n>\n> Second\n");
        let panel = &doc.content[0];
        assert_eq!(panel.kind, "panel");
        assert_eq!(panel.str_attr("panelType", ""), "info");
        assert_eq!(panel.content.len(), 2);
        assert_eq!(panel.content[0].content[0].text_value(), "First");
        assert_eq!(panel.content[1].content[0].text_value(), "Second");
    }

    #[test]
    fn unknown_bold_label_stays_blockquote() {
        let config = ReverseConfig {
            panel_detection: PanelDetection::Bold,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "> **Random**: text\n");
        assert_eq!(doc.content[0].kind, "blockquote");
    }

    #[test]
    fn decision_blockquote_with_states() {
        let doc = parse_doc(
            "> **\u{2713} Decision**: ship it\n> \n> **? Decision**: maybe\n",
        );
        let list = &doc.content[0];
        assert_eq!(list.kind, "decisionList");
        assert_eq!(list.content.len(), 2);
        assert_eq!(list.content[0].str_attr("state", ""), "DECIDED");
        assert_eq!(list.content[1].str_attr("state", ""), "UNDECIDED");
    }

    #[test]
    fn mojibake_decision_label_is_accepted() {
        let doc = parse_doc("> **\u{e2}\u{153}\u{201c} Decision**: legacy fixture\n");
        let list = &doc.content[0];
        assert_eq!(list.kind, "decisionList");
        assert_eq!(list.content[0].str_attr("state", ""), "DECIDED");
    }

    #[test]
    fn text_decision_labels_require_text_detection() {
        let config = ReverseConfig {
            decision_detection: DecisionDetection::Text,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "> **DECIDED**: done\n");
        assert_eq!(doc.content[0].kind, "decisionList");

        // Emoji detection does not accept the text form.
        let doc = parse_doc("> **DECIDED**: done\n");
        assert_eq!(doc.content[0].kind, "blockquote");
    }

    #[test]
    fn expand_blockquote_title_detection() {
        let config = ReverseConfig {
            expand_detection: ExpandDetection::Blockquote,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "> **More details**\n> \n> hidden body\n");
        let expand = &doc.content[0];
        assert_eq!(expand.kind, "expand");
        assert_eq!(expand.str_attr("title", ""), "More details");
        assert_eq!(expand.content[0].content[0].text_value(), "hidden body");
    }

    #[test]
    fn expand_detection_html_leaves_blockquotes_alone() {
        let doc = parse_doc("> **Just bold**\n> \n> body\n");
        assert_eq!(doc.content[0].kind, "blockquote");
    }
}
