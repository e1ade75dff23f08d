//! Raw inline HTML: the supported tag subset (`<u>`, `<sub>`, `<sup>`,
//! `<br>`, color and mention spans) driving the mark and span-kind stacks.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Mark, Node};

use super::mark_stack::{new_text_node, MarkStack};
use super::{ParseState, SpanKind};

static SPAN_STYLE_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bcolor\s*:\s*([^;"]+)"#).unwrap());
static SPAN_STYLE_BG_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bbackground-color\s*:\s*([^;"]+)"#).unwrap());
static SPAN_MENTION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bdata-mention-id\s*=\s*"([^"]+)""#).unwrap());

impl ParseState<'_> {
    /// Handle one raw inline HTML fragment. Recognised tags mutate the
    /// stacks and emit nothing; recognised-but-disabled tags fall back to
    /// literal text; anything else is dropped.
    pub(crate) fn convert_raw_html(&mut self, raw: &str, stack: &mut MarkStack) -> Vec<Node> {
        let trimmed = raw.trim();
        let lower = trimmed.to_lowercase();

        match lower.as_str() {
            "<u>" | "</u>" => {
                if !self.config.detect_underline_html() {
                    return vec![new_text_node(trimmed, stack.current())];
                }
                if lower.starts_with("</") {
                    stack.pop_by_kind("underline");
                } else {
                    stack.push(Mark::bare("underline"));
                }
                return Vec::new();
            }
            "<sub>" | "</sub>" | "<sup>" | "</sup>" => {
                if !self.config.detect_sub_sup_html() {
                    return vec![new_text_node(trimmed, stack.current())];
                }
                if lower.starts_with("</") {
                    stack.pop_by_kind("subsup");
                } else {
                    let kind = if lower == "<sub>" { "sub" } else { "sup" };
                    stack.push(Mark::with_attr("subsup", "type", kind));
                }
                return Vec::new();
            }
            "<br>" | "<br/>" | "<br />" => {
                return vec![Node::bare("hardBreak")];
            }
            _ => {}
        }

        if lower.starts_with("<span") {
            if let Some(mention_id) = extract_span_mention_id(trimmed) {
                if self.config.detect_mention_html() {
                    self.html_mention_stack.push(mention_id);
                    self.html_span_stack.push(SpanKind::Mention);
                    return Vec::new();
                }
                self.html_span_stack.push(SpanKind::Unknown);
                return vec![new_text_node(trimmed, stack.current())];
            }

            if let Some(color) = extract_span_style_color(trimmed, true) {
                if self.config.detect_color_html() {
                    stack.push(Mark::with_attr("backgroundColor", "color", color));
                    self.html_span_stack.push(SpanKind::BackgroundColor);
                    return Vec::new();
                }
                self.html_span_stack.push(SpanKind::Unknown);
                return vec![new_text_node(trimmed, stack.current())];
            }
            if let Some(color) = extract_span_style_color(trimmed, false) {
                if self.config.detect_color_html() {
                    stack.push(Mark::with_attr("textColor", "color", color));
                    self.html_span_stack.push(SpanKind::TextColor);
                    return Vec::new();
                }
                self.html_span_stack.push(SpanKind::Unknown);
                return vec![new_text_node(trimmed, stack.current())];
            }

            self.html_span_stack.push(SpanKind::Unknown);
            return Vec::new();
        }

        if lower.starts_with("</span") {
            match self.html_span_stack.pop() {
                Some(SpanKind::Mention) => {
                    self.html_mention_stack.pop();
                }
                Some(SpanKind::TextColor) => {
                    stack.pop_by_kind("textColor");
                }
                Some(SpanKind::BackgroundColor) => {
                    stack.pop_by_kind("backgroundColor");
                }
                Some(SpanKind::Unknown) | None => {}
            }
            return Vec::new();
        }

        Vec::new()
    }
}

fn extract_span_style_color(tag: &str, background: bool) -> Option<String> {
    let regex = if background {
        &SPAN_STYLE_BG_COLOR
    } else {
        &SPAN_STYLE_COLOR
    };
    let captures = regex.captures(tag)?;
    let value = captures.get(1)?.as_str().trim();

    // The plain `color:` pattern also matches inside `background-color:`;
    // make sure a foreground lookup did not land there.
    if !background {
        let match_start = captures.get(0)?.start();
        if tag[..match_start].to_lowercase().ends_with("background-") {
            return None;
        }
    }

    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn extract_span_mention_id(tag: &str) -> Option<String> {
    let captures = SPAN_MENTION_ID.captures(tag)?;
    let id = captures.get(1)?.as_str().trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
