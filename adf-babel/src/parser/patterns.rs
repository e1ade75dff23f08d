//! Inline pattern expansion over text runs.
//!
//! Scans converted text nodes for the compact inline encodings the
//! serializer emits: `:shortcode:` emoji, `[Status: ...]` badges, ISO
//! dates, `[Image: id]` / `[File: id]` placeholders, registered `@Name`
//! mentions, Pandoc `[text]{attrs}` spans and `~sub~` / `^sup^` runs.
//! Matches are resolved earliest-start-longest-match; each one splits the
//! run and emits the corresponding structured node.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::ast::{Mark, Node};
use crate::result::WarningKind;

use super::inline::mention_node;
use super::mark_stack::{append_inline_node, new_text_node};
use super::pandoc::{extract_style_color, parse_attributes, read_attr_block};
use super::ParseState;

static EMOJI_SHORTCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r":[A-Za-z0-9_+\-]+:").unwrap());
static STATUS_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Status:\s*([^\]]+)\]").unwrap());
static DATE_ISO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap());
static MEDIA_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(Image|File):\s*([^\]]+)\]").unwrap());

#[derive(Debug, Clone)]
struct PatternMatch {
    kind: PatternKind,
    start: usize,
    end: usize,
    value: String,
    extra: String,
}

#[derive(Debug, Clone, PartialEq)]
enum PatternKind {
    Emoji,
    Status,
    Date,
    Media,
    MentionAt,
    Span,
    Subscript,
    Superscript,
}

impl ParseState<'_> {
    /// Expand patterns across a list of inline nodes.
    pub(crate) fn apply_inline_patterns(&mut self, content: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::new();
        for node in content {
            if node.kind == "text" {
                for expanded in self.expand_text_patterns(node) {
                    append_inline_node(&mut out, expanded);
                }
            } else {
                out.push(node);
            }
        }
        out
    }

    /// Expand one text run. Marked runs only participate in span/subsup
    /// recognition (their marks become the outer marks); plain runs are
    /// scanned for every enabled pattern.
    fn expand_text_patterns(&mut self, node: Node) -> Vec<Node> {
        let text = node.text_value().to_string();
        if text.is_empty() {
            return Vec::new();
        }
        let outer_marks = node.marks.clone();
        let plain = outer_marks.is_empty();

        let mut content = Vec::new();
        let mut remaining = text.as_str();

        while !remaining.is_empty() {
            let found = self.find_next_pattern(remaining, plain);
            let found = match found {
                Some(found) => found,
                None => {
                    append_inline_node(
                        &mut content,
                        new_text_node(remaining, outer_marks.clone()),
                    );
                    break;
                }
            };

            if found.start > 0 {
                append_inline_node(
                    &mut content,
                    new_text_node(&remaining[..found.start], outer_marks.clone()),
                );
            }

            let matched_text = &remaining[found.start..found.end];
            let produced = self.emit_pattern(&found, matched_text, &outer_marks);
            for node in produced {
                append_inline_node(&mut content, node);
            }

            remaining = &remaining[found.end..];
        }

        content
    }

    fn emit_pattern(
        &mut self,
        found: &PatternMatch,
        matched_text: &str,
        outer_marks: &[Mark],
    ) -> Vec<Node> {
        match found.kind {
            PatternKind::Emoji => {
                let mut emoji = Node::bare("emoji");
                emoji.set_attr("shortName", Value::String(found.value.clone()));
                vec![emoji]
            }

            PatternKind::Status => {
                let mut status = Node::bare("status");
                status.set_attr("text", Value::String(found.value.trim().to_string()));
                vec![status]
            }

            PatternKind::Date => {
                let parsed = NaiveDate::parse_from_str(&found.value, &self.config.date_format)
                    .or_else(|_| NaiveDate::parse_from_str(&found.value, "%Y-%m-%d"));
                match parsed {
                    Ok(date) => {
                        let timestamp = date
                            .and_time(chrono::NaiveTime::MIN)
                            .and_utc()
                            .timestamp();
                        let mut node = Node::bare("date");
                        node.set_attr("timestamp", Value::String(timestamp.to_string()));
                        vec![node]
                    }
                    Err(_) => vec![new_text_node(&found.value, outer_marks.to_vec())],
                }
            }

            PatternKind::Media => {
                let media_type = found.value.trim().to_lowercase();
                let id = found.extra.trim();
                if id.is_empty() {
                    return vec![new_text_node(matched_text, outer_marks.to_vec())];
                }
                let mut media = Node::bare("media");
                media.set_attr("type", Value::String(media_type));
                media.set_attr("id", Value::String(id.to_string()));
                vec![Node {
                    kind: "mediaSingle".to_string(),
                    content: vec![media],
                    ..Node::default()
                }]
            }

            PatternKind::MentionAt => vec![mention_with_text(&found.extra, &found.value)],

            PatternKind::Span => self.convert_span_pattern(found, matched_text, outer_marks),

            PatternKind::Subscript => {
                self.convert_sub_sup_pattern(&found.value, "sub", outer_marks)
            }
            PatternKind::Superscript => {
                self.convert_sub_sup_pattern(&found.value, "sup", outer_marks)
            }
        }
    }

    fn find_next_pattern(&self, text: &str, plain: bool) -> Option<PatternMatch> {
        let mut candidates: Vec<PatternMatch> = Vec::new();

        if self.needs_pandoc_spans() {
            if let Some(found) = find_span(text) {
                candidates.push(found);
            }
        }

        if self.config.detect_sub_sup_pandoc() {
            if let Some(found) = find_delimited(text, '~', PatternKind::Subscript) {
                candidates.push(found);
            }
            if let Some(found) = find_delimited(text, '^', PatternKind::Superscript) {
                candidates.push(found);
            }
        }

        if plain {
            if self.config.detect_emoji() {
                if let Some(m) = EMOJI_SHORTCODE.find(text) {
                    candidates.push(PatternMatch {
                        kind: PatternKind::Emoji,
                        start: m.start(),
                        end: m.end(),
                        value: m.as_str().to_string(),
                        extra: String::new(),
                    });
                }
            }

            if self.config.detect_status() {
                if let Some(captures) = STATUS_BRACKET.captures(text) {
                    let whole = captures.get(0).expect("whole match");
                    candidates.push(PatternMatch {
                        kind: PatternKind::Status,
                        start: whole.start(),
                        end: whole.end(),
                        value: captures.get(1).map_or("", |m| m.as_str()).to_string(),
                        extra: String::new(),
                    });
                }
            }

            if self.config.detect_date() {
                if let Some(m) = DATE_ISO.find(text) {
                    candidates.push(PatternMatch {
                        kind: PatternKind::Date,
                        start: m.start(),
                        end: m.end(),
                        value: m.as_str().to_string(),
                        extra: String::new(),
                    });
                }
            }

            if let Some(captures) = MEDIA_PLACEHOLDER.captures(text) {
                let whole = captures.get(0).expect("whole match");
                candidates.push(PatternMatch {
                    kind: PatternKind::Media,
                    start: whole.start(),
                    end: whole.end(),
                    value: captures.get(1).map_or("", |m| m.as_str()).to_string(),
                    extra: captures.get(2).map_or("", |m| m.as_str()).to_string(),
                });
            }

            if self.config.detect_mention_at() {
                if let Some(found) = self.find_mention_registry_match(text) {
                    candidates.push(found);
                }
            }
        }

        candidates.into_iter().min_by(|left, right| {
            left.start
                .cmp(&right.start)
                .then(right.end.cmp(&left.end))
        })
    }

    fn needs_pandoc_spans(&self) -> bool {
        self.config.detect_underline_pandoc()
            || self.config.detect_color_pandoc()
            || self.config.detect_mention_pandoc()
            || self.config.detect_inline_card_pandoc()
    }

    /// Longest registered `@Name` with whitespace/punctuation boundaries.
    fn find_mention_registry_match(&self, text: &str) -> Option<PatternMatch> {
        let mut names: Vec<(&String, &String)> = self
            .config
            .mention_registry
            .iter()
            .filter(|(name, id)| !name.trim().is_empty() && !id.trim().is_empty())
            .collect();
        names.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut best: Option<PatternMatch> = None;
        for (name, id) in names {
            let token = format!("@{}", name.trim());
            let mut search_from = 0;
            while let Some(offset) = text[search_from..].find(&token) {
                let start = search_from + offset;
                let end = start + token.len();
                if is_mention_boundary(text, start, end) {
                    let better = match &best {
                        None => true,
                        Some(current) => {
                            start < current.start
                                || (start == current.start && end > current.end)
                        }
                    };
                    if better {
                        best = Some(PatternMatch {
                            kind: PatternKind::MentionAt,
                            start,
                            end,
                            value: name.trim().to_string(),
                            extra: id.trim().to_string(),
                        });
                    }
                    break;
                }
                search_from = start + 1;
            }
        }

        best
    }

    /// Convert a `[content]{attrs}` span found in a text run.
    fn convert_span_pattern(
        &mut self,
        found: &PatternMatch,
        matched_text: &str,
        outer_marks: &[Mark],
    ) -> Vec<Node> {
        let (classes, attrs) = parse_attributes(&found.extra);
        let content_text = found.value.clone();
        let literal = || vec![new_text_node(matched_text, outer_marks.to_vec())];

        if classes
            .iter()
            .any(|class| !matches!(class.as_str(), "underline" | "mention" | "inline-card"))
            || attrs.keys().any(|key| {
                !matches!(
                    key.as_str(),
                    "mention-id" | "url" | "color" | "background-color" | "style"
                )
            })
        {
            self.warn(
                WarningKind::DroppedFeature,
                "pandocSpan",
                "unsupported pandoc span class or attribute; preserved as text",
            );
            return literal();
        }

        if classes.iter().any(|class| class == "mention") {
            if !self.config.detect_mention_pandoc() {
                return literal();
            }
            let id = attrs.get("mention-id").map(String::as_str).unwrap_or("").trim();
            if id.is_empty() {
                self.warn(
                    WarningKind::MissingAttribute,
                    "pandocSpan",
                    "pandoc mention span missing mention-id",
                );
                return literal();
            }
            return vec![mention_node(id, content_text.trim())];
        }

        if classes.iter().any(|class| class == "inline-card") {
            if !self.config.detect_inline_card_pandoc() {
                return literal();
            }
            let url = attrs.get("url").map(String::as_str).unwrap_or("").trim();
            if url.is_empty() {
                self.warn(
                    WarningKind::MissingAttribute,
                    "pandocSpan",
                    "pandoc inline-card span missing url",
                );
                return literal();
            }

            let display = content_text.trim();
            let mut card = Node::bare("inlineCard");
            card.set_attr("url", Value::String(url.to_string()));
            if !display.is_empty() && display != url {
                let mut data = crate::ast::Attrs::new();
                data.insert("name".to_string(), Value::String(display.to_string()));
                data.insert("url".to_string(), Value::String(url.to_string()));
                card.set_attr("data", Value::Object(data));
            }
            return vec![card];
        }

        let has_underline = classes.iter().any(|class| class == "underline");
        if has_underline && !self.config.detect_underline_pandoc() {
            return literal();
        }

        let style = attrs.get("style").map(String::as_str).unwrap_or("");
        let mut color = attrs.get("color").cloned().unwrap_or_default();
        if color.trim().is_empty() {
            color = extract_style_color(style, "color").unwrap_or_default();
        }
        let mut bg_color = attrs.get("background-color").cloned().unwrap_or_default();
        if bg_color.trim().is_empty() {
            bg_color = extract_style_color(style, "background-color").unwrap_or_default();
        }
        let has_color = !color.trim().is_empty() || !bg_color.trim().is_empty();
        if has_color && !self.config.detect_color_pandoc() {
            return literal();
        }

        let mut span_marks: Vec<Mark> = Vec::new();
        if has_underline {
            span_marks.push(Mark::bare("underline"));
        }
        if !color.trim().is_empty() {
            span_marks.push(Mark::with_attr("textColor", "color", color.trim()));
        }
        if !bg_color.trim().is_empty() {
            span_marks.push(Mark::with_attr("backgroundColor", "color", bg_color.trim()));
        }

        if span_marks.is_empty() {
            self.warn(
                WarningKind::DroppedFeature,
                "pandocSpan",
                "pandoc span attributes were not mapped; preserved as text",
            );
            return literal();
        }

        // Inner patterns still apply to the span content.
        let mut marks = outer_marks.to_vec();
        marks.extend(span_marks);
        let inner = self.expand_text_patterns(new_text_node(content_text, marks));
        inner
    }

    fn convert_sub_sup_pattern(
        &mut self,
        content: &str,
        kind: &str,
        outer_marks: &[Mark],
    ) -> Vec<Node> {
        let mut marks = outer_marks.to_vec();
        marks.push(Mark::with_attr("subsup", "type", kind));
        self.expand_text_patterns(new_text_node(content, marks))
    }
}

/// Both ends of an `@Name` match must touch whitespace or punctuation.
fn is_mention_boundary(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    if start > 0 && !is_boundary_byte(bytes[start - 1]) {
        return false;
    }
    if end < bytes.len() && !is_boundary_byte(bytes[end]) {
        return false;
    }
    true
}

fn is_boundary_byte(ch: u8) -> bool {
    matches!(
        ch,
        b' ' | b'\t'
            | b'\n'
            | b'\r'
            | b'.'
            | b','
            | b'!'
            | b'?'
            | b':'
            | b';'
            | b')'
            | b']'
            | b'}'
            | b'('
            | b'['
            | b'{'
            | b'"'
            | b'\''
    )
}

fn mention_with_text(id: &str, name: &str) -> Node {
    let mut mention = Node::bare("mention");
    mention.set_attr("id", Value::String(id.to_string()));
    mention.set_attr("text", Value::String(name.to_string()));
    mention
}

/// Find a `[content]{attrs}` span: balanced brackets immediately followed
/// by an attribute block on the same line.
fn find_span(text: &str) -> Option<PatternMatch> {
    let bytes = text.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] != b'[' {
            index += 1;
            continue;
        }

        if let Some(closing) = find_balanced_bracket(bytes, index) {
            if closing + 1 < bytes.len() && bytes[closing + 1] == b'{' {
                if let Some((raw_attrs, end)) = read_attr_block(bytes, closing + 1) {
                    return Some(PatternMatch {
                        kind: PatternKind::Span,
                        start: index,
                        end,
                        value: text[index + 1..closing].to_string(),
                        extra: raw_attrs,
                    });
                }
            }
        }

        index += 1;
    }

    None
}

fn find_balanced_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut index = open;
    while index < bytes.len() {
        match bytes[index] {
            b'\n' | b'\r' => return None,
            b'\\' => index += 1,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
        index += 1;
    }
    None
}

/// Find a `~x~` or `^x^` run: single delimiters on the same line with
/// non-empty content; `~~` (strikethrough) never matches.
fn find_delimited(text: &str, delimiter: char, kind: PatternKind) -> Option<PatternMatch> {
    let bytes = text.as_bytes();
    let delim = delimiter as u8;
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] != delim {
            index += 1;
            continue;
        }
        if index + 1 < bytes.len() && bytes[index + 1] == delim {
            index += 2;
            continue;
        }

        let mut closing = None;
        for offset in index + 1..bytes.len() {
            match bytes[offset] {
                b'\n' | b'\r' | b' ' | b'\t' => break,
                value if value == delim => {
                    closing = Some(offset);
                    break;
                }
                _ => {}
            }
        }

        if let Some(closing) = closing {
            if closing > index + 1 {
                return Some(PatternMatch {
                    kind,
                    start: index,
                    end: closing + 1,
                    value: text[index + 1..closing].to_string(),
                    extra: String::new(),
                });
            }
        }

        index += 1;
    }

    None
}
