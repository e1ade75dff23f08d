//! Inline content rendering: mark continuity across adjacent text runs and
//! the leaf inline nodes (emoji, mention, status, date, inline card).

use chrono::{TimeZone, Utc};

use crate::ast::{Mark, Node};
use crate::config::{EmojiStyle, InlineCardStyle, MentionStyle, StatusStyle, UnknownPolicy};
use crate::error::ConvertError;
use crate::hooks::{link_metadata_from_attrs, LinkRenderInput, LinkSource};
use crate::result::WarningKind;

use super::{escape_html, RenderState};

/// Above this value a timestamp is taken as milliseconds. The cutoff is
/// year 2286 in seconds; it misreads post-2286 second timestamps and
/// pre-Nov-1970 millisecond timestamps, matching the recorded behaviour of
/// the wire format's producers.
const MILLISECOND_CUTOFF: i64 = 10_000_000_000;

impl RenderState<'_> {
    /// Render an ordered list of inline children, keeping an active-marks
    /// stack so a contiguous run of equally-marked text children is wrapped
    /// in a single pair of delimiters.
    pub(crate) fn render_inline_content(&mut self, content: &[Node]) -> Result<String, ConvertError> {
        let mut out = String::new();
        let mut active_marks: Vec<Mark> = Vec::new();

        // When any run carries both strong and em, italic switches to `_`
        // so the delimiters stay unambiguous next to `**`.
        let use_underscore_for_em = has_strong_and_em(content);

        for node in content {
            self.check_cancelled()?;

            if node.kind != "text" {
                // Non-text child: close everything, render it, start fresh.
                self.close_marks(&active_marks, use_underscore_for_em, &mut out)?;
                let rendered = self.render_node(node)?;
                if starts_with_fence(&rendered) {
                    ensure_fence_line_start(&mut out);
                }
                out.push_str(&rendered);
                active_marks.clear();
                continue;
            }

            // Filter marks per the unknown-mark policy.
            let mut current_marks: Vec<Mark> = Vec::with_capacity(node.marks.len());
            let mut unknown_placeholder = String::new();
            for mark in &node.marks {
                if is_known_mark(&mark.kind) {
                    current_marks.push(mark.clone());
                    continue;
                }
                match self.config.unknown_marks {
                    UnknownPolicy::Error => {
                        return Err(ConvertError::UnknownMark(mark.kind.clone()));
                    }
                    UnknownPolicy::Skip => {
                        self.warn(
                            WarningKind::UnknownMark,
                            &mark.kind,
                            format!("unknown mark skipped: {}", mark.kind),
                        );
                    }
                    UnknownPolicy::Placeholder => {
                        self.warn(
                            WarningKind::UnknownMark,
                            &mark.kind,
                            format!("unknown mark rendered as placeholder: {}", mark.kind),
                        );
                        unknown_placeholder.push_str(&format!("[Unknown mark: {}]", mark.kind));
                    }
                }
            }

            // Whitespace-only runs keep only already-active marks so
            // delimiters never open on a space.
            let text = node.text_value();
            let effective_marks = if text.trim().is_empty() {
                self.intersect_marks(&active_marks, &current_marks)
            } else {
                current_marks
            };

            let to_close = self.marks_to_close(&active_marks, &effective_marks).to_vec();
            let to_open = self.marks_to_open(&active_marks, &effective_marks).to_vec();

            self.close_marks(&to_close, use_underscore_for_em, &mut out)?;
            for mark in &to_open {
                let opening = self.opening_delimiter(mark, use_underscore_for_em)?;
                out.push_str(&opening);
            }

            if !unknown_placeholder.is_empty() {
                out.push_str(&unknown_placeholder);
            }
            out.push_str(text);

            active_marks = effective_marks;
        }

        self.close_marks(&active_marks, use_underscore_for_em, &mut out)?;
        Ok(out)
    }

    /// Close marks in reverse order.
    fn close_marks(
        &mut self,
        marks: &[Mark],
        use_underscore_for_em: bool,
        out: &mut String,
    ) -> Result<(), ConvertError> {
        for mark in marks.iter().rev() {
            let closing = self.closing_delimiter(mark, use_underscore_for_em)?;
            out.push_str(&closing);
        }
        Ok(())
    }

    pub(crate) fn render_emoji(&mut self, node: &Node) -> Result<String, ConvertError> {
        let short_name = node.str_attr("shortName", "");
        let fallback = node.str_attr("fallback", "");

        let picked = match self.config.emoji_style {
            EmojiStyle::Unicode => [fallback, short_name],
            EmojiStyle::Shortcode => [short_name, fallback],
        }
        .into_iter()
        .find(|value| !value.is_empty());

        if let Some(value) = picked {
            return Ok(value.to_string());
        }

        if self.config.unknown_nodes == UnknownPolicy::Error {
            return Err(ConvertError::Parse(
                "emoji node missing shortName and fallback".to_string(),
            ));
        }
        self.warn(
            WarningKind::MissingAttribute,
            &node.kind,
            "emoji node missing shortName and fallback",
        );
        Ok(String::new())
    }

    pub(crate) fn render_mention(&mut self, node: &Node) -> Result<String, ConvertError> {
        let id = node.str_attr("id", "").to_string();
        let raw_text = node.str_attr("text", "");
        let display = if raw_text.is_empty() {
            "Unknown User"
        } else {
            raw_text
        };
        let mention_text = if !raw_text.is_empty() && !display.starts_with('@') {
            format!("@{display}")
        } else {
            display.to_string()
        };

        match self.config.mention_style {
            MentionStyle::Text => Ok(mention_text),
            MentionStyle::Link => {
                if id.is_empty() {
                    self.warn(
                        WarningKind::MissingAttribute,
                        &node.kind,
                        "mention node missing id",
                    );
                    return Ok(mention_text);
                }

                let mut href = format!("mention:{id}");
                let input = LinkRenderInput {
                    source: LinkSource::Mark,
                    source_path: self.options.source_path.clone(),
                    href: href.clone(),
                    title: String::new(),
                    text: mention_text.clone(),
                    meta: link_metadata_from_attrs(node.attrs.as_ref(), &href),
                    attrs: node.attrs.clone(),
                };
                if let Some(output) = self.apply_link_render_hook(&node.kind, input)? {
                    if output.text_only {
                        return Ok(mention_text);
                    }
                    href = output.href;
                }

                Ok(format!("[{mention_text}]({href})"))
            }
            MentionStyle::Html => {
                if id.is_empty() {
                    self.warn(
                        WarningKind::MissingAttribute,
                        &node.kind,
                        "mention node missing id",
                    );
                    return Ok(mention_text);
                }
                Ok(format!(
                    "<span data-mention-id=\"{}\">{}</span>",
                    escape_html(&id),
                    escape_html(&mention_text)
                ))
            }
            MentionStyle::Pandoc => {
                if id.is_empty() {
                    self.warn(
                        WarningKind::MissingAttribute,
                        &node.kind,
                        "mention node missing id",
                    );
                    return Ok(mention_text);
                }
                Ok(format!("[{mention_text}]{{.mention mention-id=\"{id}\"}}"))
            }
        }
    }

    pub(crate) fn render_status(&self, node: &Node) -> String {
        let text = node.str_attr("text", "Unknown");
        match self.config.status_style {
            StatusStyle::Text => text.to_string(),
            StatusStyle::Bracket => format!("[Status: {text}]"),
        }
    }

    pub(crate) fn render_date(&mut self, node: &Node) -> Result<String, ConvertError> {
        let timestamp = node.str_attr("timestamp", "").trim().to_string();

        let parsed = if timestamp.is_empty() {
            None
        } else {
            timestamp.parse::<i64>().ok()
        };
        let raw = match parsed {
            Some(value) => value,
            None => {
                if self.config.unknown_nodes == UnknownPolicy::Error {
                    return Err(ConvertError::Parse(format!(
                        "date node missing or invalid timestamp: {timestamp:?}"
                    )));
                }
                self.warn(
                    WarningKind::MissingAttribute,
                    &node.kind,
                    format!("date node missing or invalid timestamp: {timestamp:?}"),
                );
                return Ok("[Date: invalid]".to_string());
            }
        };

        let seconds = if raw > MILLISECOND_CUTOFF {
            raw / 1000
        } else {
            raw
        };

        let datetime = match Utc.timestamp_opt(seconds, 0) {
            chrono::LocalResult::Single(datetime) => datetime,
            _ => {
                if self.config.unknown_nodes == UnknownPolicy::Error {
                    return Err(ConvertError::Parse(format!(
                        "date node timestamp out of range: {raw}"
                    )));
                }
                self.warn(
                    WarningKind::MissingAttribute,
                    &node.kind,
                    format!("date node timestamp out of range: {raw}"),
                );
                return Ok("[Date: invalid]".to_string());
            }
        };

        Ok(datetime.format(&self.config.date_format).to_string())
    }

    pub(crate) fn render_inline_card(&mut self, node: &Node) -> Result<String, ConvertError> {
        let (mut title, mut url) = inline_card_link_data(node);
        let mut hook_handled = false;

        let input = LinkRenderInput {
            source: LinkSource::InlineCard,
            source_path: self.options.source_path.clone(),
            href: url.clone(),
            title: title.clone(),
            text: title.clone(),
            meta: link_metadata_from_attrs(node.attrs.as_ref(), &url),
            attrs: node.attrs.clone(),
        };
        if let Some(output) = self.apply_link_render_hook(&node.kind, input)? {
            hook_handled = true;
            if output.text_only {
                let text_value =
                    first_non_empty(&[output.title.as_str(), title.as_str(), url.as_str()]);
                if let Some(value) = text_value {
                    return Ok(value);
                }
                return self.inline_card_fallback(node);
            }
            title = output.title;
            url = output.href;
        }

        match self.config.inline_card_style {
            InlineCardStyle::Url => {
                if !url.is_empty() {
                    return Ok(url);
                }
            }
            InlineCardStyle::Embed => {
                let attrs = if hook_handled {
                    rewrite_inline_card_attrs(node.attrs.clone(), &title, &url)
                } else {
                    node.attrs.clone()
                };
                if let Some(attrs) = attrs {
                    if !attrs.is_empty() {
                        let data = serde_json::to_string_pretty(&attrs).map_err(|err| {
                            ConvertError::Parse(format!(
                                "failed to serialize inlineCard attrs: {err}"
                            ))
                        })?;
                        return Ok(format!("```adf:inlineCard\n{data}\n```\n\n"));
                    }
                }
            }
            InlineCardStyle::Link => {
                if !url.is_empty() {
                    let label = if title.is_empty() { url.clone() } else { title };
                    return Ok(format!("[{label}]({url})"));
                }
                if !title.is_empty() {
                    return Ok(title);
                }
            }
            InlineCardStyle::Pandoc => {
                if !url.is_empty() {
                    let label = if title.is_empty() { url.clone() } else { title };
                    return Ok(format!("[{label}]{{.inline-card url=\"{url}\"}}"));
                }
            }
        }

        self.inline_card_fallback(node)
    }

    fn inline_card_fallback(&mut self, node: &Node) -> Result<String, ConvertError> {
        if self.config.unknown_nodes == UnknownPolicy::Error {
            return Err(ConvertError::Parse(
                "inlineCard missing url and valid data".to_string(),
            ));
        }
        self.warn(
            WarningKind::MissingAttribute,
            &node.kind,
            "inlineCard missing url and valid data",
        );
        Ok("[Smart Link]".to_string())
    }
}

fn has_strong_and_em(content: &[Node]) -> bool {
    content.iter().any(|node| {
        node.kind == "text"
            && node.marks.iter().any(|mark| mark.kind == "strong")
            && node.marks.iter().any(|mark| mark.kind == "em")
    })
}

pub(crate) fn is_known_mark(kind: &str) -> bool {
    matches!(
        kind,
        "strong"
            | "em"
            | "strike"
            | "code"
            | "underline"
            | "link"
            | "subsup"
            | "textColor"
            | "backgroundColor"
    )
}

fn starts_with_fence(value: &str) -> bool {
    value.trim_start_matches('\n').starts_with("```")
}

fn ensure_fence_line_start(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Title and url for an inline card from `attrs.url` and `attrs.data`.
fn inline_card_link_data(node: &Node) -> (String, String) {
    let mut url = node.str_attr("url", "").to_string();
    let mut title = if url.is_empty() {
        String::new()
    } else {
        url.clone()
    };

    let data = node
        .attrs
        .as_ref()
        .and_then(|attrs| attrs.get("data"))
        .and_then(|value| value.as_object());
    if let Some(data) = data {
        if let Some(name) = data.get("name").and_then(|value| value.as_str()) {
            if !name.is_empty() {
                title = name.to_string();
            }
        }
        if let Some(data_url) = data.get("url").and_then(|value| value.as_str()) {
            if !data_url.is_empty() {
                url = data_url.to_string();
                if title.is_empty() {
                    title = data_url.to_string();
                }
            }
        }
    }

    (title, url)
}

fn rewrite_inline_card_attrs(
    attrs: Option<crate::ast::Attrs>,
    title: &str,
    href: &str,
) -> Option<crate::ast::Attrs> {
    let mut rewritten = attrs.unwrap_or_default();
    let href = href.trim();
    let title = title.trim();

    if !href.is_empty() {
        rewritten.insert("url".to_string(), serde_json::Value::String(href.to_string()));
    }

    if let Some(serde_json::Value::Object(data)) = rewritten.get_mut("data") {
        if !href.is_empty() {
            data.insert("url".to_string(), serde_json::Value::String(href.to_string()));
        }
        if !title.is_empty() {
            data.insert(
                "name".to_string(),
                serde_json::Value::String(title.to_string()),
            );
        }
    }

    Some(rewritten)
}

fn first_non_empty(values: &[&str]) -> Option<String> {
    values
        .iter()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(|value| value.to_string())
}
