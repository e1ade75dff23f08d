//! ADF → Markdown engine
//!
//! A recursive pre-order traversal over the node tree. Each node kind has a
//! renderer that emits markdown text directly; inline runs go through the
//! mark-continuity engine in `inline.rs` so adjacent text children sharing
//! marks are wrapped in a single pair of delimiters.
//!
//! Emission is hand-built rather than delegated to a markdown serializer:
//! the strategy matrix (panels, expands, tables, colors, ...) needs exact
//! control over delimiters, quoting, indentation and pipe escaping.
//!
//! Block renderers end their output with `"\n\n"`; the document renderer
//! right-trims and leaves exactly one trailing newline.

mod blocks;
mod extensions;
mod hook_runtime;
mod inline;
mod lists;
mod marks;
mod media;
mod tables;

use std::collections::HashMap;

use crate::ast::{Doc, Node};
use crate::cancel::CancelToken;
use crate::config::{Config, UnknownPolicy};
use crate::error::ConvertError;
use crate::result::{RenderResult, Warning, WarningKind};

pub(crate) use hook_runtime::CachedLink;

/// Per-call options for a forward conversion.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Logical path of the source document, forwarded to hooks.
    pub source_path: String,
}

/// Converts ADF JSON documents to GFM markdown.
///
/// Immutable after construction and safe to share across threads; every
/// call allocates a fresh per-conversion state.
pub struct MarkdownSerializer {
    config: Config,
}

impl MarkdownSerializer {
    /// Validate the config and build a serializer around a frozen copy.
    pub fn new(config: Config) -> Result<Self, ConvertError> {
        config.validate()?;
        Ok(MarkdownSerializer { config })
    }

    /// Convert an ADF JSON document to markdown with default options.
    pub fn serialize(&self, input: &[u8]) -> Result<RenderResult, ConvertError> {
        self.serialize_with(input, &CancelToken::new(), RenderOptions::default())
    }

    /// Convert an ADF JSON document to markdown.
    ///
    /// On cancellation no output is returned and accumulated warnings are
    /// discarded.
    pub fn serialize_with(
        &self,
        input: &[u8],
        cancel: &CancelToken,
        options: RenderOptions,
    ) -> Result<RenderResult, ConvertError> {
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }

        let doc: Doc = serde_json::from_slice(input)
            .map_err(|err| ConvertError::Parse(format!("failed to parse ADF JSON: {err}")))?;
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }

        let mut state = RenderState {
            config: &self.config,
            cancel,
            options: &options,
            warnings: Vec::new(),
            link_cache: HashMap::new(),
        };

        let root = Node {
            kind: doc.kind,
            content: doc.content,
            ..Node::default()
        };
        let markdown = state.render_node(&root)?;
        state.check_cancelled()?;

        Ok(RenderResult {
            markdown,
            warnings: state.warnings,
        })
    }
}

/// Everything one conversion needs; dropped when the call returns.
pub(crate) struct RenderState<'a> {
    pub(crate) config: &'a Config,
    pub(crate) cancel: &'a CancelToken,
    pub(crate) options: &'a RenderOptions,
    pub(crate) warnings: Vec<Warning>,
    /// Link-hook resolutions, keyed by the mark's identity attributes so a
    /// hook runs once per distinct link within a conversion.
    pub(crate) link_cache: HashMap<(String, String), CachedLink>,
}

impl RenderState<'_> {
    pub(crate) fn check_cancelled(&self) -> Result<(), ConvertError> {
        if self.cancel.is_cancelled() {
            Err(ConvertError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn warn(&mut self, kind: WarningKind, node_type: &str, message: impl Into<String>) {
        self.warnings.push(Warning::new(kind, node_type, message));
    }

    pub(crate) fn render_node(&mut self, node: &Node) -> Result<String, ConvertError> {
        self.check_cancelled()?;

        match node.kind.as_str() {
            "doc" => self.render_doc(node),
            "paragraph" => self.render_paragraph(node),
            "heading" => self.render_heading(node),
            "blockquote" => self.render_blockquote(node),
            "rule" => Ok("---\n\n".to_string()),
            "hardBreak" => Ok(self.render_hard_break()),
            "codeBlock" => self.render_code_block(node),
            "bulletList" => self.render_bullet_list(node),
            "orderedList" => self.render_ordered_list(node),
            "taskList" => self.render_task_list(node),
            "taskItem" => self.render_task_item(node),
            "listItem" => self.render_list_item_content(&node.content),
            "text" => Ok(node.text_value().to_string()),
            "emoji" => self.render_emoji(node),
            "mention" => self.render_mention(node),
            "status" => Ok(self.render_status(node)),
            "date" => self.render_date(node),
            "inlineCard" => self.render_inline_card(node),
            "table" => self.render_table(node),
            // Rows are consumed by the table renderer, never standalone.
            "tableRow" => Ok(String::new()),
            "tableHeader" | "tableCell" => self.render_cell_content(node),
            "panel" => self.render_panel(node),
            "expand" | "nestedExpand" => self.render_expand(node),
            "layoutSection" => self.render_layout_section(node),
            "layoutColumn" => self.render_layout_column(node),
            "mediaSingle" => self.render_media_single(node),
            "mediaGroup" => self.render_media_group(node),
            "media" => self.render_media(node),
            "decisionList" => self.render_decision_list(node),
            "decisionItem" => self.render_decision_item_content(node),
            "extension" | "inlineExtension" | "bodiedExtension" => self.render_extension(node),
            other => match self.config.unknown_nodes {
                UnknownPolicy::Error => Err(ConvertError::UnknownNode(other.to_string())),
                UnknownPolicy::Skip => {
                    self.warn(
                        WarningKind::UnknownNode,
                        other,
                        format!("unknown node skipped: {other}"),
                    );
                    Ok(String::new())
                }
                UnknownPolicy::Placeholder => {
                    self.warn(
                        WarningKind::UnknownNode,
                        other,
                        format!("unknown node rendered as placeholder: {other}"),
                    );
                    Ok(format!("[Unknown node: {other}]"))
                }
            },
        }
    }

    /// Render a slice of nodes and concatenate their results.
    pub(crate) fn render_children(&mut self, content: &[Node]) -> Result<String, ConvertError> {
        let mut out = String::new();
        for child in content {
            self.check_cancelled()?;
            out.push_str(&self.render_node(child)?);
        }
        Ok(out)
    }

    fn render_doc(&mut self, node: &Node) -> Result<String, ConvertError> {
        let rendered = self.render_children(&node.content)?;
        let trimmed = rendered.trim_end_matches('\n');
        if trimmed.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("{trimmed}\n"))
        }
    }
}

/// Minimal HTML escaping for attribute and text positions we emit.
pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
