//! Markdown → ADF engine
//!
//! Reconstructs the rich document tree from GFM, recognising the shapes
//! the serializer emits (callouts, bold-prefixed blockquotes, HTML tags,
//! Pandoc fenced divs, attribute spans, grid tables) and turning them back
//! into semantically rich nodes.
//!
//! Parser stack:
//!
//! ```text
//! source ──segment pre-scan──▶ markdown runs + pandoc divs/grids
//!        ──comrak──▶ AST ──block walker──▶ per-kind converters
//!        ──detectors──▶ panels/decisions/expands
//!        ──inline patterns──▶ emoji/status/date/media/mentions/spans
//! ```
//!
//! comrak has no pluggable block parsers, so the Pandoc block constructs
//! are sliced out of the source up front (see `segment.rs`); everything
//! else rides on the comrak AST the way the other formats in this
//! workspace do.

mod blocks;
pub mod config;
mod detectors;
mod extensions;
mod grid_table;
mod hooks_runtime;
mod html_blocks;
mod html_inline;
mod inline;
mod lists;
mod mark_stack;
mod pandoc;
mod pandoc_div;
mod patterns;
mod segment;
mod tables;
mod walker;

use comrak::nodes::AstNode;
use comrak::{Arena, ComrakOptions};

use crate::ast::{Doc, Node};
use crate::cancel::CancelToken;
use crate::error::ConvertError;
use crate::result::{ParseResult, Warning, WarningKind};

pub use config::ReverseConfig;

use mark_stack::{append_inline_node, MarkStack};
use segment::{scan_segments, Segment};

/// Per-call options for a reverse conversion.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Logical path of the source document, forwarded to hooks.
    pub source_path: String,
}

/// What an opening `<span ...>` introduced, so the matching `</span>`
/// closes the right mark or pops the right mention id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpanKind {
    Mention,
    TextColor,
    BackgroundColor,
    Unknown,
}

/// Converts GFM markdown to ADF JSON documents.
///
/// Immutable after construction and safe to share across threads; every
/// call allocates a fresh per-conversion state.
pub struct MarkdownParser {
    config: ReverseConfig,
}

impl MarkdownParser {
    /// Validate the config and build a parser around a frozen copy.
    pub fn new(config: ReverseConfig) -> Result<Self, ConvertError> {
        config.validate()?;
        Ok(MarkdownParser { config })
    }

    /// Convert markdown to ADF JSON with default options.
    pub fn parse(&self, markdown: &str) -> Result<ParseResult, ConvertError> {
        self.parse_with(markdown, &CancelToken::new(), ParseOptions::default())
    }

    /// Convert markdown to ADF JSON.
    ///
    /// On cancellation no output is returned and accumulated warnings are
    /// discarded.
    pub fn parse_with(
        &self,
        markdown: &str,
        cancel: &CancelToken,
        options: ParseOptions,
    ) -> Result<ParseResult, ConvertError> {
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }

        let mut state = ParseState {
            config: &self.config,
            cancel,
            options: &options,
            warnings: Vec::new(),
            html_mention_stack: Vec::new(),
            html_span_stack: Vec::new(),
            pandoc_expand_depth: 0,
            html_expand_depth: 0,
        };

        let content = state.convert_source(markdown)?;
        state.check_cancelled()?;

        let doc = Doc {
            version: 1,
            kind: "doc".to_string(),
            content,
        };
        let adf = serde_json::to_vec(&doc)
            .map_err(|err| ConvertError::Parse(format!("failed to serialize ADF JSON: {err}")))?;

        Ok(ParseResult {
            adf,
            warnings: state.warnings,
        })
    }
}

pub(crate) struct ParseState<'a> {
    pub(crate) config: &'a ReverseConfig,
    pub(crate) cancel: &'a CancelToken,
    pub(crate) options: &'a ParseOptions,
    pub(crate) warnings: Vec<Warning>,
    /// Mention ids opened by `<span data-mention-id>` and not yet closed.
    pub(crate) html_mention_stack: Vec<String>,
    /// What each open `<span>` introduced.
    pub(crate) html_span_stack: Vec<SpanKind>,
    pub(crate) pandoc_expand_depth: usize,
    pub(crate) html_expand_depth: usize,
}

impl ParseState<'_> {
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

    /// Convert a full source document: segment, parse each markdown run
    /// with comrak, convert Pandoc segments directly, then apply the
    /// inline-block wrap/merge rule across the emitted block list.
    pub(crate) fn convert_source(&mut self, source: &str) -> Result<Vec<Node>, ConvertError> {
        self.check_cancelled()?;

        let segments = scan_segments(
            source,
            self.needs_pandoc_blocks(),
            self.config.table_grid_detection,
        );

        let mut blocks = Vec::new();
        for segment in &segments {
            self.check_cancelled()?;
            match segment {
                Segment::Markdown(text) => {
                    blocks.extend(self.convert_markdown_segment(text)?);
                }
                Segment::PandocDiv(div) => {
                    if let Some(node) = self.convert_pandoc_div(div)? {
                        blocks.push(node);
                    }
                }
                Segment::GridTable(lines) => {
                    if let Some(node) = self.convert_grid_table(lines)? {
                        blocks.push(node);
                    }
                }
            }
        }

        Ok(self.finalize_blocks(blocks))
    }

    fn needs_pandoc_blocks(&self) -> bool {
        self.config.detect_expand_pandoc()
            || self.config.detect_align_pandoc()
            || self.config.detect_bodied_extension_pandoc()
            || !self.config.extension_handlers.is_empty()
    }

    fn convert_markdown_segment(&mut self, text: &str) -> Result<Vec<Node>, ConvertError> {
        let arena = Arena::new();
        let root = comrak::parse_document(&arena, text, &comrak_options());
        self.check_cancelled()?;

        let children: Vec<&AstNode<'_>> = root.children().collect();
        self.convert_sequence(&children)
    }

    /// Parse a fragment as block content through the full pipeline.
    pub(crate) fn convert_block_fragment(
        &mut self,
        fragment: &str,
    ) -> Result<Vec<Node>, ConvertError> {
        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let saved_mentions = std::mem::take(&mut self.html_mention_stack);
        let saved_spans = std::mem::take(&mut self.html_span_stack);
        let result = self.convert_source(trimmed);
        self.html_mention_stack = saved_mentions;
        self.html_span_stack = saved_spans;
        result
    }

    /// Parse a fragment and keep only its inline content (paragraph and
    /// text-block children flattened together).
    pub(crate) fn convert_inline_fragment(
        &mut self,
        fragment: &str,
    ) -> Result<Vec<Node>, ConvertError> {
        self.check_cancelled()?;

        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let saved_mentions = std::mem::take(&mut self.html_mention_stack);
        let saved_spans = std::mem::take(&mut self.html_span_stack);

        let arena = Arena::new();
        let root = comrak::parse_document(&arena, trimmed, &comrak_options());

        let mut result = Ok(Vec::new());
        for child in root.children() {
            let is_paragraph =
                matches!(child.data.borrow().value, comrak::nodes::NodeValue::Paragraph);
            if !is_paragraph {
                continue;
            }
            match self.convert_inline_children(child, &mut MarkStack::new()) {
                Ok(inline) => {
                    let content = result.as_mut().expect("result is ok until first error");
                    for node in inline {
                        append_inline_node(content, node);
                    }
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        self.html_mention_stack = saved_mentions;
        self.html_span_stack = saved_spans;

        result
    }
}

/// Inline-kind nodes that a block-level converter may produce.
pub(crate) fn is_inline_block_kind(kind: &str) -> bool {
    matches!(
        kind,
        "inlineCard" | "inlineExtension" | "mention" | "emoji" | "status" | "date"
    )
}

/// GFM options shared by every comrak invocation in this engine.
pub(crate) fn comrak_options() -> ComrakOptions {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}
