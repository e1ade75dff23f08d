//! Block-level pre-scan of the markdown source.
//!
//! comrak has no pluggable block parsers, so the two Pandoc block
//! constructs (fenced divs and grid tables) are sliced out of the source
//! before comrak parses the remainder. The scanner is fenced-code aware:
//! a `:::` or `+---+` line inside a code fence stays markdown.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::pandoc::{parse_attributes, read_attr_block};

pub(crate) static GRID_BORDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[=-]+(?:\+[=-]+)+\+$").unwrap());

/// One slice of the source document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    /// Plain markdown handed to comrak.
    Markdown(String),
    /// A `::: { ... }` fenced div with its raw body (nested divs kept
    /// verbatim inside the body for recursive scanning).
    PandocDiv(PandocDiv),
    /// A `+---+` grid table, border and row lines.
    GridTable(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PandocDiv {
    pub(crate) fence_length: usize,
    pub(crate) raw_attrs: String,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) body: String,
}

impl PandocDiv {
    /// The div re-rendered as literal text, for fallback paragraphs.
    pub(crate) fn literal(&self) -> String {
        let mut out = ":".repeat(self.fence_length.max(3));
        out.push('{');
        out.push_str(&self.raw_attrs);
        out.push_str("}\n");
        if !self.body.is_empty() {
            out.push_str(&self.body);
            out.push('\n');
        }
        out.push_str(":::");
        out
    }
}

/// Split the source into markdown runs and Pandoc block constructs.
/// `divs` / `grids` toggle each recognizer; when both are off the whole
/// source is a single markdown segment.
pub(crate) fn scan_segments(source: &str, divs: bool, grids: bool) -> Vec<Segment> {
    let lines: Vec<&str> = source.lines().collect();
    let mut segments = Vec::new();
    let mut markdown: Vec<&str> = Vec::new();
    let mut in_code_fence: Option<(char, usize)> = None;

    let mut index = 0;
    while index < lines.len() {
        let line = lines[index];
        let trimmed = line.trim_start();

        if let Some((fence_char, fence_len)) = in_code_fence {
            markdown.push(line);
            if is_code_fence_close(trimmed, fence_char, fence_len) {
                in_code_fence = None;
            }
            index += 1;
            continue;
        }

        if let Some(open) = code_fence_open(trimmed) {
            in_code_fence = Some(open);
            markdown.push(line);
            index += 1;
            continue;
        }

        if divs {
            if let Some((div, consumed)) = scan_div(&lines[index..]) {
                flush_markdown(&mut segments, &mut markdown);
                segments.push(Segment::PandocDiv(div));
                index += consumed;
                continue;
            }
        }

        if grids && GRID_BORDER.is_match(trimmed) {
            flush_markdown(&mut segments, &mut markdown);
            let mut grid_lines = vec![trimmed.to_string()];
            index += 1;
            while index < lines.len() {
                let row = lines[index].trim_start();
                if row.starts_with('|') || row.starts_with('+') {
                    grid_lines.push(row.trim_end().to_string());
                    index += 1;
                } else {
                    break;
                }
            }
            segments.push(Segment::GridTable(grid_lines));
            continue;
        }

        markdown.push(line);
        index += 1;
    }

    flush_markdown(&mut segments, &mut markdown);
    segments
}

/// Try to read a fenced div starting at `lines[0]`. Returns the div and
/// the number of lines consumed. Nested opening fences deepen the close
/// requirement; an unterminated div swallows the rest of the input.
fn scan_div(lines: &[&str]) -> Option<(PandocDiv, usize)> {
    let trimmed = lines[0].trim_start();
    if !trimmed.starts_with(":::") {
        return None;
    }

    let fence_length = leading_run(trimmed, ':');
    if fence_length < 3 {
        return None;
    }

    let rest = trimmed[fence_length..].trim();
    if !rest.starts_with('{') {
        return None;
    }
    let (raw_attrs, end) = read_attr_block(rest.as_bytes(), 0)?;
    if !rest[end..].trim().is_empty() {
        return None;
    }

    let (classes, attrs) = parse_attributes(&raw_attrs);

    let mut body_lines: Vec<&str> = Vec::new();
    let mut open_depth = 1usize;
    let mut consumed = 1;

    for line in &lines[1..] {
        consumed += 1;
        let inner = line.trim_start();

        if is_div_opening_fence(inner) {
            open_depth += 1;
            body_lines.push(line);
            continue;
        }
        if is_div_closing_fence(inner) {
            open_depth -= 1;
            if open_depth == 0 {
                break;
            }
            body_lines.push(line);
            continue;
        }

        body_lines.push(line);
    }

    Some((
        PandocDiv {
            fence_length,
            raw_attrs,
            classes,
            attrs,
            body: body_lines.join("\n"),
        },
        consumed,
    ))
}

fn flush_markdown(segments: &mut Vec<Segment>, markdown: &mut Vec<&str>) {
    if markdown.iter().all(|line| line.trim().is_empty()) {
        markdown.clear();
        return;
    }
    segments.push(Segment::Markdown(markdown.join("\n")));
    markdown.clear();
}

fn is_div_opening_fence(line: &str) -> bool {
    if !line.starts_with(":::") {
        return false;
    }
    let fence_length = leading_run(line, ':');
    let rest = line[fence_length..].trim();
    if !rest.starts_with('{') {
        return false;
    }
    match read_attr_block(rest.as_bytes(), 0) {
        Some((_, end)) => rest[end..].trim().is_empty(),
        None => false,
    }
}

/// Any line of three or more colons with nothing after closes the
/// innermost open div.
fn is_div_closing_fence(line: &str) -> bool {
    if !line.starts_with(":::") {
        return false;
    }
    let fence_length = leading_run(line, ':');
    line[fence_length..].trim().is_empty()
}

fn code_fence_open(line: &str) -> Option<(char, usize)> {
    for fence_char in ['`', '~'] {
        let run = leading_run(line, fence_char);
        if run >= 3 {
            return Some((fence_char, run));
        }
    }
    None
}

fn is_code_fence_close(line: &str, fence_char: char, fence_len: usize) -> bool {
    let run = leading_run(line, fence_char);
    run >= fence_len && line[run..].trim().is_empty()
}

fn leading_run(line: &str, target: char) -> usize {
    line.chars().take_while(|ch| *ch == target).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_markdown_is_one_segment() {
        let segments = scan_segments("# Title\n\nBody\n", true, true);
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Markdown(text) if text.contains("# Title")));
    }

    #[test]
    fn fenced_div_is_sliced_out() {
        let source = "before\n\n:::{ .details summary=\"More\" }\n\nhidden\n\n:::\n\nafter\n";
        let segments = scan_segments(source, true, false);
        assert_eq!(segments.len(), 3);
        match &segments[1] {
            Segment::PandocDiv(div) => {
                assert_eq!(div.classes, vec!["details"]);
                assert_eq!(div.attrs.get("summary").unwrap(), "More");
                assert_eq!(div.body.trim(), "hidden");
            }
            other => panic!("expected div segment, got {other:?}"),
        }
    }

    #[test]
    fn nested_divs_stay_in_the_body() {
        let source = ":::{ .details }\n:::{ .details summary=\"inner\" }\ndeep\n:::\n:::\n";
        let segments = scan_segments(source, true, false);
        assert_eq!(segments.len(), 1);
        match &segments[0] {
            Segment::PandocDiv(div) => {
                assert!(div.body.contains(":::{ .details summary=\"inner\" }"));
                assert!(div.body.contains("deep"));
            }
            other => panic!("expected div segment, got {other:?}"),
        }
    }

    #[test]
    fn fences_inside_code_blocks_are_ignored() {
        let source = "```\n:::{ .details }\n+---+---+\n```\n";
        let segments = scan_segments(source, true, true);
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Markdown(_)));
    }

    #[test]
    fn grid_table_lines_are_collected() {
        let source = "+---+---+\n| a | b |\n+===+===+\n| c | d |\n+---+---+\n\ntext\n";
        let segments = scan_segments(source, false, true);
        assert_eq!(segments.len(), 2);
        match &segments[0] {
            Segment::GridTable(lines) => assert_eq!(lines.len(), 5),
            other => panic!("expected grid segment, got {other:?}"),
        }
    }

    #[test]
    fn disabled_recognizers_leave_source_untouched() {
        let source = ":::{ .details }\nx\n:::\n";
        let segments = scan_segments(source, false, false);
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Markdown(_)));
    }

    #[test]
    fn div_literal_round_trips_shape() {
        let segments = scan_segments(":::{ .mystery }\nbody\n:::\n", true, false);
        match &segments[0] {
            Segment::PandocDiv(div) => {
                assert_eq!(div.literal(), ":::{ .mystery }\nbody\n:::");
            }
            other => panic!("expected div segment, got {other:?}"),
        }
    }
}
