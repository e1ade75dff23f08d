//! HTML block handling: the paired-tag patterns the walker looks ahead
//! for, the aligned heading/paragraph shorthands and embedded `<table>`
//! reconstruction through html5ever.

use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::ParseState;

static DETAILS_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^<details>\s*<summary>(.*?)</summary>\s*$").unwrap());
static DETAILS_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^</details>\s*$").unwrap());
static ALIGNED_DIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^<div\s+align="(left|center|right)"\s*>(.*?)</div>\s*$"#).unwrap()
});
static ALIGNED_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^<h([1-6])\s+align="(left|center|right)"\s*>(.*?)</h[1-6]>\s*$"#).unwrap()
});
static LAYOUT_SECTION_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)^<div\s+class="layout-section"\s*>\s*$"#).unwrap());
static LAYOUT_COLUMN_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^<div\s+class="layout-column"(?:\s+style="width:\s*([0-9.]+)%;")?\s*>\s*$"#)
        .unwrap()
});
static BODIED_EXTENSION_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^<div\s+class="adf-bodied-extension"([^>]*)>\s*$"#).unwrap()
});
static DIV_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^</div>\s*$").unwrap());
static DATA_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bdata-([a-z-]+)\s*=\s*"([^"]*)""#).unwrap());

/// Title of a `<details><summary>…</summary>` opening block.
pub(crate) fn details_open_title(raw: &str) -> Option<String> {
    let captures = DETAILS_OPEN.captures(raw.trim())?;
    Some(unescape_html(captures.get(1).map_or("", |m| m.as_str()).trim()))
}

pub(crate) fn details_close(raw: &str) -> bool {
    DETAILS_CLOSE.is_match(raw.trim())
}

pub(crate) fn layout_section_open(raw: &str) -> bool {
    LAYOUT_SECTION_OPEN.is_match(raw.trim())
}

/// Width attribute of a layout column opener, when present.
pub(crate) fn layout_column_open(raw: &str) -> Option<Option<f64>> {
    let captures = LAYOUT_COLUMN_OPEN.captures(raw.trim())?;
    match captures.get(1) {
        Some(width) => Some(width.as_str().parse::<f64>().ok()),
        None => Some(None),
    }
}

/// Key, extension type and parsed parameters of a bodied-extension div.
pub(crate) fn bodied_extension_div_open(raw: &str) -> Option<(String, String, Option<Value>)> {
    let captures = BODIED_EXTENSION_OPEN.captures(raw.trim())?;
    let attr_text = captures.get(1).map_or("", |m| m.as_str());

    let mut key = String::new();
    let mut extension_type = String::new();
    let mut parameters = None;
    for attr in DATA_ATTR.captures_iter(attr_text) {
        let name = attr.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let value = unescape_html(attr.get(2).map_or("", |m| m.as_str()));
        match name.as_str() {
            "extension-key" => key = value,
            "extension-type" => extension_type = value,
            "parameters" => parameters = serde_json::from_str(&value).ok(),
            _ => {}
        }
    }

    Some((key, extension_type, parameters))
}

pub(crate) fn div_close(raw: &str) -> bool {
    DIV_CLOSE.is_match(raw.trim())
}

/// Any opening `<div` counts toward close balancing.
pub(crate) fn is_any_div_open(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    lower.starts_with("<div") && !lower.starts_with("</div")
}

impl ParseState<'_> {
    /// HTMLBlocks the walker did not consume as paired constructs:
    /// aligned headings, aligned paragraphs, embedded tables, or raw text
    /// with a warning.
    pub(crate) fn convert_html_block_node(
        &mut self,
        literal: &str,
    ) -> Result<Option<Node>, ConvertError> {
        let raw = literal.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        if self.config.detect_align_html() {
            if let Some(heading) = self.parse_aligned_heading(raw)? {
                return Ok(Some(heading));
            }
            if let Some(paragraph) = self.parse_aligned_paragraph(raw)? {
                return Ok(Some(paragraph));
            }
        }

        if raw.to_lowercase().contains("<table") {
            if let Some(table) = self.parse_html_table(raw)? {
                return Ok(Some(table));
            }
        }

        self.warn(
            WarningKind::UnknownNode,
            "HtmlBlock",
            "unsupported html block converted to text",
        );
        Ok(Some(Node {
            kind: "paragraph".to_string(),
            content: vec![Node::text(raw, Vec::new())],
            ..Node::default()
        }))
    }

    fn parse_aligned_heading(&mut self, raw: &str) -> Result<Option<Node>, ConvertError> {
        let captures = match ALIGNED_HEADING.captures(raw) {
            Some(captures) => captures,
            None => return Ok(None),
        };

        let level: i64 = captures
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        let level = (level + self.config.heading_offset).clamp(1, 6);
        let alignment = captures.get(2).map_or("", |m| m.as_str()).to_lowercase();
        let inner = captures.get(3).map_or("", |m| m.as_str());

        let content = self.convert_inline_fragment(inner)?;

        let mut heading = Node {
            kind: "heading".to_string(),
            content,
            ..Node::default()
        };
        heading.set_attr("level", Value::Number(level.into()));
        heading.set_attr("align", Value::String(alignment));
        Ok(Some(heading))
    }

    fn parse_aligned_paragraph(&mut self, raw: &str) -> Result<Option<Node>, ConvertError> {
        let captures = match ALIGNED_DIV.captures(raw) {
            Some(captures) => captures,
            None => return Ok(None),
        };

        let alignment = captures.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let inner = captures.get(2).map_or("", |m| m.as_str());
        let content = self.convert_inline_fragment(inner)?;

        let mut paragraph = Node {
            kind: "paragraph".to_string(),
            content,
            ..Node::default()
        };
        paragraph.set_attr("layout", Value::String(alignment));
        Ok(Some(paragraph))
    }

    /// Parse an embedded `<table>` with html5ever, preserving
    /// colspan/rowspan and thead-driven header cells. Cell text is
    /// re-parsed as markdown blocks.
    fn parse_html_table(&mut self, raw: &str) -> Result<Option<Node>, ConvertError> {
        let dom = html5ever::parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut raw.as_bytes())
            .map_err(|err| ConvertError::Parse(format!("failed to parse html table: {err}")))?;

        let table = match find_element(&dom.document, "table") {
            Some(table) => table,
            None => return Ok(None),
        };

        let mut rows = Vec::new();
        self.collect_html_table_rows(&table, false, &mut rows)?;
        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(Node {
            kind: "table".to_string(),
            content: rows,
            ..Node::default()
        }))
    }

    fn collect_html_table_rows(
        &mut self,
        parent: &Handle,
        header_section: bool,
        rows: &mut Vec<Node>,
    ) -> Result<(), ConvertError> {
        for child in parent.children.borrow().iter() {
            let name = match element_name(child) {
                Some(name) => name,
                None => continue,
            };
            match name.as_str() {
                "thead" => self.collect_html_table_rows(child, true, rows)?,
                "tbody" | "tfoot" => self.collect_html_table_rows(child, false, rows)?,
                "tr" => {
                    if let Some(row) = self.convert_html_table_row(child, header_section)? {
                        rows.push(row);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn convert_html_table_row(
        &mut self,
        row: &Handle,
        header_section: bool,
    ) -> Result<Option<Node>, ConvertError> {
        let mut row_node = Node::bare("tableRow");

        for cell in row.children.borrow().iter() {
            let name = match element_name(cell) {
                Some(name) => name,
                None => continue,
            };
            if name != "td" && name != "th" {
                continue;
            }

            let cell_kind = if header_section || name == "th" {
                "tableHeader"
            } else {
                "tableCell"
            };

            let text = normalize_html_cell_text(&extract_node_text(cell));
            let mut blocks = self.convert_block_fragment(&text)?;
            if blocks.is_empty() {
                blocks = vec![Node::bare("paragraph")];
            }

            let mut cell_node = Node {
                kind: cell_kind.to_string(),
                content: blocks,
                ..Node::default()
            };

            let colspan = int_attr(cell, "colspan");
            if colspan > 1 {
                cell_node.set_attr("colspan", Value::Number(colspan.into()));
            }
            let rowspan = int_attr(cell, "rowspan");
            if rowspan > 1 {
                cell_node.set_attr("rowspan", Value::Number(rowspan.into()));
            }

            row_node.content.push(cell_node);
        }

        if row_node.content.is_empty() {
            Ok(None)
        } else {
            Ok(Some(row_node))
        }
    }
}

fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_lowercase()),
        _ => None,
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if element_name(handle).as_deref() == Some(tag) {
        return Some(handle.clone());
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

fn int_attr(handle: &Handle, key: &str) -> i64 {
    if let NodeData::Element { attrs, .. } = &handle.data {
        for attr in attrs.borrow().iter() {
            if attr.name.local.to_string().eq_ignore_ascii_case(key) {
                return attr.value.trim().parse().unwrap_or(0);
            }
        }
    }
    0
}

/// Text of an element subtree; `<br>` becomes a newline and block-ish
/// children (`p`, `div`, `li`) terminate their line.
fn extract_node_text(handle: &Handle) -> String {
    let mut out = String::new();
    for child in handle.children.borrow().iter() {
        walk_text(child, &mut out);
    }
    out
}

fn walk_text(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } => {
            let tag = name.local.to_string().to_lowercase();
            if tag == "br" {
                out.push('\n');
                return;
            }
            for child in handle.children.borrow().iter() {
                walk_text(child, out);
            }
            if matches!(tag.as_str(), "p" | "div" | "li") {
                out.push('\n');
            }
        }
        _ => {
            for child in handle.children.borrow().iter() {
                walk_text(child, out);
            }
        }
    }
}

/// Dedent and trim cell text so indented HTML source does not read as an
/// indented code block when re-parsed.
fn normalize_html_cell_text(value: &str) -> String {
    let value = value.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = value.split('\n').collect();

    while matches!(lines.first(), Some(line) if line.trim().is_empty()) {
        lines.remove(0);
    }
    while matches!(lines.last(), Some(line) if line.trim().is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }

    let min_indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let dedented: Vec<String> = lines
        .iter()
        .map(|line| {
            if line.len() >= min_indent {
                line[min_indent..].trim_end().to_string()
            } else {
                line.trim_end().to_string()
            }
        })
        .collect();

    dedented.join("\n").trim().to_string()
}

/// Undo the escaping the serializer applies to HTML text positions.
pub(crate) fn unescape_html(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#34;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Doc;
    use crate::parser::{MarkdownParser, ReverseConfig};

    fn parse_doc(markdown: &str) -> Doc {
        let result = MarkdownParser::new(ReverseConfig::default())
            .unwrap()
            .parse(markdown)
            .unwrap();
        serde_json::from_slice(&result.adf).unwrap()
    }

    #[test]
    fn details_pattern_extracts_title() {
        assert_eq!(
            details_open_title("<details><summary>a &lt;b&gt;</summary>").as_deref(),
            Some("a <b>")
        );
        assert!(details_open_title("<details>").is_none());
        assert!(details_close("</details>"));
    }

    #[test]
    fn layout_patterns() {
        assert!(layout_section_open("<div class=\"layout-section\">"));
        assert_eq!(
            layout_column_open("<div class=\"layout-column\" style=\"width: 33.33%;\">"),
            Some(Some(33.33))
        );
        assert_eq!(layout_column_open("<div class=\"layout-column\">"), Some(None));
        assert!(layout_column_open("<div class=\"other\">").is_none());
    }

    #[test]
    fn aligned_heading_block() {
        let doc = parse_doc("<h2 align=\"center\">Centered</h2>\n");
        let heading = &doc.content[0];
        assert_eq!(heading.kind, "heading");
        assert_eq!(heading.int_attr("level", 0), 2);
        assert_eq!(heading.str_attr("align", ""), "center");
        assert_eq!(heading.content[0].text_value(), "Centered");
    }

    #[test]
    fn aligned_div_becomes_paragraph_with_layout() {
        let doc = parse_doc("<div align=\"right\">shifted</div>\n");
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.kind, "paragraph");
        assert_eq!(paragraph.str_attr("layout", ""), "right");
    }

    #[test]
    fn html_table_with_spans_is_reconstructed() {
        let markdown = "<table>\n  <thead>\n    <tr>\n      <th colspan=\"2\">Wide</th>\n    </tr>\n  </thead>\n  <tbody>\n    <tr>\n      <td>a</td>\n      <td>b</td>\n    </tr>\n  </tbody>\n</table>\n";
        let doc = parse_doc(markdown);
        let table = &doc.content[0];
        assert_eq!(table.kind, "table");
        assert_eq!(table.content.len(), 2);
        let header = &table.content[0].content[0];
        assert_eq!(header.kind, "tableHeader");
        assert_eq!(header.int_attr("colspan", 1), 2);
        let data_row = &table.content[1];
        assert_eq!(data_row.content[0].kind, "tableCell");
    }

    #[test]
    fn unknown_html_block_degrades_to_text_with_warning() {
        let result = MarkdownParser::new(ReverseConfig::default())
            .unwrap()
            .parse("<aside>odd</aside>\n")
            .unwrap();
        let doc: Doc = serde_json::from_slice(&result.adf).unwrap();
        assert_eq!(doc.content[0].kind, "paragraph");
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn bodied_extension_div_attrs() {
        let (key, extension_type, parameters) = bodied_extension_div_open(
            "<div class=\"adf-bodied-extension\" data-extension-key=\"note\" data-extension-type=\"com.example\" data-parameters=\"{&quot;tone&quot;:&quot;calm&quot;}\">",
        )
        .unwrap();
        assert_eq!(key, "note");
        assert_eq!(extension_type, "com.example");
        assert_eq!(parameters.unwrap()["tone"], "calm");
    }
}
