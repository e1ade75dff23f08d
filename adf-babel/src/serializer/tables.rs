//! Table renderers: GFM pipe tables, HTML tables and Pandoc grid tables,
//! plus the cell-content flattening rules shared between them.

use crate::ast::Node;
use crate::config::{HardBreakStyle, TableMode};
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::blocks::extract_text;
use super::{escape_html, RenderState};

impl RenderState<'_> {
    pub(crate) fn render_table(&mut self, node: &Node) -> Result<String, ConvertError> {
        let complex = is_complex_table(node);
        let mode = match self.config.table_mode {
            TableMode::Auto => {
                if complex {
                    TableMode::Html
                } else {
                    TableMode::Pipe
                }
            }
            TableMode::Autopandoc => {
                if complex {
                    TableMode::Pandoc
                } else {
                    self.warn(
                        WarningKind::DroppedFeature,
                        &node.kind,
                        "simple table downgraded from pandoc grid to pipe table",
                    );
                    TableMode::Pipe
                }
            }
            fixed => fixed,
        };

        match mode {
            TableMode::Html => self.render_table_html(node),
            TableMode::Pandoc => self.render_table_grid(node),
            _ => {
                let rows = self.extract_table_rows(node)?;
                if rows.is_empty() {
                    return Ok(String::new());
                }
                Ok(render_table_pipe(&rows))
            }
        }
    }

    /// Cell matrix with header normalization: a missing header row is
    /// synthesized empty, unless the table is a single all-plain-text row,
    /// which is promoted to the header itself.
    fn extract_table_rows(&mut self, node: &Node) -> Result<Vec<Vec<String>>, ConvertError> {
        if node.content.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut row_nodes: Vec<&Node> = Vec::new();
        let mut has_header = false;

        for (index, row_node) in node.content.iter().enumerate() {
            if row_node.kind != "tableRow" {
                continue;
            }

            let mut row = Vec::new();
            let mut is_header_row = false;
            for cell in &row_node.content {
                if cell.kind == "tableHeader" {
                    is_header_row = true;
                }
                row.push(self.render_cell_content(cell)?);
            }

            if index == 0 && is_header_row {
                has_header = true;
            }
            rows.push(row);
            row_nodes.push(row_node);
        }

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        if !has_header {
            if rows.len() == 1 && single_row_header_candidate(row_nodes[0]) {
                return Ok(rows);
            }

            let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
            rows.insert(0, vec![String::new(); col_count]);
        }

        Ok(rows)
    }

    fn render_table_html(&mut self, node: &Node) -> Result<String, ConvertError> {
        let rows: Vec<&Node> = node
            .content
            .iter()
            .filter(|child| child.kind == "tableRow")
            .collect();
        if rows.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::from("<table>\n");

        if row_has_headers(rows[0]) {
            out.push_str("  <thead>\n");
            out.push_str(&self.render_html_row(rows[0])?);
            out.push_str("  </thead>\n");

            if rows.len() > 1 {
                out.push_str("  <tbody>\n");
                for row in &rows[1..] {
                    out.push_str(&self.render_html_row(row)?);
                }
                out.push_str("  </tbody>\n");
            }
        } else {
            out.push_str("  <tbody>\n");
            for row in &rows {
                out.push_str(&self.render_html_row(row)?);
            }
            out.push_str("  </tbody>\n");
        }

        out.push_str("</table>\n\n");
        Ok(out)
    }

    fn render_html_row(&mut self, row: &Node) -> Result<String, ConvertError> {
        let mut out = String::from("    <tr>\n");

        for cell in &row.content {
            match cell.kind.as_str() {
                "tableHeader" => out.push_str(&self.render_html_cell(cell, "th")?),
                "tableCell" => out.push_str(&self.render_html_cell(cell, "td")?),
                _ => {}
            }
        }

        out.push_str("    </tr>\n");
        Ok(out)
    }

    fn render_html_cell(&mut self, cell: &Node, tag: &str) -> Result<String, ConvertError> {
        let content = self.render_cell_blocks(cell)?;

        let mut attrs = String::new();
        let colspan = cell.int_attr("colspan", 1);
        if colspan > 1 {
            attrs.push_str(&format!(" colspan=\"{colspan}\""));
        }
        let rowspan = cell.int_attr("rowspan", 1);
        if rowspan > 1 {
            attrs.push_str(&format!(" rowspan=\"{rowspan}\""));
        }

        let mut out = format!("      <{tag}{attrs}>\n");
        for line in content.split('\n') {
            if line.is_empty() {
                continue;
            }
            out.push_str("        ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("      </{tag}>\n"));

        Ok(out)
    }

    /// Cell children rendered as blocks, joined by newlines (HTML cells
    /// keep line structure; the `<td>` indentation is applied later).
    fn render_cell_blocks(&mut self, node: &Node) -> Result<String, ConvertError> {
        let mut parts = Vec::new();
        for child in &node.content {
            let content = self.render_node(child)?;
            let content = content.trim_end_matches('\n');
            if !content.is_empty() {
                parts.push(content.to_string());
            }
        }
        Ok(parts.join("\n"))
    }

    /// Flatten a cell for pipe/grid emission. Children are converted and
    /// joined by `<br>` (HTML break style) or a space; lists flatten to
    /// their lines; code blocks become `<code>` or backticks. Every `|` is
    /// escaped exactly once, here at the outer level.
    pub(crate) fn render_cell_content(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let mut parts = Vec::new();
        for child in &node.content {
            match child.kind.as_str() {
                "paragraph" => {
                    let content = self.render_inline_content(&child.content)?;
                    if !content.is_empty() {
                        parts.push(content);
                    }
                }
                "bulletList" | "orderedList" | "taskList" => {
                    let list = self.render_list_in_cell(child)?;
                    if !list.is_empty() {
                        parts.push(list);
                    }
                }
                "codeBlock" => {
                    let code = self.render_code_block_in_cell(child);
                    if !code.is_empty() {
                        parts.push(code);
                    }
                }
                _ => {
                    let content = self.render_node(child)?;
                    let content = content.trim_end_matches('\n');
                    if !content.is_empty() {
                        parts.push(content.to_string());
                    }
                }
            }
        }

        let joined = parts.join(self.cell_separator());
        Ok(joined.replace('|', "\\|"))
    }

    fn cell_separator(&self) -> &'static str {
        if self.config.hard_break_style == HardBreakStyle::Html {
            "<br>"
        } else {
            " "
        }
    }

    fn render_list_in_cell(&mut self, node: &Node) -> Result<String, ConvertError> {
        let list = self.render_node(node)?;
        let list = list.trim_end_matches('\n');
        if list.is_empty() {
            return Ok(String::new());
        }

        let lines: Vec<&str> = list
            .split('\n')
            .map(|line| line.trim_end())
            .filter(|line| !line.is_empty())
            .collect();
        Ok(lines.join(self.cell_separator()))
    }

    fn render_code_block_in_cell(&self, node: &Node) -> String {
        let raw = extract_text(&node.content);
        if raw.trim().is_empty() {
            return String::new();
        }

        if self.config.hard_break_style == HardBreakStyle::Html {
            let safe = escape_html(&raw).replace('\n', "<br>");
            format!("<code>{safe}</code>")
        } else {
            format!("`{}`", raw.replace('\n', " "))
        }
    }

    /// Pandoc grid table: `+---+` borders, `+===+` below the header row,
    /// cell lines padded to column width.
    fn render_table_grid(&mut self, node: &Node) -> Result<String, ConvertError> {
        let mut rows: Vec<Vec<Vec<String>>> = Vec::new();
        let mut header_first = false;

        for (index, row_node) in node.content.iter().enumerate() {
            if row_node.kind != "tableRow" {
                continue;
            }
            if index == 0 && row_has_headers(row_node) {
                header_first = true;
            }

            let mut row = Vec::new();
            for cell in &row_node.content {
                if cell.kind != "tableCell" && cell.kind != "tableHeader" {
                    continue;
                }
                let content = self.render_cell_grid_lines(cell)?;
                row.push(content);
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Ok(String::new());
        }

        let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![3usize; col_count];
        for row in &rows {
            for (column, cell) in row.iter().enumerate() {
                for line in cell {
                    widths[column] = widths[column].max(line.chars().count());
                }
            }
        }

        let border = |fill: char| {
            let mut line = String::from("+");
            for width in &widths {
                line.push_str(&fill.to_string().repeat(width + 2));
                line.push('+');
            }
            line
        };

        let mut out = String::new();
        out.push_str(&border('-'));
        out.push('\n');

        for (index, row) in rows.iter().enumerate() {
            let height = row.iter().map(Vec::len).max().unwrap_or(1).max(1);
            for line_index in 0..height {
                let mut line = String::from("|");
                for column in 0..col_count {
                    let text = row
                        .get(column)
                        .and_then(|cell| cell.get(line_index))
                        .map(String::as_str)
                        .unwrap_or("");
                    let pad = widths[column] - text.chars().count();
                    line.push(' ');
                    line.push_str(text);
                    line.push_str(&" ".repeat(pad + 1));
                    line.push('|');
                }
                out.push_str(&line);
                out.push('\n');
            }

            let separator = if index == 0 && header_first { '=' } else { '-' };
            out.push_str(&border(separator));
            out.push('\n');
        }

        out.push('\n');
        Ok(out)
    }

    /// Cell content as a list of lines for grid emission.
    fn render_cell_grid_lines(&mut self, cell: &Node) -> Result<Vec<String>, ConvertError> {
        let content = self.render_cell_blocks(cell)?;
        if content.is_empty() {
            return Ok(Vec::new());
        }
        Ok(content
            .replace('|', "\\|")
            .split('\n')
            .map(|line| line.trim_end().to_string())
            .collect())
    }
}

/// A table is complex when any cell spans rows/columns or contains block
/// content a pipe table cannot hold.
fn is_complex_table(node: &Node) -> bool {
    for row in &node.content {
        if row.kind != "tableRow" {
            continue;
        }
        for cell in &row.content {
            if cell.kind != "tableCell" && cell.kind != "tableHeader" {
                continue;
            }
            if cell.int_attr("colspan", 1) > 1 || cell.int_attr("rowspan", 1) > 1 {
                return true;
            }
            if cell.content.iter().any(|child| {
                matches!(
                    child.kind.as_str(),
                    "bulletList" | "orderedList" | "taskList" | "codeBlock" | "table"
                )
            }) {
                return true;
            }
        }
    }
    false
}

fn row_has_headers(row: &Node) -> bool {
    row.content.iter().any(|cell| cell.kind == "tableHeader")
}

/// A lone row of single-paragraph plain-text `tableCell`s may stand in as
/// the header row instead of synthesizing an empty one.
fn single_row_header_candidate(row: &Node) -> bool {
    if row.content.is_empty() {
        return false;
    }

    row.content.iter().all(|cell| {
        cell.kind == "tableCell"
            && cell.content.len() == 1
            && cell.content[0].kind == "paragraph"
            && cell.content[0]
                .content
                .iter()
                .all(|inline| inline.kind == "text" && inline.marks.is_empty())
    })
}

fn render_table_pipe(rows: &[Vec<String>]) -> String {
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = String::new();

    let write_row = |out: &mut String, row: &[String]| {
        out.push('|');
        for column in 0..col_count {
            out.push(' ');
            if let Some(cell) = row.get(column) {
                out.push_str(cell);
            }
            out.push_str(" |");
        }
        out.push('\n');
    };

    write_row(&mut out, &rows[0]);

    out.push('|');
    for _ in 0..col_count {
        out.push_str(" --- |");
    }
    out.push('\n');

    for row in &rows[1..] {
        write_row(&mut out, row);
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, HardBreakStyle, TableMode};
    use crate::serializer::MarkdownSerializer;

    fn render(input: &str) -> String {
        MarkdownSerializer::new(Config::default())
            .unwrap()
            .serialize(input.as_bytes())
            .unwrap()
            .markdown
    }

    fn render_with(config: Config, input: &str) -> String {
        MarkdownSerializer::new(config)
            .unwrap()
            .serialize(input.as_bytes())
            .unwrap()
            .markdown
    }

    const SIMPLE_TABLE: &str = r#"{"type":"doc","content":[{"type":"table","content":[
        {"type":"tableRow","content":[
            {"type":"tableHeader","content":[{"type":"paragraph","content":[{"type":"text","text":"Name"}]}]},
            {"type":"tableHeader","content":[{"type":"paragraph","content":[{"type":"text","text":"Role"}]}]}
        ]},
        {"type":"tableRow","content":[
            {"type":"tableCell","content":[{"type":"paragraph","content":[{"type":"text","text":"Ada"}]}]},
            {"type":"tableCell","content":[{"type":"paragraph","content":[{"type":"text","text":"Engineer"}]}]}
        ]}
    ]}]}"#;

    #[test]
    fn simple_table_renders_as_pipes() {
        assert_eq!(
            render(SIMPLE_TABLE),
            "| Name | Role |\n| --- | --- |\n| Ada | Engineer |\n"
        );
    }

    #[test]
    fn headerless_table_gets_synthesized_header() {
        let input = r#"{"type":"doc","content":[{"type":"table","content":[
            {"type":"tableRow","content":[
                {"type":"tableCell","content":[{"type":"paragraph","content":[{"type":"text","text":"a","marks":[{"type":"strong"}]}]}]}
            ]},
            {"type":"tableRow","content":[
                {"type":"tableCell","content":[{"type":"paragraph","content":[{"type":"text","text":"b"}]}]}
            ]}
        ]}]}"#;
        assert_eq!(render(input), "|  |\n| --- |\n| **a** |\n| b |\n");
    }

    #[test]
    fn single_plain_row_is_promoted_to_header() {
        let input = r#"{"type":"doc","content":[{"type":"table","content":[
            {"type":"tableRow","content":[
                {"type":"tableCell","content":[{"type":"paragraph","content":[{"type":"text","text":"only"}]}]}
            ]}
        ]}]}"#;
        assert_eq!(render(input), "| only |\n| --- |\n");
    }

    #[test]
    fn pipes_in_cells_are_escaped_once() {
        let input = r#"{"type":"doc","content":[{"type":"table","content":[
            {"type":"tableRow","content":[
                {"type":"tableHeader","content":[{"type":"paragraph","content":[{"type":"text","text":"a|b"}]}]}
            ]}
        ]}]}"#;
        assert_eq!(render(input), "| a\\|b |\n| --- |\n");
    }

    #[test]
    fn colspan_switches_auto_mode_to_html() {
        let input = r#"{"type":"doc","content":[{"type":"table","content":[
            {"type":"tableRow","content":[
                {"type":"tableHeader","attrs":{"colspan":2},"content":[{"type":"paragraph","content":[{"type":"text","text":"wide"}]}]}
            ]},
            {"type":"tableRow","content":[
                {"type":"tableCell","content":[{"type":"paragraph","content":[{"type":"text","text":"a"}]}]},
                {"type":"tableCell","content":[{"type":"paragraph","content":[{"type":"text","text":"b"}]}]}
            ]}
        ]}]}"#;
        let output = render(input);
        assert!(output.starts_with("<table>\n  <thead>\n"));
        assert!(output.contains("<th colspan=\"2\">"));
        assert!(output.contains("<tbody>"));
    }

    #[test]
    fn list_in_cell_flattens_with_break_separator() {
        let config = Config {
            hard_break_style: HardBreakStyle::Html,
            table_mode: TableMode::Pipe,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"table","content":[
            {"type":"tableRow","content":[
                {"type":"tableHeader","content":[{"type":"paragraph","content":[{"type":"text","text":"Items"}]}]}
            ]},
            {"type":"tableRow","content":[
                {"type":"tableCell","content":[{"type":"bulletList","content":[
                    {"type":"listItem","content":[{"type":"paragraph","content":[{"type":"text","text":"one"}]}]},
                    {"type":"listItem","content":[{"type":"paragraph","content":[{"type":"text","text":"two"}]}]}
                ]}]}
            ]}
        ]}]}"#;
        assert_eq!(
            render_with(config, input),
            "| Items |\n| --- |\n| - one<br>- two |\n"
        );
    }

    #[test]
    fn code_block_in_cell_html_mode_escapes() {
        let config = Config {
            hard_break_style: HardBreakStyle::Html,
            table_mode: TableMode::Pipe,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"table","content":[
            {"type":"tableRow","content":[
                {"type":"tableHeader","content":[{"type":"paragraph","content":[{"type":"text","text":"Code"}]}]}
            ]},
            {"type":"tableRow","content":[
                {"type":"tableCell","content":[{"type":"codeBlock","content":[{"type":"text","text":"a < b\nc"}]}]}
            ]}
        ]}]}"#;
        assert_eq!(
            render_with(config, input),
            "| Code |\n| --- |\n| <code>a &lt; b<br>c</code> |\n"
        );
    }

    #[test]
    fn pandoc_mode_emits_grid_table() {
        let config = Config {
            table_mode: TableMode::Pandoc,
            ..Config::default()
        };
        let output = render_with(config, SIMPLE_TABLE);
        assert_eq!(
            output,
            "+------+----------+\n| Name | Role     |\n+======+==========+\n| Ada  | Engineer |\n+------+----------+\n"
        );
    }

    #[test]
    fn autopandoc_downgrades_simple_tables_with_warning() {
        let config = Config {
            table_mode: TableMode::Autopandoc,
            ..Config::default()
        };
        let result = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(SIMPLE_TABLE.as_bytes())
            .unwrap();
        assert!(result.markdown.starts_with("| Name |"));
        assert_eq!(result.warnings.len(), 1);
    }
}
