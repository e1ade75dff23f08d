//! Pandoc grid table parsing: `+---+` borders, `|` row lines and the
//! `+===+` header separator.

use crate::ast::Node;
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::segment::GRID_BORDER;
use super::ParseState;

impl ParseState<'_> {
    pub(crate) fn convert_grid_table(
        &mut self,
        lines: &[String],
    ) -> Result<Option<Node>, ConvertError> {
        let (header_rows, data_rows, _columns) = match parse_grid_lines(lines) {
            Some(parsed) => parsed,
            None => {
                self.warn(
                    WarningKind::DroppedFeature,
                    "pandocGridTable",
                    "invalid pandoc grid table; preserved as text",
                );
                return Ok(Some(grid_literal_paragraph(lines)));
            }
        };

        let mut table = Node::bare("table");
        for row in &header_rows {
            table.content.push(self.convert_grid_row(row, true)?);
        }
        for row in &data_rows {
            table.content.push(self.convert_grid_row(row, false)?);
        }

        if table.content.is_empty() {
            return Ok(Some(grid_literal_paragraph(lines)));
        }
        Ok(Some(table))
    }

    fn convert_grid_row(&mut self, cells: &[String], header: bool) -> Result<Node, ConvertError> {
        let mut row = Node::bare("tableRow");

        for cell in cells {
            let inline = self.convert_inline_fragment(cell)?;
            let inline = self.apply_inline_patterns(inline);
            row.content.push(Node {
                kind: if header {
                    "tableHeader".to_string()
                } else {
                    "tableCell".to_string()
                },
                content: vec![Node {
                    kind: "paragraph".to_string(),
                    content: inline,
                    ..Node::default()
                }],
                ..Node::default()
            });
        }

        Ok(row)
    }
}

type GridRows = (Vec<Vec<String>>, Vec<Vec<String>>, usize);

/// Split raw grid lines into header rows, data rows and the column count.
/// A missing `+===+` separator means there is no header row. Row lines
/// between borders merge into multi-line cells joined by spaces.
fn parse_grid_lines(lines: &[String]) -> Option<GridRows> {
    if lines.len() < 3 {
        return None;
    }

    let (widths, _) = parse_grid_border(&lines[0])?;
    let columns = widths.len();
    if columns == 0 {
        return None;
    }

    let mut header_rows: Vec<Vec<String>> = Vec::new();
    let mut data_rows: Vec<Vec<String>> = Vec::new();
    let mut pending: Option<Vec<String>> = None;
    let mut header_mode = true;
    let mut header_separator_seen = false;

    for line in &lines[1..] {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('|') {
            let cells = parse_grid_row(line, columns)?;
            match pending.as_mut() {
                None => pending = Some(cells),
                Some(pending_cells) => {
                    for (index, part) in cells.iter().enumerate() {
                        let part = part.trim();
                        if part.is_empty() {
                            continue;
                        }
                        if !pending_cells[index].is_empty() {
                            pending_cells[index].push(' ');
                        }
                        pending_cells[index].push_str(part);
                    }
                }
            }
        } else if line.starts_with('+') {
            let (_, separator) = parse_grid_border(line)?;
            if let Some(cells) = pending.take() {
                if header_mode {
                    header_rows.push(cells);
                } else {
                    data_rows.push(cells);
                }
            }
            if separator == b'=' {
                header_separator_seen = true;
                header_mode = false;
            }
        } else {
            return None;
        }
    }

    if let Some(cells) = pending {
        if header_mode {
            header_rows.push(cells);
        } else {
            data_rows.push(cells);
        }
    }

    if !header_separator_seen {
        let mut all = std::mem::take(&mut header_rows);
        all.extend(std::mem::take(&mut data_rows));
        data_rows = all;
    }

    if header_rows.is_empty() && data_rows.is_empty() {
        return None;
    }

    Some((header_rows, data_rows, columns))
}

fn parse_grid_border(line: &str) -> Option<(Vec<usize>, u8)> {
    if !GRID_BORDER.is_match(line) || line.len() < 3 {
        return None;
    }

    let inner = &line[1..line.len() - 1];
    let mut widths = Vec::new();
    let mut separator = 0u8;

    for part in inner.split('+') {
        if part.is_empty() {
            return None;
        }
        for byte in part.bytes() {
            if byte != b'-' && byte != b'=' {
                return None;
            }
            if separator == 0 {
                separator = byte;
            }
        }
        widths.push(part.len());
    }

    Some((widths, separator))
}

fn parse_grid_row(line: &str, columns: usize) -> Option<Vec<String>> {
    if line.len() < 2 || !line.starts_with('|') || !line.ends_with('|') {
        return None;
    }

    let parts: Vec<&str> = line[1..line.len() - 1].split('|').collect();
    if parts.len() != columns {
        return None;
    }

    Some(parts.iter().map(|part| part.trim().to_string()).collect())
}

fn grid_literal_paragraph(lines: &[String]) -> Node {
    Node {
        kind: "paragraph".to_string(),
        content: vec![Node::text(lines.join("\n"), Vec::new())],
        ..Node::default()
    }
}
