//! GFM pipe table conversion from the comrak AST.

use comrak::nodes::{AstNode, NodeValue, TableAlignment};
use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;

use super::mark_stack::MarkStack;
use super::ParseState;

impl ParseState<'_> {
    pub(crate) fn convert_table_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        alignments: &[TableAlignment],
    ) -> Result<Option<Node>, ConvertError> {
        let mut table = Node::bare("table");

        for row in node.children() {
            self.check_cancelled()?;
            let is_header = match row.data.borrow().value {
                NodeValue::TableRow(header) => header,
                _ => continue,
            };

            let mut row_node = Node::bare("tableRow");
            for (column, cell) in row.children().enumerate() {
                if !matches!(cell.data.borrow().value, NodeValue::TableCell) {
                    continue;
                }

                let mut stack = MarkStack::new();
                let inline = self.convert_inline_children(cell, &mut stack)?;
                let inline = self.apply_inline_patterns(inline);

                let mut cell_node = Node {
                    kind: if is_header {
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
                };

                if let Some(alignment) = alignment_name(alignments.get(column)) {
                    cell_node.set_attr("alignment", Value::String(alignment.to_string()));
                }

                row_node.content.push(cell_node);
            }

            if !row_node.content.is_empty() {
                table.content.push(row_node);
            }
        }

        if table.content.is_empty() {
            return Ok(None);
        }

        Ok(Some(table))
    }
}

fn alignment_name(alignment: Option<&TableAlignment>) -> Option<&'static str> {
    match alignment {
        Some(TableAlignment::Left) => Some("left"),
        Some(TableAlignment::Center) => Some("center"),
        Some(TableAlignment::Right) => Some("right"),
        Some(TableAlignment::None) | None => None,
    }
}

#[cfg(test)]
mod tests {
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
    fn pipe_table_reconstructs_rows_and_headers() {
        let doc = parse_doc("| Name | Role |\n| --- | --- |\n| Ada | Engineer |\n");
        let table = &doc.content[0];
        assert_eq!(table.kind, "table");
        assert_eq!(table.content.len(), 2);

        let header_row = &table.content[0];
        assert_eq!(header_row.content[0].kind, "tableHeader");
        assert_eq!(
            header_row.content[0].content[0].content[0].text_value(),
            "Name"
        );

        let data_row = &table.content[1];
        assert_eq!(data_row.content[1].kind, "tableCell");
        assert_eq!(
            data_row.content[1].content[0].content[0].text_value(),
            "Engineer"
        );
    }

    #[test]
    fn column_alignment_is_copied_to_cells() {
        let doc = parse_doc("| a | b | c |\n| :-- | :-: | --: |\n| 1 | 2 | 3 |\n");
        let data_row = &doc.content[0].content[1];
        assert_eq!(data_row.content[0].str_attr("alignment", ""), "left");
        assert_eq!(data_row.content[1].str_attr("alignment", ""), "center");
        assert_eq!(data_row.content[2].str_attr("alignment", ""), "right");
    }

    #[test]
    fn escaped_pipes_stay_literal() {
        let doc = parse_doc("| a\\|b |\n| --- |\n| c |\n");
        let header = &doc.content[0].content[0].content[0];
        assert_eq!(header.content[0].content[0].text_value(), "a|b");
    }
}
