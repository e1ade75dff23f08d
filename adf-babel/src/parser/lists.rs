//! List conversion: bullet/ordered lists and GFM task lists.

use comrak::nodes::{AstNode, NodeList, NodeValue};
use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::mark_stack::{append_inline_node, MarkStack};
use super::ParseState;

impl ParseState<'_> {
    pub(crate) fn convert_list_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        list: &NodeList,
    ) -> Result<Option<Node>, ConvertError> {
        if is_task_list(node) {
            return self.convert_task_list_node(node);
        }

        let mut list_node = if matches!(list.list_type, comrak::nodes::ListType::Ordered) {
            let mut ordered = Node::bare("orderedList");
            if list.start > 1 {
                ordered.set_attr("order", Value::Number((list.start as i64).into()));
            }
            ordered
        } else {
            Node::bare("bulletList")
        };

        for child in node.children() {
            self.check_cancelled()?;
            let is_item = matches!(
                child.data.borrow().value,
                NodeValue::Item(_) | NodeValue::TaskItem(_)
            );
            if !is_item {
                continue;
            }

            let mut item = Node::bare("listItem");
            let children: Vec<&AstNode<'_>> = child.children().collect();
            item.content = self.convert_sequence(&children)?;
            list_node.content.push(item);
        }

        if list_node.content.is_empty() {
            return Ok(None);
        }

        Ok(Some(list_node))
    }

    fn convert_task_list_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
    ) -> Result<Option<Node>, ConvertError> {
        let mut task_list = Node::bare("taskList");

        for child in node.children() {
            self.check_cancelled()?;

            let checked = match &child.data.borrow().value {
                NodeValue::TaskItem(symbol) => symbol.is_some(),
                _ => continue,
            };

            let (item, nested) = self.convert_task_list_item(child, checked)?;
            if let Some(item) = item {
                task_list.content.push(item);
            }
            // Nested lists inside a task item surface as siblings.
            task_list.content.extend(nested);
        }

        if task_list.content.is_empty() {
            return Ok(None);
        }

        Ok(Some(task_list))
    }

    /// A task item keeps inline content only; paragraphs join with hard
    /// breaks, nested lists are promoted, and block media degrades to a
    /// placeholder.
    fn convert_task_list_item<'a>(
        &mut self,
        item: &'a AstNode<'a>,
        checked: bool,
    ) -> Result<(Option<Node>, Vec<Node>), ConvertError> {
        let mut task_item = Node::bare("taskItem");
        task_item.set_attr(
            "state",
            Value::String(if checked { "DONE" } else { "TODO" }.to_string()),
        );

        let mut nested = Vec::new();
        let mut has_inline = false;

        for child in item.children() {
            let is_paragraph = matches!(child.data.borrow().value, NodeValue::Paragraph);
            if is_paragraph {
                let mut stack = MarkStack::new();
                let inline = self.convert_inline_children(child, &mut stack)?;
                let inline = self.apply_inline_patterns(inline);

                if !inline.is_empty() {
                    if !task_item.content.is_empty() {
                        task_item.content.push(Node::bare("hardBreak"));
                    }
                    for node in inline {
                        if matches!(node.kind.as_str(), "mediaSingle" | "table") {
                            self.warn(
                                WarningKind::DroppedFeature,
                                &node.kind,
                                "task item only supports inline content; embedded block converted to placeholder text",
                            );
                            append_inline_node(
                                &mut task_item.content,
                                Node::text("[Embedded content]", Vec::new()),
                            );
                            continue;
                        }
                        append_inline_node(&mut task_item.content, node);
                    }
                }
                has_inline = true;
                continue;
            }

            let list_data = match &child.data.borrow().value {
                NodeValue::List(list) => Some(list.clone()),
                _ => None,
            };
            if let Some(list_data) = list_data {
                if let Some(converted) = self.convert_list_node(child, &list_data)? {
                    nested.push(converted);
                }
                continue;
            }

            if let Some(converted) = self.convert_block_node(child)? {
                nested.push(converted);
            }
        }

        if !has_inline {
            return Ok((None, nested));
        }

        Ok((Some(task_item), nested))
    }
}

/// A list is a task list when every item carries a checkbox.
fn is_task_list<'a>(node: &'a AstNode<'a>) -> bool {
    let mut has_items = false;
    for child in node.children() {
        match child.data.borrow().value {
            NodeValue::TaskItem(_) => has_items = true,
            _ => return false,
        }
    }
    has_items
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
    fn bullet_list_with_nesting() {
        let doc = parse_doc("- first\n  - inner\n- second\n");
        let list = &doc.content[0];
        assert_eq!(list.kind, "bulletList");
        assert_eq!(list.content.len(), 2);
        let first = &list.content[0];
        assert_eq!(first.kind, "listItem");
        assert_eq!(first.content[0].kind, "paragraph");
        assert_eq!(first.content[1].kind, "bulletList");
    }

    #[test]
    fn ordered_list_keeps_start_above_one() {
        let doc = parse_doc("4. four\n5. five\n");
        let list = &doc.content[0];
        assert_eq!(list.kind, "orderedList");
        assert_eq!(list.int_attr("order", 0), 4);
    }

    #[test]
    fn ordered_list_from_one_has_no_order_attr() {
        let doc = parse_doc("1. one\n2. two\n");
        let list = &doc.content[0];
        assert_eq!(list.kind, "orderedList");
        assert!(list.attrs.is_none());
    }

    #[test]
    fn task_list_states() {
        let doc = parse_doc("- [x] done\n- [ ] open\n");
        let list = &doc.content[0];
        assert_eq!(list.kind, "taskList");
        assert_eq!(list.content[0].str_attr("state", ""), "DONE");
        assert_eq!(list.content[0].content[0].text_value(), "done");
        assert_eq!(list.content[1].str_attr("state", ""), "TODO");
    }

    #[test]
    fn nested_list_in_task_item_is_promoted() {
        let doc = parse_doc("- [ ] outer\n  - plain nested\n");
        let list = &doc.content[0];
        assert_eq!(list.kind, "taskList");
        assert_eq!(list.content.len(), 2);
        assert_eq!(list.content[0].kind, "taskItem");
        assert_eq!(list.content[1].kind, "bulletList");
    }
}
