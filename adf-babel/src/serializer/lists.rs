//! List renderers: bullet, ordered and task lists.

use crate::ast::Node;
use crate::config::{OrderedListStyle, UnknownPolicy};
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::blocks::indent;
use super::RenderState;

impl RenderState<'_> {
    pub(crate) fn render_bullet_list(&mut self, node: &Node) -> Result<String, ConvertError> {
        let marker = format!("{} ", self.config.bullet_marker);
        self.render_list_items(&node.content, "bulletList", |_| marker.clone())
    }

    pub(crate) fn render_ordered_list(&mut self, node: &Node) -> Result<String, ConvertError> {
        let start = node.int_attr("order", 1);
        let style = self.config.ordered_list_style;
        self.render_list_items(&node.content, "orderedList", move |index| match style {
            OrderedListStyle::Incremental => format!("{}. ", start + index as i64),
            OrderedListStyle::Lazy => format!("{start}. "),
        })
    }

    /// Shared list walk: rejects non-`listItem` children per the unknown
    /// policy, renders each item and indents continuation lines to the
    /// marker width.
    fn render_list_items(
        &mut self,
        children: &[Node],
        list_kind: &str,
        marker_for: impl Fn(usize) -> String,
    ) -> Result<String, ConvertError> {
        let mut out = String::new();
        let mut index = 0;

        for child in children {
            self.check_cancelled()?;

            if child.kind != "listItem" {
                if self.config.unknown_nodes == UnknownPolicy::Error {
                    return Err(ConvertError::Parse(format!(
                        "{list_kind} expects listItem child, got {}",
                        child.kind
                    )));
                }
                self.warn(
                    WarningKind::UnknownNode,
                    &child.kind,
                    format!("{list_kind} expects listItem child, got {}", child.kind),
                );
                continue;
            }

            let item_content = self.render_list_item_content(&child.content)?;
            out.push_str(&indent(&item_content, &marker_for(index)));
            out.push('\n');
            index += 1;
        }

        out.push('\n');
        Ok(out)
    }

    pub(crate) fn render_task_list(&mut self, node: &Node) -> Result<String, ConvertError> {
        let mut out = String::new();

        for child in &node.content {
            self.check_cancelled()?;

            match child.kind.as_str() {
                "taskItem" => out.push_str(&self.render_task_item(child)?),
                "taskList" => {
                    // Nested task lists indent two spaces under their parent.
                    let nested = self.render_task_list(child)?;
                    for line in nested.trim_end_matches('\n').split('\n') {
                        if line.is_empty() {
                            out.push('\n');
                        } else {
                            out.push_str("  ");
                            out.push_str(line);
                            out.push('\n');
                        }
                    }
                }
                other => {
                    if self.config.unknown_nodes == UnknownPolicy::Error {
                        return Err(ConvertError::Parse(format!(
                            "taskList expects taskItem child, got {other}"
                        )));
                    }
                    self.warn(
                        WarningKind::UnknownNode,
                        other,
                        format!("taskList expects taskItem child, got {other}"),
                    );
                }
            }
        }

        out.push('\n');
        Ok(out)
    }

    pub(crate) fn render_task_item(&mut self, node: &Node) -> Result<String, ConvertError> {
        let marker = if node.str_attr("state", "TODO") == "DONE" {
            "- [x] "
        } else {
            "- [ ] "
        };

        let content = self.render_inline_content(&node.content)?;
        Ok(format!("{}\n", indent(&content, marker)))
    }

    /// Item bodies keep block separation: each child is right-trimmed and
    /// children join with a blank line.
    pub(crate) fn render_list_item_content(
        &mut self,
        content: &[Node],
    ) -> Result<String, ConvertError> {
        let mut parts = Vec::new();
        for child in content {
            let rendered = self.render_node(child)?;
            parts.push(rendered.trim_end_matches('\n').to_string());
        }
        Ok(parts.join("\n\n"))
    }
}
