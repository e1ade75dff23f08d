//! Ambient mark stack for the inline traversal, plus the coalescing
//! append used everywhere inline nodes are accumulated.

use crate::ast::{Mark, Node};

/// Stack of marks active at the current point of the inline walk. Each
/// emitted text node captures a snapshot of the stack.
#[derive(Debug, Default)]
pub(crate) struct MarkStack {
    items: Vec<Mark>,
}

impl MarkStack {
    pub(crate) fn new() -> Self {
        MarkStack::default()
    }

    pub(crate) fn push(&mut self, mark: Mark) {
        self.items.push(mark);
    }

    /// Remove the topmost mark of the given kind, searching from the top.
    pub(crate) fn pop_by_kind(&mut self, kind: &str) -> bool {
        for index in (0..self.items.len()).rev() {
            if self.items[index].kind == kind {
                self.items.remove(index);
                return true;
            }
        }
        false
    }

    /// Snapshot of the currently active marks.
    pub(crate) fn current(&self) -> Vec<Mark> {
        self.items.clone()
    }
}

/// Structural equality of two mark lists (kind and attribute bags).
pub(crate) fn mark_lists_equal(left: &[Mark], right: &[Mark]) -> bool {
    left == right
}

pub(crate) fn new_text_node(text: impl Into<String>, marks: Vec<Mark>) -> Node {
    Node::text(text, marks)
}

/// Append an inline node, merging adjacent text nodes that carry the same
/// mark list and dropping empty text nodes.
pub(crate) fn append_inline_node(content: &mut Vec<Node>, next: Node) {
    if next.kind == "text" && next.text_value().is_empty() {
        return;
    }

    if let Some(last) = content.last_mut() {
        if last.kind == "text"
            && next.kind == "text"
            && mark_lists_equal(&last.marks, &next.marks)
        {
            let mut text = last.text.take().unwrap_or_default();
            text.push_str(next.text_value());
            last.text = Some(text);
            return;
        }
    }

    content.push(next);
}
