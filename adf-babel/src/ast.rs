//! Core data structures for the ADF document tree.
//!
//! The tree mirrors the wire format exactly: every node is a `type` tag plus
//! optional `text`, `content`, `marks` and an open attribute bag. Unknown
//! attribute keys are carried verbatim so that nodes we do not interpret
//! still round-trip byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute bag shared by nodes and marks.
pub type Attrs = Map<String, Value>;

/// Root of an ADF document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    /// Always 1 on the wire; tolerated when absent on input.
    #[serde(default)]
    pub version: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

impl Doc {
    /// An empty version-1 document.
    pub fn new() -> Self {
        Doc {
            version: 1,
            kind: "doc".to_string(),
            content: Vec::new(),
        }
    }
}

impl Default for Doc {
    fn default() -> Self {
        Doc::new()
    }
}

/// Any node in the ADF tree (paragraph, text, table, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    /// Legacy top-level heading level; modern documents carry `attrs.level`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

/// Inline formatting applied to a text node (strong, em, link, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
}

impl Node {
    /// A node with the given kind and no payload.
    pub fn bare(kind: &str) -> Self {
        Node {
            kind: kind.to_string(),
            ..Node::default()
        }
    }

    /// A text node with optional marks.
    pub fn text(value: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node {
            kind: "text".to_string(),
            text: Some(value.into()),
            marks,
            ..Node::default()
        }
    }

    /// Borrow the text payload, empty for non-text nodes.
    pub fn text_value(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// String attribute, or the default when absent or not a string.
    pub fn str_attr<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        str_attr_of(self.attrs.as_ref(), key, default)
    }

    /// Integer attribute; JSON numbers arrive as floats and are truncated.
    pub fn int_attr(&self, key: &str, default: i64) -> i64 {
        int_attr_of(self.attrs.as_ref(), key, default)
    }

    /// Float attribute, or the default when absent or not numeric.
    pub fn float_attr(&self, key: &str, default: f64) -> f64 {
        match self.attrs.as_ref().and_then(|attrs| attrs.get(key)) {
            Some(value) => value.as_f64().unwrap_or(default),
            None => default,
        }
    }

    /// Insert an attribute, creating the bag on first use.
    pub fn set_attr(&mut self, key: &str, value: Value) {
        self.attrs
            .get_or_insert_with(Attrs::new)
            .insert(key.to_string(), value);
    }
}

impl Mark {
    /// A mark with the given kind and no attributes.
    pub fn bare(kind: &str) -> Self {
        Mark {
            kind: kind.to_string(),
            attrs: None,
        }
    }

    /// A mark with a single string attribute.
    pub fn with_attr(kind: &str, key: &str, value: impl Into<String>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert(key.to_string(), Value::String(value.into()));
        Mark {
            kind: kind.to_string(),
            attrs: Some(attrs),
        }
    }

    /// String attribute, or the default when absent or not a string.
    pub fn str_attr<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        str_attr_of(self.attrs.as_ref(), key, default)
    }
}

fn str_attr_of<'a>(attrs: Option<&'a Attrs>, key: &str, default: &'a str) -> &'a str {
    match attrs.and_then(|attrs| attrs.get(key)) {
        Some(Value::String(value)) => value,
        _ => default,
    }
}

fn int_attr_of(attrs: Option<&Attrs>, key: &str, default: i64) -> i64 {
    match attrs.and_then(|attrs| attrs.get(key)) {
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|float| float as i64))
            .unwrap_or(default),
        None => default,
    }
}
