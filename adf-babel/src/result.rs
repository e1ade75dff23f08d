//! Conversion result envelopes and the warning taxonomy.

use serde::{Deserialize, Serialize};

/// Categories of non-fatal conversion observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnknownNode,
    UnknownMark,
    DroppedFeature,
    ExtensionFallback,
    MissingAttribute,
    UnresolvedReference,
}

/// A non-fatal issue encountered during conversion.
///
/// Warnings never imply partial output; every accepted result is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    #[serde(rename = "nodeType", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, node_type: &str, message: impl Into<String>) -> Self {
        Warning {
            kind,
            node_type: if node_type.is_empty() {
                None
            } else {
                Some(node_type.to_string())
            },
            message: message.into(),
        }
    }
}

/// Output of an ADF → Markdown conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    pub markdown: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Output of a Markdown → ADF conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Serialized ADF JSON.
    pub adf: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_serializes_with_wire_names() {
        let warning = Warning::new(WarningKind::UnknownNode, "mysteryNode", "skipped");
        let json = serde_json::to_string(&warning).unwrap();
        assert_eq!(
            json,
            r#"{"type":"unknown_node","nodeType":"mysteryNode","message":"skipped"}"#
        );
    }

    #[test]
    fn empty_node_type_is_omitted() {
        let warning = Warning::new(WarningKind::DroppedFeature, "", "dropped");
        let json = serde_json::to_string(&warning).unwrap();
        assert_eq!(json, r#"{"type":"dropped_feature","message":"dropped"}"#);
    }
}
