//! Error types for conversion operations

use std::fmt;

/// Errors that can abort a conversion in either direction
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// Input could not be parsed (malformed ADF JSON)
    Parse(String),
    /// Configuration rejected by validation
    Config(String),
    /// Unknown node kind under the `error` policy
    UnknownNode(String),
    /// Unknown mark kind under the `error` policy
    UnknownMark(String),
    /// A hook failed or returned invalid output
    Hook(String),
    /// An extension handler failed or an embedded payload was malformed
    Extension(String),
    /// The cancellation token was tripped
    Cancelled,
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Parse(msg) => write!(f, "parse error: {msg}"),
            ConvertError::Config(msg) => write!(f, "invalid config: {msg}"),
            ConvertError::UnknownNode(kind) => write!(f, "unknown node type: {kind}"),
            ConvertError::UnknownMark(kind) => write!(f, "unknown mark type: {kind}"),
            ConvertError::Hook(msg) => write!(f, "hook error: {msg}"),
            ConvertError::Extension(msg) => write!(f, "extension error: {msg}"),
            ConvertError::Cancelled => write!(f, "conversion cancelled"),
        }
    }
}

impl std::error::Error for ConvertError {}
