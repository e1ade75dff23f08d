//! Policy-driven conversion between ADF documents and GitHub-Flavored Markdown
//!
//! This crate converts both ways between the Abstract Document Format (the
//! JSON node/mark tree produced by a hosted issue tracker's rich-text
//! editor) and GFM, optionally extended with a small HTML subset and a
//! Pandoc attribute dialect.
//!
//! The source format has dozens of constructs with no canonical Markdown
//! shape (panels, expands, decisions, mentions, smart links, merged-cell
//! tables, colored text, layout columns, plugin extensions). For each one
//! the converter offers several rendering strategies selected by config,
//! and the reverse direction recognises those shapes and rebuilds the
//! original node. Lossy choices are auditable: every dropped or degraded
//! construct is recorded in the result's warning log.
//!
//! This is a pure lib: it powers adf-cli but is shell agnostic. No code
//! here assumes a shell environment, std printing, env vars etc.
//!
//! Architecture
//!
//! Two engines share one data model:
//!
//! ```text
//! ADF JSON ──serde──▶ ast::Doc ──MarkdownSerializer──▶ Markdown
//! Markdown ──comrak──▶ AST ──MarkdownParser──▶ ast::Doc ──serde──▶ ADF JSON
//! ```
//!
//! The file structure:
//! ```text
//! .
//! ├── ast.rs              # Doc / Node / Mark data model
//! ├── cancel.rs           # Cooperative cancellation token
//! ├── config.rs           # Forward strategy selectors
//! ├── error.rs            # ConvertError
//! ├── hooks.rs            # Link/media/extension hook protocol
//! ├── result.rs           # Warnings and result envelopes
//! ├── serializer          # ADF → Markdown engine
//! └── parser              # Markdown → ADF engine (reverse config lives here)
//! ```
//!
//! Library Choices
//!
//! We offload format mechanics to specialized crates and keep this crate
//! focused on the mapping between the two trees:
//! - `comrak` parses GFM (tables, strikethrough, task lists, autolinks).
//!   Markdown *emission* is hand-built: the strategy matrix needs
//!   character-exact control over delimiters, indentation and escaping
//!   that a generic serializer does not give us.
//! - `serde`/`serde_json` frame the ADF wire format; unknown attributes
//!   ride through untouched as `serde_json::Value`.
//! - `html5ever` + `markup5ever_rcdom` parse embedded HTML tables,
//!   tolerant of the malformed markup real documents contain.
//! - `regex` + `once_cell` back the detector patterns, `chrono` formats
//!   date nodes, `url` splits hook reference metadata.
//!
//! Concurrency
//!
//! Engines are immutable after construction and safe to share across
//! threads; each conversion allocates its own state. Cancellation is
//! cooperative via [`CancelToken`], polled at every suspension point and
//! passed into hooks.

pub mod ast;
pub mod cancel;
pub mod config;
pub mod error;
pub mod hooks;
pub mod parser;
pub mod result;
pub mod serializer;

pub use ast::{Attrs, Doc, Mark, Node};
pub use cancel::CancelToken;
pub use config::Config;
pub use error::ConvertError;
pub use hooks::{ExtensionHandler, HookError, ResolutionMode};
pub use parser::{MarkdownParser, ParseOptions, ReverseConfig};
pub use result::{ParseResult, RenderResult, Warning, WarningKind};
pub use serializer::{MarkdownSerializer, RenderOptions};
