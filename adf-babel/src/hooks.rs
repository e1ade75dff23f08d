//! Caller-supplied hooks for rewriting links, media and extensions.
//!
//! Hooks let a host application resolve references the converter cannot
//! (issue-tracker page links, attachment ids, plugin macros). Every hook
//! receives the conversion's [`CancelToken`] so blocking work inside it can
//! observe cancellation. The engines guarantee sequential invocation within
//! a conversion but nothing across conversions; hook implementations that
//! keep state must synchronise internally.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ast::{Attrs, Node};
use crate::cancel::CancelToken;

/// Failure modes a hook can signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The reference exists but the hook cannot resolve it. Downgraded to a
    /// warning unless `resolutionMode` is strict.
    Unresolved,
    /// The hook observed cancellation; aborts the conversion.
    Cancelled,
    /// Any other hook failure; aborts the conversion.
    Failed(String),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Unresolved => write!(f, "unresolved link or media reference"),
            HookError::Cancelled => write!(f, "hook observed cancellation"),
            HookError::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for HookError {}

/// How unresolved hook results are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Continue conversion and fall back to built-in behavior.
    BestEffort,
    /// Fail the conversion when a hook reports an unresolved reference.
    Strict,
}

/// Which surface a link render hook was invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    Mark,
    InlineCard,
}

/// Common typed metadata harvested for link hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMetadata {
    pub page_id: String,
    pub space_key: String,
    pub attachment_id: String,
    pub filename: String,
    pub anchor: String,
}

/// Common typed metadata harvested for media hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub page_id: String,
    pub space_key: String,
    pub attachment_id: String,
    pub filename: String,
    pub anchor: String,
}

/// A link surface being rendered (ADF → Markdown).
#[derive(Debug, Clone)]
pub struct LinkRenderInput {
    pub source: LinkSource,
    pub source_path: String,
    pub href: String,
    pub title: String,
    pub text: String,
    pub meta: LinkMetadata,
    /// Cloned attribute bag of the mark or node; safe to inspect freely.
    pub attrs: Option<Attrs>,
}

/// Hook-provided link rendering overrides.
#[derive(Debug, Clone, Default)]
pub struct LinkRenderOutput {
    pub href: String,
    pub title: String,
    /// Emit plain text and strip the link entirely.
    pub text_only: bool,
    pub handled: bool,
}

/// A media node being rendered (ADF → Markdown).
#[derive(Debug, Clone)]
pub struct MediaRenderInput {
    pub source_path: String,
    pub media_type: String,
    pub id: String,
    pub url: String,
    pub alt: String,
    pub meta: MediaMetadata,
    pub attrs: Option<Attrs>,
}

/// Hook-provided markdown replacing the built-in media rendering.
#[derive(Debug, Clone, Default)]
pub struct MediaRenderOutput {
    pub markdown: String,
    pub handled: bool,
}

/// A markdown link being parsed (Markdown → ADF).
#[derive(Debug, Clone)]
pub struct LinkParseInput {
    pub source_path: String,
    pub destination: String,
    pub title: String,
    pub text: String,
    pub meta: LinkMetadata,
}

/// Hook-provided link parsing overrides. `force_link` and `force_card` are
/// mutually exclusive.
#[derive(Debug, Clone, Default)]
pub struct LinkParseOutput {
    pub destination: String,
    pub title: String,
    pub force_link: bool,
    pub force_card: bool,
    pub handled: bool,
}

/// A markdown image destination being parsed (Markdown → ADF).
#[derive(Debug, Clone)]
pub struct MediaParseInput {
    pub source_path: String,
    pub destination: String,
    pub alt: String,
    pub meta: MediaMetadata,
}

/// Hook-provided media parsing overrides. Exactly one of `id` and `url`
/// must be set when handled.
#[derive(Debug, Clone, Default)]
pub struct MediaParseOutput {
    pub media_type: String,
    pub id: String,
    pub url: String,
    pub alt: String,
    pub handled: bool,
}

/// Rewrites link output during ADF → Markdown conversion.
pub type LinkRenderHook =
    Arc<dyn Fn(&CancelToken, LinkRenderInput) -> Result<LinkRenderOutput, HookError> + Send + Sync>;

/// Overrides media output during ADF → Markdown conversion.
pub type MediaRenderHook = Arc<
    dyn Fn(&CancelToken, MediaRenderInput) -> Result<MediaRenderOutput, HookError> + Send + Sync,
>;

/// Rewrites markdown links during Markdown → ADF conversion.
pub type LinkParseHook =
    Arc<dyn Fn(&CancelToken, LinkParseInput) -> Result<LinkParseOutput, HookError> + Send + Sync>;

/// Maps markdown image destinations to media attributes.
pub type MediaParseHook =
    Arc<dyn Fn(&CancelToken, MediaParseInput) -> Result<MediaParseOutput, HookError> + Send + Sync>;

/// String metadata attached to a rendered extension div.
pub type ExtensionMetadata = BTreeMap<String, String>;

/// Input for [`ExtensionHandler::to_markdown`].
#[derive(Debug, Clone)]
pub struct ExtensionRenderInput {
    pub source_path: String,
    pub node: Node,
}

/// Output of [`ExtensionHandler::to_markdown`]. Metadata values are emitted
/// as sorted `k="v"` attributes of the wrapping `.adf-extension` div.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRenderOutput {
    pub markdown: String,
    pub metadata: ExtensionMetadata,
    pub handled: bool,
}

/// Input for [`ExtensionHandler::from_markdown`].
#[derive(Debug, Clone)]
pub struct ExtensionParseInput {
    pub source_path: String,
    pub extension_key: String,
    /// Raw markdown content inside the `.adf-extension` div.
    pub body: String,
    /// Div attributes minus the key and the `.adf-extension` class.
    pub metadata: ExtensionMetadata,
}

/// Output of [`ExtensionHandler::from_markdown`]. When `handled` is false
/// the engine falls through to the generic extension strategy.
#[derive(Debug, Clone, Default)]
pub struct ExtensionParseOutput {
    pub node: Node,
    pub handled: bool,
}

/// Bidirectional handler for a single extension key.
pub trait ExtensionHandler: Send + Sync {
    fn to_markdown(
        &self,
        cancel: &CancelToken,
        input: ExtensionRenderInput,
    ) -> Result<ExtensionRenderOutput, HookError>;

    fn from_markdown(
        &self,
        cancel: &CancelToken,
        input: ExtensionParseInput,
    ) -> Result<ExtensionParseOutput, HookError>;
}

/// Shared handle to an extension handler, cloneable into engine configs.
pub type SharedExtensionHandler = Arc<dyn ExtensionHandler>;

pub(crate) fn link_metadata_from_attrs(attrs: Option<&Attrs>, href: &str) -> LinkMetadata {
    let (filename, anchor) = parse_reference_details(href);

    let mut meta = LinkMetadata {
        page_id: lookup_metadata_value(attrs, &["pageId", "pageID", "contentId"]),
        space_key: lookup_metadata_value(attrs, &["spaceKey", "space"]),
        attachment_id: lookup_metadata_value(attrs, &["attachmentId", "attachmentID", "mediaId"]),
        filename: lookup_metadata_value(attrs, &["filename", "fileName", "name"]),
        anchor: lookup_metadata_value(attrs, &["anchor", "fragment"]),
    };

    if meta.filename.is_empty() {
        meta.filename = filename;
    }
    if meta.anchor.is_empty() {
        meta.anchor = anchor;
    }

    meta
}

pub(crate) fn media_metadata_from_attrs(
    attrs: Option<&Attrs>,
    id: &str,
    media_url: &str,
) -> MediaMetadata {
    let (filename, anchor) = parse_reference_details(media_url);

    let mut meta = MediaMetadata {
        page_id: lookup_metadata_value(attrs, &["pageId", "pageID", "contentId"]),
        space_key: lookup_metadata_value(attrs, &["spaceKey", "space"]),
        attachment_id: lookup_metadata_value(
            attrs,
            &["attachmentId", "attachmentID", "mediaId", "id"],
        ),
        filename: lookup_metadata_value(attrs, &["filename", "fileName", "name"]),
        anchor: lookup_metadata_value(attrs, &["anchor", "fragment"]),
    };

    if meta.attachment_id.is_empty() {
        meta.attachment_id = id.trim().to_string();
    }
    if meta.filename.is_empty() {
        meta.filename = filename;
    }
    if meta.anchor.is_empty() {
        meta.anchor = anchor;
    }

    meta
}

pub(crate) fn link_metadata_from_destination(destination: &str) -> LinkMetadata {
    let (filename, anchor) = parse_reference_details(destination);
    LinkMetadata {
        filename,
        anchor,
        ..LinkMetadata::default()
    }
}

pub(crate) fn media_metadata_from_destination(destination: &str) -> MediaMetadata {
    let (filename, anchor) = parse_reference_details(destination);
    MediaMetadata {
        filename,
        anchor,
        ..MediaMetadata::default()
    }
}

/// Case-, underscore- and dash-insensitive key lookup over the attribute
/// bag, descending into nested objects up to depth 2.
fn lookup_metadata_value(attrs: Option<&Attrs>, candidates: &[&str]) -> String {
    let attrs = match attrs {
        Some(attrs) if !attrs.is_empty() => attrs,
        _ => return String::new(),
    };

    let maps = collect_metadata_maps(attrs, 0);
    for candidate in candidates {
        let normalized = normalize_metadata_key(candidate);
        if normalized.is_empty() {
            continue;
        }
        for map in &maps {
            if let Some(value) = lookup_in_map(map, &normalized) {
                return value;
            }
        }
    }

    String::new()
}

fn collect_metadata_maps<'a>(attrs: &'a Attrs, depth: usize) -> Vec<&'a Attrs> {
    if attrs.is_empty() || depth > 2 {
        return Vec::new();
    }

    let mut result = vec![attrs];
    for value in attrs.values() {
        if let serde_json::Value::Object(nested) = value {
            if !nested.is_empty() {
                result.extend(collect_metadata_maps(nested, depth + 1));
            }
        }
    }

    result
}

fn lookup_in_map(attrs: &Attrs, normalized_key: &str) -> Option<String> {
    for (key, raw) in attrs {
        if normalize_metadata_key(key) != normalized_key {
            continue;
        }
        if let serde_json::Value::String(value) = raw {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn normalize_metadata_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .filter(|ch| !matches!(ch, '_' | '-' | ' '))
        .collect()
}

/// Split a reference into (filename, anchor). Absolute URLs go through the
/// url crate; relative references fall back to manual splitting.
pub(crate) fn parse_reference_details(reference: &str) -> (String, String) {
    let reference = reference.trim();
    if reference.is_empty() {
        return (String::new(), String::new());
    }

    match Url::parse(reference) {
        Ok(parsed) => {
            let anchor = parsed.fragment().unwrap_or("").trim().to_string();
            let mut path = parsed.path().to_string();
            if path.is_empty() {
                path = reference.to_string();
            }
            let path = path.replace('\\', "/");
            let path = path.trim_end_matches('/');
            if path.is_empty() {
                return (String::new(), anchor);
            }
            (base_name(path), anchor)
        }
        Err(_) => parse_reference_details_fallback(reference),
    }
}

fn parse_reference_details_fallback(reference: &str) -> (String, String) {
    let (path, anchor) = match reference.rfind('#') {
        Some(index) => (
            &reference[..index],
            reference[index + 1..].trim().to_string(),
        ),
        None => (reference, String::new()),
    };

    let path = path.replace('\\', "/");
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return (String::new(), anchor);
    }

    (base_name(path), anchor)
}

fn base_name(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or("").trim();
    if name == "." || name == "/" {
        String::new()
    } else {
        name.to_string()
    }
}
