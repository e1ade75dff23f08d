//! Forward (ADF → Markdown) configuration surface.
//!
//! The config is a record of enumerated strategy selectors plus value maps
//! and callback slots. `Config::default()` is the documented default set;
//! callers override individual fields with record-update syntax. Engine
//! construction validates the record and stores a deep clone, so mutating
//! the caller's maps afterwards cannot change engine behavior.

use std::collections::HashMap;
use std::fmt;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::hooks::{
    LinkRenderHook, MediaRenderHook, ResolutionMode, SharedExtensionHandler,
};

/// How underline marks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderlineStyle {
    Ignore,
    Bold,
    Html,
    Pandoc,
}

/// How subscript/superscript marks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubSupStyle {
    Ignore,
    Html,
    Latex,
    Pandoc,
}

/// How text/background color marks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorStyle {
    Ignore,
    Html,
    Pandoc,
}

/// How user mentions are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionStyle {
    Text,
    Link,
    Html,
    Pandoc,
}

/// How emoji nodes are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmojiStyle {
    Shortcode,
    Unicode,
}

/// How info/note/warning panels are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelStyle {
    None,
    Bold,
    Github,
    Title,
}

/// How hard line breaks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardBreakStyle {
    Backslash,
    Html,
}

/// How block alignment is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentStyle {
    Ignore,
    Html,
    Pandoc,
}

/// How expand/collapse sections are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandStyle {
    Blockquote,
    Html,
    Pandoc,
}

/// How status badges are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusStyle {
    Bracket,
    Text,
}

/// How smart links / inline cards are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineCardStyle {
    Link,
    Url,
    Embed,
    Pandoc,
}

/// How layout sections and columns are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSectionStyle {
    Standard,
    Html,
    Pandoc,
}

/// How bodied extensions are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodiedExtensionStyle {
    Standard,
    Html,
    Pandoc,
    Json,
}

/// Prefix used for decision items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStyle {
    Emoji,
    Text,
}

/// Ordered list numbering behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderedListStyle {
    Incremental,
    Lazy,
}

/// Table emission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    Auto,
    Pipe,
    Html,
    Pandoc,
    Autopandoc,
}

/// Fallback handling for extension nodes without a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionMode {
    Json,
    Text,
    Strip,
}

/// Behavior for unrecognized ADF elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    Error,
    Skip,
    Placeholder,
}

/// Per-extension-type strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRules {
    pub default: ExtensionMode,
    #[serde(rename = "byType", default, skip_serializing_if = "HashMap::is_empty")]
    pub by_type: HashMap<String, ExtensionMode>,
}

impl ExtensionRules {
    /// Resolve the mode for a specific extension type.
    pub fn mode_for(&self, extension_type: &str) -> ExtensionMode {
        if !extension_type.is_empty() {
            if let Some(mode) = self.by_type.get(extension_type) {
                return *mode;
            }
        }
        self.default
    }
}

impl Default for ExtensionRules {
    fn default() -> Self {
        ExtensionRules {
            default: ExtensionMode::Json,
            by_type: HashMap::new(),
        }
    }
}

/// All forward converter options.
#[derive(Clone)]
pub struct Config {
    pub underline_style: UnderlineStyle,
    pub sub_sup_style: SubSupStyle,
    pub text_color_style: ColorStyle,
    pub background_color_style: ColorStyle,
    pub mention_style: MentionStyle,
    pub emoji_style: EmojiStyle,
    pub panel_style: PanelStyle,
    /// Added to every heading level before clamping to 1..=6.
    pub heading_offset: i64,
    pub hard_break_style: HardBreakStyle,
    pub alignment_style: AlignmentStyle,
    pub expand_style: ExpandStyle,
    pub status_style: StatusStyle,
    pub inline_card_style: InlineCardStyle,
    pub layout_section_style: LayoutSectionStyle,
    pub bodied_extension_style: BodiedExtensionStyle,
    pub decision_style: DecisionStyle,
    /// strftime layout used for `date` nodes.
    pub date_format: String,
    pub table_mode: TableMode,
    /// One of `-`, `*`, `+`.
    pub bullet_marker: char,
    pub ordered_list_style: OrderedListStyle,
    pub extensions: ExtensionRules,
    /// Prefix for synthesising URLs for internal media ids.
    pub media_base_url: String,
    pub resolution_mode: ResolutionMode,
    /// Renames code block languages on the way out.
    pub language_map: HashMap<String, String>,
    pub unknown_nodes: UnknownPolicy,
    pub unknown_marks: UnknownPolicy,
    pub link_hook: Option<LinkRenderHook>,
    pub media_hook: Option<MediaRenderHook>,
    pub extension_handlers: HashMap<String, SharedExtensionHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            underline_style: UnderlineStyle::Bold,
            sub_sup_style: SubSupStyle::Html,
            text_color_style: ColorStyle::Ignore,
            background_color_style: ColorStyle::Ignore,
            mention_style: MentionStyle::Link,
            emoji_style: EmojiStyle::Shortcode,
            panel_style: PanelStyle::Github,
            heading_offset: 0,
            hard_break_style: HardBreakStyle::Backslash,
            alignment_style: AlignmentStyle::Ignore,
            expand_style: ExpandStyle::Html,
            status_style: StatusStyle::Bracket,
            inline_card_style: InlineCardStyle::Link,
            layout_section_style: LayoutSectionStyle::Standard,
            bodied_extension_style: BodiedExtensionStyle::Pandoc,
            decision_style: DecisionStyle::Emoji,
            date_format: "%Y-%m-%d".to_string(),
            table_mode: TableMode::Auto,
            bullet_marker: '-',
            ordered_list_style: OrderedListStyle::Incremental,
            extensions: ExtensionRules::default(),
            media_base_url: String::new(),
            resolution_mode: ResolutionMode::BestEffort,
            language_map: HashMap::new(),
            unknown_nodes: UnknownPolicy::Placeholder,
            unknown_marks: UnknownPolicy::Skip,
            link_hook: None,
            media_hook: None,
            extension_handlers: HashMap::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("underline_style", &self.underline_style)
            .field("sub_sup_style", &self.sub_sup_style)
            .field("text_color_style", &self.text_color_style)
            .field("background_color_style", &self.background_color_style)
            .field("mention_style", &self.mention_style)
            .field("emoji_style", &self.emoji_style)
            .field("panel_style", &self.panel_style)
            .field("heading_offset", &self.heading_offset)
            .field("hard_break_style", &self.hard_break_style)
            .field("alignment_style", &self.alignment_style)
            .field("expand_style", &self.expand_style)
            .field("status_style", &self.status_style)
            .field("inline_card_style", &self.inline_card_style)
            .field("layout_section_style", &self.layout_section_style)
            .field("bodied_extension_style", &self.bodied_extension_style)
            .field("decision_style", &self.decision_style)
            .field("date_format", &self.date_format)
            .field("table_mode", &self.table_mode)
            .field("bullet_marker", &self.bullet_marker)
            .field("ordered_list_style", &self.ordered_list_style)
            .field("extensions", &self.extensions)
            .field("media_base_url", &self.media_base_url)
            .field("resolution_mode", &self.resolution_mode)
            .field("language_map", &self.language_map)
            .field("unknown_nodes", &self.unknown_nodes)
            .field("unknown_marks", &self.unknown_marks)
            .field("link_hook", &self.link_hook.is_some())
            .field("media_hook", &self.media_hook.is_some())
            .field(
                "extension_handlers",
                &self.extension_handlers.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Config {
    /// Check that every field holds an allowed value.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !(0..=5).contains(&self.heading_offset) {
            return Err(ConvertError::Config(format!(
                "headingOffset must be between 0 and 5, got {}",
                self.heading_offset
            )));
        }
        if !matches!(self.bullet_marker, '-' | '*' | '+') {
            return Err(ConvertError::Config(format!(
                "invalid bulletMarker {:?}: must be one of -, *, +",
                self.bullet_marker
            )));
        }
        if !is_valid_date_format(&self.date_format) {
            return Err(ConvertError::Config(format!(
                "invalid dateFormat {:?}: must be a strftime layout with at least one date or time field",
                self.date_format
            )));
        }
        for extension_type in self.extensions.by_type.keys() {
            if extension_type.trim().is_empty() {
                return Err(ConvertError::Config(
                    "extensions.byType contains empty key".to_string(),
                ));
            }
        }
        for (from, to) in &self.language_map {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(ConvertError::Config(
                    "languageMap keys and values must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A usable date layout parses without errors and contains at least one
/// real date or time field (a bare literal like `"date"` is rejected).
pub(crate) fn is_valid_date_format(format: &str) -> bool {
    let trimmed = format.trim();
    if trimmed.is_empty() {
        return false;
    }

    let items: Vec<Item<'_>> = StrftimeItems::new(trimmed).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return false;
    }
    items
        .iter()
        .any(|item| matches!(item, Item::Numeric(_, _) | Item::Fixed(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn heading_offset_range_is_enforced() {
        let config = Config {
            heading_offset: 6,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bullet_marker_is_restricted() {
        let config = Config {
            bullet_marker: '>',
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn date_format_needs_a_reference_token() {
        assert!(is_valid_date_format("%Y-%m-%d"));
        assert!(is_valid_date_format("%d %B %Y"));
        assert!(!is_valid_date_format("plain text"));
        assert!(!is_valid_date_format(""));
        assert!(!is_valid_date_format("%Q"));
    }

    #[test]
    fn empty_language_map_entries_are_rejected() {
        let mut config = Config::default();
        config.language_map.insert("  ".to_string(), "go".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn extension_mode_resolution_prefers_by_type() {
        let mut rules = ExtensionRules::default();
        rules
            .by_type
            .insert("com.example.macro".to_string(), ExtensionMode::Strip);
        assert_eq!(rules.mode_for("com.example.macro"), ExtensionMode::Strip);
        assert_eq!(rules.mode_for("other"), ExtensionMode::Json);
        assert_eq!(rules.mode_for(""), ExtensionMode::Json);
    }
}
