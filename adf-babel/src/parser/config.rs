//! Reverse (Markdown → ADF) configuration surface.
//!
//! Detection selectors mirror the forward strategy enums and decide which
//! markdown shapes are recognised as structured nodes versus left as
//! literal text. `all` accepts every known variant of a construct.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::is_valid_date_format;
use crate::error::ConvertError;
use crate::hooks::{LinkParseHook, MediaParseHook, ResolutionMode, SharedExtensionHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionDetection {
    None,
    Link,
    At,
    Html,
    Pandoc,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderlineDetection {
    None,
    Html,
    Pandoc,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubSupDetection {
    None,
    Html,
    Pandoc,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorDetection {
    None,
    Html,
    Pandoc,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentDetection {
    None,
    Html,
    Pandoc,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmojiDetection {
    None,
    Shortcode,
    Unicode,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusDetection {
    None,
    Bracket,
    Text,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateDetection {
    None,
    Iso,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelDetection {
    None,
    Bold,
    Github,
    Title,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandDetection {
    None,
    Blockquote,
    Html,
    Pandoc,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineCardDetection {
    None,
    Link,
    Pandoc,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionDetection {
    None,
    Emoji,
    Text,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodiedExtensionDetection {
    None,
    Html,
    Pandoc,
    All,
}

/// All reverse converter options.
#[derive(Clone)]
pub struct ReverseConfig {
    pub mention_detection: MentionDetection,
    pub underline_detection: UnderlineDetection,
    pub sub_sup_detection: SubSupDetection,
    pub color_detection: ColorDetection,
    pub alignment_detection: AlignmentDetection,
    pub emoji_detection: EmojiDetection,
    pub status_detection: StatusDetection,
    pub date_detection: DateDetection,
    pub panel_detection: PanelDetection,
    pub expand_detection: ExpandDetection,
    pub inline_card_detection: InlineCardDetection,
    pub table_grid_detection: bool,
    pub decision_detection: DecisionDetection,
    pub bodied_extension_detection: BodiedExtensionDetection,

    /// strftime layout used when parsing detected dates.
    pub date_format: String,
    /// Added to every heading level before clamping; may be negative.
    pub heading_offset: i64,
    pub language_map: HashMap<String, String>,
    /// Image destinations under this prefix become internal media ids.
    pub media_base_url: String,
    /// Display name → account id; drives `@Name` detection.
    pub mention_registry: HashMap<String, String>,
    /// Shortcode → emoji id, reserved for registry-aware hosts.
    pub emoji_registry: HashMap<String, String>,
    pub resolution_mode: ResolutionMode,
    pub link_hook: Option<LinkParseHook>,
    pub media_hook: Option<MediaParseHook>,
    pub extension_handlers: HashMap<String, SharedExtensionHandler>,
}

impl Default for ReverseConfig {
    fn default() -> Self {
        ReverseConfig {
            mention_detection: MentionDetection::Link,
            underline_detection: UnderlineDetection::Html,
            sub_sup_detection: SubSupDetection::Html,
            color_detection: ColorDetection::Html,
            alignment_detection: AlignmentDetection::Html,
            emoji_detection: EmojiDetection::Shortcode,
            status_detection: StatusDetection::Bracket,
            date_detection: DateDetection::Iso,
            panel_detection: PanelDetection::Github,
            expand_detection: ExpandDetection::Html,
            inline_card_detection: InlineCardDetection::None,
            table_grid_detection: false,
            decision_detection: DecisionDetection::Emoji,
            bodied_extension_detection: BodiedExtensionDetection::Pandoc,
            date_format: "%Y-%m-%d".to_string(),
            heading_offset: 0,
            language_map: HashMap::new(),
            media_base_url: String::new(),
            mention_registry: HashMap::new(),
            emoji_registry: HashMap::new(),
            resolution_mode: ResolutionMode::BestEffort,
            link_hook: None,
            media_hook: None,
            extension_handlers: HashMap::new(),
        }
    }
}

impl fmt::Debug for ReverseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseConfig")
            .field("mention_detection", &self.mention_detection)
            .field("underline_detection", &self.underline_detection)
            .field("sub_sup_detection", &self.sub_sup_detection)
            .field("color_detection", &self.color_detection)
            .field("alignment_detection", &self.alignment_detection)
            .field("emoji_detection", &self.emoji_detection)
            .field("status_detection", &self.status_detection)
            .field("date_detection", &self.date_detection)
            .field("panel_detection", &self.panel_detection)
            .field("expand_detection", &self.expand_detection)
            .field("inline_card_detection", &self.inline_card_detection)
            .field("table_grid_detection", &self.table_grid_detection)
            .field("decision_detection", &self.decision_detection)
            .field(
                "bodied_extension_detection",
                &self.bodied_extension_detection,
            )
            .field("date_format", &self.date_format)
            .field("heading_offset", &self.heading_offset)
            .field("language_map", &self.language_map)
            .field("media_base_url", &self.media_base_url)
            .field("mention_registry", &self.mention_registry)
            .field("emoji_registry", &self.emoji_registry)
            .field("resolution_mode", &self.resolution_mode)
            .field("link_hook", &self.link_hook.is_some())
            .field("media_hook", &self.media_hook.is_some())
            .field(
                "extension_handlers",
                &self.extension_handlers.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ReverseConfig {
    /// Check that every field holds an allowed value.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !(-5..=5).contains(&self.heading_offset) {
            return Err(ConvertError::Config(format!(
                "headingOffset must be between -5 and 5, got {}",
                self.heading_offset
            )));
        }
        if !is_valid_date_format(&self.date_format) {
            return Err(ConvertError::Config(format!(
                "invalid dateFormat {:?}: must be a strftime layout with at least one date or time field",
                self.date_format
            )));
        }
        for (from, to) in &self.language_map {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(ConvertError::Config(
                    "languageMap keys and values must be non-empty".to_string(),
                ));
            }
        }
        for (name, id) in &self.mention_registry {
            if name.trim().is_empty() || id.trim().is_empty() {
                return Err(ConvertError::Config(
                    "mentionRegistry keys and values must be non-empty".to_string(),
                ));
            }
        }
        for (shortcode, id) in &self.emoji_registry {
            if shortcode.trim().is_empty() || id.trim().is_empty() {
                return Err(ConvertError::Config(
                    "emojiRegistry keys and values must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn detect_mention_link(&self) -> bool {
        matches!(
            self.mention_detection,
            MentionDetection::Link | MentionDetection::All
        )
    }

    pub(crate) fn detect_mention_at(&self) -> bool {
        matches!(
            self.mention_detection,
            MentionDetection::At | MentionDetection::All
        )
    }

    pub(crate) fn detect_mention_html(&self) -> bool {
        matches!(
            self.mention_detection,
            MentionDetection::Html | MentionDetection::All
        )
    }

    pub(crate) fn detect_mention_pandoc(&self) -> bool {
        matches!(
            self.mention_detection,
            MentionDetection::Pandoc | MentionDetection::All
        )
    }

    pub(crate) fn detect_underline_html(&self) -> bool {
        matches!(
            self.underline_detection,
            UnderlineDetection::Html | UnderlineDetection::All
        )
    }

    pub(crate) fn detect_underline_pandoc(&self) -> bool {
        matches!(
            self.underline_detection,
            UnderlineDetection::Pandoc | UnderlineDetection::All
        )
    }

    pub(crate) fn detect_sub_sup_html(&self) -> bool {
        matches!(
            self.sub_sup_detection,
            SubSupDetection::Html | SubSupDetection::All
        )
    }

    pub(crate) fn detect_sub_sup_pandoc(&self) -> bool {
        matches!(
            self.sub_sup_detection,
            SubSupDetection::Pandoc | SubSupDetection::All
        )
    }

    pub(crate) fn detect_color_html(&self) -> bool {
        matches!(
            self.color_detection,
            ColorDetection::Html | ColorDetection::All
        )
    }

    pub(crate) fn detect_color_pandoc(&self) -> bool {
        matches!(
            self.color_detection,
            ColorDetection::Pandoc | ColorDetection::All
        )
    }

    pub(crate) fn detect_align_html(&self) -> bool {
        matches!(
            self.alignment_detection,
            AlignmentDetection::Html | AlignmentDetection::All
        )
    }

    pub(crate) fn detect_align_pandoc(&self) -> bool {
        matches!(
            self.alignment_detection,
            AlignmentDetection::Pandoc | AlignmentDetection::All
        )
    }

    pub(crate) fn detect_emoji(&self) -> bool {
        matches!(
            self.emoji_detection,
            EmojiDetection::Shortcode | EmojiDetection::All
        )
    }

    pub(crate) fn detect_status(&self) -> bool {
        matches!(
            self.status_detection,
            StatusDetection::Bracket | StatusDetection::All
        )
    }

    pub(crate) fn detect_date(&self) -> bool {
        matches!(self.date_detection, DateDetection::Iso | DateDetection::All)
    }

    pub(crate) fn detect_expand_html(&self) -> bool {
        matches!(
            self.expand_detection,
            ExpandDetection::Html | ExpandDetection::All
        )
    }

    pub(crate) fn detect_expand_pandoc(&self) -> bool {
        matches!(
            self.expand_detection,
            ExpandDetection::Pandoc | ExpandDetection::All
        )
    }

    pub(crate) fn detect_inline_card_link(&self) -> bool {
        matches!(
            self.inline_card_detection,
            InlineCardDetection::Link | InlineCardDetection::All
        )
    }

    pub(crate) fn detect_inline_card_pandoc(&self) -> bool {
        matches!(
            self.inline_card_detection,
            InlineCardDetection::Pandoc | InlineCardDetection::All
        )
    }

    pub(crate) fn detect_bodied_extension_html(&self) -> bool {
        matches!(
            self.bodied_extension_detection,
            BodiedExtensionDetection::Html | BodiedExtensionDetection::All
        )
    }

    pub(crate) fn detect_bodied_extension_pandoc(&self) -> bool {
        matches!(
            self.bodied_extension_detection,
            BodiedExtensionDetection::Pandoc | BodiedExtensionDetection::All
        )
    }
}
