//! Shared configuration loader for the adf toolchain.
//!
//! `defaults/adf.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific
//! profile files on top of those defaults via [`Loader`] before
//! deserializing into [`BabelProfile`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use adf_babel::config::{
    AlignmentStyle, BodiedExtensionStyle, ColorStyle, DecisionStyle, EmojiStyle, ExpandStyle,
    ExtensionMode, ExtensionRules, HardBreakStyle, InlineCardStyle, LayoutSectionStyle,
    MentionStyle, OrderedListStyle, PanelStyle, StatusStyle, SubSupStyle, TableMode,
    UnderlineStyle, UnknownPolicy,
};
use adf_babel::parser::config::{
    AlignmentDetection, BodiedExtensionDetection, ColorDetection, DateDetection,
    DecisionDetection, EmojiDetection, ExpandDetection, InlineCardDetection, MentionDetection,
    PanelDetection, StatusDetection, SubSupDetection, UnderlineDetection,
};
use adf_babel::ResolutionMode;

const DEFAULT_TOML: &str = include_str!("../defaults/adf.default.toml");

/// Top-level conversion profile consumed by adf applications.
#[derive(Debug, Clone, Deserialize)]
pub struct BabelProfile {
    pub forward: ForwardProfile,
    pub reverse: ReverseProfile,
}

/// Forward (ADF → Markdown) profile keys.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwardProfile {
    pub underline_style: UnderlineStyle,
    pub sub_sup_style: SubSupStyle,
    pub text_color_style: ColorStyle,
    pub background_color_style: ColorStyle,
    pub mention_style: MentionStyle,
    pub emoji_style: EmojiStyle,
    pub panel_style: PanelStyle,
    pub heading_offset: i64,
    pub hard_break_style: HardBreakStyle,
    pub alignment_style: AlignmentStyle,
    pub expand_style: ExpandStyle,
    pub status_style: StatusStyle,
    pub inline_card_style: InlineCardStyle,
    pub layout_section_style: LayoutSectionStyle,
    pub bodied_extension_style: BodiedExtensionStyle,
    pub decision_style: DecisionStyle,
    pub date_format: String,
    pub table_mode: TableMode,
    pub bullet_marker: char,
    pub ordered_list_style: OrderedListStyle,
    pub extension_default: ExtensionMode,
    #[serde(default)]
    pub extension_by_type: HashMap<String, ExtensionMode>,
    pub media_base_url: String,
    pub resolution_mode: ResolutionMode,
    #[serde(default)]
    pub language_map: HashMap<String, String>,
    pub unknown_nodes: UnknownPolicy,
    pub unknown_marks: UnknownPolicy,
}

/// Reverse (Markdown → ADF) profile keys.
#[derive(Debug, Clone, Deserialize)]
pub struct ReverseProfile {
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
    pub date_format: String,
    pub heading_offset: i64,
    #[serde(default)]
    pub language_map: HashMap<String, String>,
    pub media_base_url: String,
    #[serde(default)]
    pub mention_registry: HashMap<String, String>,
    #[serde(default)]
    pub emoji_registry: HashMap<String, String>,
    pub resolution_mode: ResolutionMode,
}

impl From<ForwardProfile> for adf_babel::Config {
    fn from(profile: ForwardProfile) -> Self {
        adf_babel::Config {
            underline_style: profile.underline_style,
            sub_sup_style: profile.sub_sup_style,
            text_color_style: profile.text_color_style,
            background_color_style: profile.background_color_style,
            mention_style: profile.mention_style,
            emoji_style: profile.emoji_style,
            panel_style: profile.panel_style,
            heading_offset: profile.heading_offset,
            hard_break_style: profile.hard_break_style,
            alignment_style: profile.alignment_style,
            expand_style: profile.expand_style,
            status_style: profile.status_style,
            inline_card_style: profile.inline_card_style,
            layout_section_style: profile.layout_section_style,
            bodied_extension_style: profile.bodied_extension_style,
            decision_style: profile.decision_style,
            date_format: profile.date_format,
            table_mode: profile.table_mode,
            bullet_marker: profile.bullet_marker,
            ordered_list_style: profile.ordered_list_style,
            extensions: ExtensionRules {
                default: profile.extension_default,
                by_type: profile.extension_by_type,
            },
            media_base_url: profile.media_base_url,
            resolution_mode: profile.resolution_mode,
            language_map: profile.language_map,
            unknown_nodes: profile.unknown_nodes,
            unknown_marks: profile.unknown_marks,
            ..adf_babel::Config::default()
        }
    }
}

impl From<ReverseProfile> for adf_babel::ReverseConfig {
    fn from(profile: ReverseProfile) -> Self {
        adf_babel::ReverseConfig {
            mention_detection: profile.mention_detection,
            underline_detection: profile.underline_detection,
            sub_sup_detection: profile.sub_sup_detection,
            color_detection: profile.color_detection,
            alignment_detection: profile.alignment_detection,
            emoji_detection: profile.emoji_detection,
            status_detection: profile.status_detection,
            date_detection: profile.date_detection,
            panel_detection: profile.panel_detection,
            expand_detection: profile.expand_detection,
            inline_card_detection: profile.inline_card_detection,
            table_grid_detection: profile.table_grid_detection,
            decision_detection: profile.decision_detection,
            bodied_extension_detection: profile.bodied_extension_detection,
            date_format: profile.date_format,
            heading_offset: profile.heading_offset,
            language_map: profile.language_map,
            media_base_url: profile.media_base_url,
            mention_registry: profile.mention_registry,
            emoji_registry: profile.emoji_registry,
            resolution_mode: profile.resolution_mode,
            ..adf_babel::ReverseConfig::default()
        }
    }
}

/// Layers configuration sources: embedded defaults first, then optional
/// user files in the order they are added.
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        Loader {
            builder: Config::builder()
                .add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml)),
        }
    }

    /// Layer a profile file over the defaults. Missing files are an error;
    /// callers decide whether a profile is optional.
    pub fn with_file(mut self, path: &Path) -> Self {
        self.builder = self.builder.add_source(File::from(path));
        self
    }

    pub fn load(self) -> Result<BabelProfile, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Loader::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_defaults_load_and_match_library_defaults() {
        let profile = Loader::new().load().unwrap();

        let forward: adf_babel::Config = profile.forward.into();
        assert_eq!(forward.panel_style, PanelStyle::Github);
        assert_eq!(forward.bullet_marker, '-');
        assert!(forward.validate().is_ok());

        let reverse: adf_babel::ReverseConfig = profile.reverse.into();
        assert!(reverse.validate().is_ok());
        assert!(!reverse.table_grid_detection);
    }

    #[test]
    fn user_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[forward]\npanel_style = \"bold\"\nbullet_marker = \"*\"\n\n[reverse]\ntable_grid_detection = true\n"
        )
        .unwrap();

        let profile = Loader::new().with_file(file.path()).load().unwrap();
        let forward: adf_babel::Config = profile.forward.into();
        assert_eq!(forward.panel_style, PanelStyle::Bold);
        assert_eq!(forward.bullet_marker, '*');
        // Untouched keys keep the embedded defaults.
        assert_eq!(forward.expand_style, ExpandStyle::Html);
        assert!(profile.reverse.table_grid_detection);
    }

    #[test]
    fn invalid_enum_literal_is_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[forward]\npanel_style = \"sparkly\"\n").unwrap();
        assert!(Loader::new().with_file(file.path()).load().is_err());
    }
}
