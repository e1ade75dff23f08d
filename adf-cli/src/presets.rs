//! Named conversion presets.
//!
//! A preset is a starting point the `--allow-html` and `--strict` flags
//! refine further:
//! - `balanced`  — the library defaults; round-trips well for common shapes
//! - `strict`    — unknown elements abort the conversion
//! - `readable`  — text-first output for humans, no HTML or embed blocks
//! - `lossy`     — drop everything without a native markdown shape
//! - `pandoc`    — the Pandoc attribute dialect everywhere

use adf_babel::config::{
    AlignmentStyle, ColorStyle, ExpandStyle, ExtensionMode, ExtensionRules, HardBreakStyle,
    InlineCardStyle, MentionStyle, SubSupStyle, TableMode, UnderlineStyle, UnknownPolicy,
};
use adf_babel::parser::config::{
    AlignmentDetection, ColorDetection, DateDetection, DecisionDetection, EmojiDetection,
    ExpandDetection, InlineCardDetection, MentionDetection, PanelDetection, StatusDetection,
    SubSupDetection, UnderlineDetection,
};
use adf_babel::{Config, ReverseConfig};

pub const PRESETS: &[&str] = &["balanced", "strict", "readable", "lossy", "pandoc"];

pub fn forward_preset(preset: &str) -> Result<Config, String> {
    match preset.trim().to_lowercase().as_str() {
        "" | "balanced" => Ok(Config::default()),
        "strict" => Ok(Config {
            unknown_nodes: UnknownPolicy::Error,
            unknown_marks: UnknownPolicy::Error,
            mention_style: MentionStyle::Link,
            extensions: ExtensionRules {
                default: ExtensionMode::Json,
                ..ExtensionRules::default()
            },
            ..Config::default()
        }),
        "readable" => Ok(Config {
            mention_style: MentionStyle::Text,
            text_color_style: ColorStyle::Ignore,
            background_color_style: ColorStyle::Ignore,
            alignment_style: AlignmentStyle::Ignore,
            expand_style: ExpandStyle::Blockquote,
            extensions: ExtensionRules {
                default: ExtensionMode::Text,
                ..ExtensionRules::default()
            },
            ..Config::default()
        }),
        "lossy" => Ok(Config {
            mention_style: MentionStyle::Text,
            text_color_style: ColorStyle::Ignore,
            background_color_style: ColorStyle::Ignore,
            inline_card_style: InlineCardStyle::Url,
            extensions: ExtensionRules {
                default: ExtensionMode::Strip,
                ..ExtensionRules::default()
            },
            ..Config::default()
        }),
        "pandoc" => Ok(Config {
            underline_style: UnderlineStyle::Pandoc,
            sub_sup_style: SubSupStyle::Pandoc,
            text_color_style: ColorStyle::Pandoc,
            background_color_style: ColorStyle::Pandoc,
            mention_style: MentionStyle::Pandoc,
            alignment_style: AlignmentStyle::Pandoc,
            expand_style: ExpandStyle::Pandoc,
            inline_card_style: InlineCardStyle::Pandoc,
            table_mode: TableMode::Autopandoc,
            ..Config::default()
        }),
        other => Err(format!(
            "unknown preset {other:?} (allowed: {})",
            PRESETS.join(", ")
        )),
    }
}

pub fn reverse_preset(preset: &str) -> Result<ReverseConfig, String> {
    match preset.trim().to_lowercase().as_str() {
        "" | "balanced" => Ok(ReverseConfig::default()),
        "strict" => Ok(ReverseConfig {
            mention_detection: MentionDetection::Link,
            emoji_detection: EmojiDetection::Shortcode,
            status_detection: StatusDetection::Bracket,
            date_detection: DateDetection::Iso,
            panel_detection: PanelDetection::Github,
            expand_detection: ExpandDetection::Html,
            decision_detection: DecisionDetection::Emoji,
            ..ReverseConfig::default()
        }),
        "readable" => Ok(ReverseConfig {
            mention_detection: MentionDetection::At,
            emoji_detection: EmojiDetection::Shortcode,
            status_detection: StatusDetection::Text,
            date_detection: DateDetection::Iso,
            panel_detection: PanelDetection::Bold,
            expand_detection: ExpandDetection::Blockquote,
            decision_detection: DecisionDetection::Text,
            ..ReverseConfig::default()
        }),
        "lossy" => Ok(ReverseConfig {
            mention_detection: MentionDetection::None,
            emoji_detection: EmojiDetection::None,
            status_detection: StatusDetection::None,
            date_detection: DateDetection::None,
            panel_detection: PanelDetection::None,
            expand_detection: ExpandDetection::None,
            decision_detection: DecisionDetection::None,
            ..ReverseConfig::default()
        }),
        "pandoc" => Ok(ReverseConfig {
            underline_detection: UnderlineDetection::Pandoc,
            sub_sup_detection: SubSupDetection::Pandoc,
            color_detection: ColorDetection::Pandoc,
            alignment_detection: AlignmentDetection::Pandoc,
            mention_detection: MentionDetection::Pandoc,
            expand_detection: ExpandDetection::Pandoc,
            inline_card_detection: InlineCardDetection::Pandoc,
            table_grid_detection: true,
            ..ReverseConfig::default()
        }),
        other => Err(format!(
            "unknown preset {other:?} (allowed: {})",
            PRESETS.join(", ")
        )),
    }
}

/// `--allow-html`: switch every HTML-capable strategy to its HTML form.
pub fn apply_allow_html(config: &mut Config) {
    config.underline_style = UnderlineStyle::Html;
    config.sub_sup_style = SubSupStyle::Html;
    config.hard_break_style = HardBreakStyle::Html;
    config.expand_style = ExpandStyle::Html;
}

/// `--allow-html` on the reverse path: accept every known variant.
pub fn apply_allow_html_reverse(config: &mut ReverseConfig) {
    config.underline_detection = UnderlineDetection::All;
    config.sub_sup_detection = SubSupDetection::All;
    config.color_detection = ColorDetection::All;
    config.alignment_detection = AlignmentDetection::All;
    config.mention_detection = MentionDetection::All;
    config.expand_detection = ExpandDetection::All;
    config.inline_card_detection = InlineCardDetection::All;
}

/// `--strict`: unknown elements abort.
pub fn apply_strict(config: &mut Config) {
    config.unknown_nodes = UnknownPolicy::Error;
    config.unknown_marks = UnknownPolicy::Error;
}

/// `--strict` on the reverse path: pin every detector to the canonical
/// variant.
pub fn apply_strict_reverse(config: &mut ReverseConfig) {
    config.mention_detection = MentionDetection::Link;
    config.emoji_detection = EmojiDetection::Shortcode;
    config.status_detection = StatusDetection::Bracket;
    config.date_detection = DateDetection::Iso;
    config.panel_detection = PanelDetection::Github;
    config.expand_detection = ExpandDetection::Html;
    config.alignment_detection = AlignmentDetection::Html;
    config.underline_detection = UnderlineDetection::Html;
    config.sub_sup_detection = SubSupDetection::Html;
    config.color_detection = ColorDetection::Html;
    config.inline_card_detection = InlineCardDetection::Link;
    config.decision_detection = DecisionDetection::Emoji;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_preset_resolves_and_validates() {
        for preset in PRESETS {
            let forward = forward_preset(preset).unwrap();
            assert!(forward.validate().is_ok(), "forward {preset}");
            let reverse = reverse_preset(preset).unwrap();
            assert!(reverse.validate().is_ok(), "reverse {preset}");
        }
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert!(forward_preset("mystery").is_err());
        assert!(reverse_preset("mystery").is_err());
    }

    #[test]
    fn flags_compose_over_presets() {
        let mut config = forward_preset("readable").unwrap();
        apply_allow_html(&mut config);
        apply_strict(&mut config);
        assert_eq!(config.expand_style, ExpandStyle::Html);
        assert_eq!(config.unknown_nodes, UnknownPolicy::Error);
        assert_eq!(config.mention_style, MentionStyle::Text);
    }
}
