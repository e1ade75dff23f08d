//! Mark delimiters, mark equality and the CSS color allowlist.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::Mark;
use crate::config::{ColorStyle, SubSupStyle, UnderlineStyle};
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::RenderState;

static CSS_HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#[0-9a-f]{3,8}$").unwrap());
static CSS_NAMED_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]+$").unwrap());
static CSS_RGB_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^rgb\(\s*(?:\d{1,3}%?\s*,\s*){2}\d{1,3}%?\s*\)$").unwrap());
static CSS_RGBA_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^rgba\(\s*(?:\d{1,3}%?\s*,\s*){3}(?:0|1|0?\.\d+)\s*\)$").unwrap()
});
static CSS_HSL_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^hsl\(\s*\d{1,3}(?:deg|rad|turn)?\s*,\s*\d{1,3}%\s*,\s*\d{1,3}%\s*\)$")
        .unwrap()
});
static CSS_HSLA_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^hsla\(\s*\d{1,3}(?:deg|rad|turn)?\s*,\s*\d{1,3}%\s*,\s*\d{1,3}%\s*,\s*(?:0|1|0?\.\d+)\s*\)$",
    )
    .unwrap()
});
static CSS_VAR_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^var\(\s*--[a-z0-9_-]+\s*\)$").unwrap());

impl RenderState<'_> {
    /// Suffix of `active` from the first position where the two sequences
    /// diverge; those marks must be closed (in reverse order).
    pub(crate) fn marks_to_close<'m>(
        &self,
        active: &'m [Mark],
        current: &[Mark],
    ) -> &'m [Mark] {
        for (index, mark) in active.iter().enumerate() {
            if index >= current.len() || !marks_equal(mark, &current[index]) {
                return &active[index..];
            }
        }
        &[]
    }

    /// Suffix of `current` after the common prefix; those marks must be
    /// opened (in order).
    pub(crate) fn marks_to_open<'m>(
        &self,
        active: &[Mark],
        current: &'m [Mark],
    ) -> &'m [Mark] {
        let mut common = 0;
        while common < active.len()
            && common < current.len()
            && marks_equal(&active[common], &current[common])
        {
            common += 1;
        }
        &current[common..]
    }

    /// Intersection of the two mark lists preserving `active`'s order. Used
    /// for whitespace-only runs so marks never open on a space.
    pub(crate) fn intersect_marks(&self, active: &[Mark], current: &[Mark]) -> Vec<Mark> {
        active
            .iter()
            .filter(|mark| current.iter().any(|other| marks_equal(mark, other)))
            .cloned()
            .collect()
    }

    pub(crate) fn opening_delimiter(
        &mut self,
        mark: &Mark,
        use_underscore_for_em: bool,
    ) -> Result<String, ConvertError> {
        Ok(self.mark_delimiters(mark, use_underscore_for_em)?.0)
    }

    pub(crate) fn closing_delimiter(
        &mut self,
        mark: &Mark,
        use_underscore_for_em: bool,
    ) -> Result<String, ConvertError> {
        Ok(self.mark_delimiters(mark, use_underscore_for_em)?.1)
    }

    /// Opening and closing delimiters for a mark under the current config.
    fn mark_delimiters(
        &mut self,
        mark: &Mark,
        use_underscore_for_em: bool,
    ) -> Result<(String, String), ConvertError> {
        match mark.kind.as_str() {
            "strong" => Ok(("**".to_string(), "**".to_string())),
            "em" => {
                if use_underscore_for_em {
                    Ok(("_".to_string(), "_".to_string()))
                } else {
                    Ok(("*".to_string(), "*".to_string()))
                }
            }
            "strike" => Ok(("~~".to_string(), "~~".to_string())),
            "code" => Ok(("`".to_string(), "`".to_string())),
            "underline" => Ok(match self.config.underline_style {
                UnderlineStyle::Ignore => (String::new(), String::new()),
                UnderlineStyle::Bold => ("**".to_string(), "**".to_string()),
                UnderlineStyle::Html => ("<u>".to_string(), "</u>".to_string()),
                UnderlineStyle::Pandoc => ("[".to_string(), "]{.underline}".to_string()),
            }),
            "link" => self.link_delimiters(mark),
            "subsup" => {
                let kind = mark.str_attr("type", "");
                Ok(match (self.config.sub_sup_style, kind) {
                    (SubSupStyle::Html, "sub") => ("<sub>".to_string(), "</sub>".to_string()),
                    (SubSupStyle::Html, "sup") => ("<sup>".to_string(), "</sup>".to_string()),
                    (SubSupStyle::Latex, "sub") => ("$_{".to_string(), "}$".to_string()),
                    (SubSupStyle::Latex, "sup") => ("$^{".to_string(), "}$".to_string()),
                    (SubSupStyle::Pandoc, "sub") => ("~".to_string(), "~".to_string()),
                    (SubSupStyle::Pandoc, "sup") => ("^".to_string(), "^".to_string()),
                    _ => (String::new(), String::new()),
                })
            }
            "textColor" => Ok(self.color_delimiters(mark, self.config.text_color_style, "color")),
            "backgroundColor" => Ok(self.color_delimiters(
                mark,
                self.config.background_color_style,
                "background-color",
            )),
            _ => Ok((String::new(), String::new())),
        }
    }

    fn link_delimiters(&mut self, mark: &Mark) -> Result<(String, String), ConvertError> {
        let href = mark.str_attr("href", "").to_string();
        if href.is_empty() {
            // No destination: emit the text without link syntax.
            return Ok((String::new(), String::new()));
        }
        let title = mark.str_attr("title", "").to_string();

        let resolved = self.resolve_link_mark(mark, &href, &title)?;
        let (href, title) = match resolved {
            Some(pair) => pair,
            // Hook asked for text only.
            None => return Ok((String::new(), String::new())),
        };

        let mut closing = format!("]({href}");
        if !title.is_empty() {
            let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
            closing.push_str(&format!(" \"{escaped}\""));
        }
        closing.push(')');

        Ok(("[".to_string(), closing))
    }

    fn color_delimiters(
        &mut self,
        mark: &Mark,
        style: ColorStyle,
        property: &str,
    ) -> (String, String) {
        if style == ColorStyle::Ignore {
            return (String::new(), String::new());
        }

        let raw = mark.str_attr("color", "");
        let color = match sanitize_css_color(raw) {
            Some(color) => color,
            None => {
                if !raw.is_empty() {
                    self.warn(
                        WarningKind::DroppedFeature,
                        &mark.kind,
                        format!("invalid color value dropped: {raw:?}"),
                    );
                }
                return (String::new(), String::new());
            }
        };

        match style {
            ColorStyle::Html => (
                format!("<span style=\"{property}: {color}\">"),
                "</span>".to_string(),
            ),
            ColorStyle::Pandoc => (
                "[".to_string(),
                format!("]{{style=\"{property}: {color};\"}}"),
            ),
            ColorStyle::Ignore => (String::new(), String::new()),
        }
    }
}

/// Marks are equal when their kinds match and, for kinds with
/// identity-bearing attributes, those attribute values match too.
pub(crate) fn marks_equal(left: &Mark, right: &Mark) -> bool {
    if left.kind != right.kind {
        return false;
    }

    let keys: &[&str] = match left.kind.as_str() {
        "link" => &["href", "title"],
        "subsup" => &["type"],
        "textColor" | "backgroundColor" => &["color"],
        _ => return true,
    };

    keys.iter().all(|key| {
        let lhs = left.attrs.as_ref().and_then(|attrs| attrs.get(*key));
        let rhs = right.attrs.as_ref().and_then(|attrs| attrs.get(*key));
        lhs == rhs
    })
}

/// Validate a CSS color against the allowlist (hex, named, rgb/rgba,
/// hsl/hsla, var(--...), transparent, currentColor).
pub(crate) fn sanitize_css_color(raw: &str) -> Option<String> {
    let color = raw.trim();
    if color.is_empty() {
        return None;
    }

    if color.eq_ignore_ascii_case("transparent") || color.eq_ignore_ascii_case("currentColor") {
        return Some(color.to_string());
    }

    if CSS_HEX_COLOR.is_match(color)
        || CSS_NAMED_COLOR.is_match(color)
        || CSS_RGB_COLOR.is_match(color)
        || CSS_RGBA_COLOR.is_match(color)
        || CSS_HSL_COLOR.is_match(color)
        || CSS_HSLA_COLOR.is_match(color)
        || CSS_VAR_COLOR.is_match(color)
    {
        return Some(color.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_equal_compares_identity_attrs() {
        let a = Mark::with_attr("link", "href", "https://a.example");
        let b = Mark::with_attr("link", "href", "https://a.example");
        let c = Mark::with_attr("link", "href", "https://c.example");
        assert!(marks_equal(&a, &b));
        assert!(!marks_equal(&a, &c));
        assert!(marks_equal(&Mark::bare("strong"), &Mark::bare("strong")));
        assert!(!marks_equal(&Mark::bare("strong"), &Mark::bare("em")));
    }

    #[test]
    fn css_allowlist_accepts_common_forms() {
        for color in [
            "#fff",
            "#AABBCCDD",
            "rebeccapurple",
            "rgb(1, 2, 3)",
            "rgba(1, 2, 3, 0.5)",
            "hsl(120, 50%, 50%)",
            "hsla(120, 50%, 50%, 1)",
            "var(--brand-accent)",
            "transparent",
            "currentColor",
        ] {
            assert!(sanitize_css_color(color).is_some(), "rejected {color}");
        }
    }

    #[test]
    fn css_allowlist_rejects_injection_attempts() {
        for color in [
            "",
            "red; background-image: url(x)",
            "url(javascript:alert(1))",
            "expression(1)",
            "#ggg",
        ] {
            assert!(sanitize_css_color(color).is_none(), "accepted {color:?}");
        }
    }
}
