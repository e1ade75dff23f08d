//! Block renderers: paragraphs, headings, blockquotes, code blocks,
//! panels, decisions, expands and layout sections.

use crate::ast::Node;
use crate::config::{AlignmentStyle, DecisionStyle, ExpandStyle, LayoutSectionStyle, PanelStyle};
use crate::error::ConvertError;

use super::{escape_html, RenderState};

impl RenderState<'_> {
    pub(crate) fn render_paragraph(&mut self, node: &Node) -> Result<String, ConvertError> {
        let inline = self.render_inline_content(&node.content)?;
        if inline.is_empty() {
            return Ok(String::new());
        }
        let content = format!("{inline}\n\n");

        if let Some(alignment) = node_alignment(node) {
            let trimmed = content.trim_end_matches('\n');
            match self.config.alignment_style {
                AlignmentStyle::Html => {
                    return Ok(format!("<div align=\"{alignment}\">{trimmed}</div>\n\n"));
                }
                AlignmentStyle::Pandoc => {
                    return Ok(format!(
                        ":::{{ style=\"text-align: {alignment};\" }}\n\n{trimmed}\n\n:::\n\n"
                    ));
                }
                AlignmentStyle::Ignore => {}
            }
        }

        Ok(content)
    }

    pub(crate) fn render_heading(&mut self, node: &Node) -> Result<String, ConvertError> {
        let mut level = node.int_attr("level", 0);
        if level <= 0 {
            level = node.level.unwrap_or(0);
        }
        if level <= 0 {
            level = 1;
        }
        level += self.config.heading_offset;
        let level = level.clamp(1, 6);

        let content = self.render_inline_content(&node.content)?;
        if content.is_empty() {
            return Ok(String::new());
        }
        // A trailing hard break has no meaning at the end of a heading.
        let content = content.trim_end_matches('\\');

        let prefix = "#".repeat(level as usize);
        let heading = format!("{prefix} {content}");

        if let Some(alignment) = node_alignment(node) {
            match self.config.alignment_style {
                AlignmentStyle::Html => {
                    return Ok(format!(
                        "<h{level} align=\"{alignment}\">{content}</h{level}>\n\n"
                    ));
                }
                AlignmentStyle::Pandoc => {
                    return Ok(format!(
                        "{heading} {{style=\"text-align: {alignment};\"}}\n\n"
                    ));
                }
                AlignmentStyle::Ignore => {}
            }
        }

        Ok(format!("{heading}\n\n"))
    }

    pub(crate) fn render_blockquote(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let inner = self.render_children(&node.content)?;
        let quoted = blockquote_content(&inner, "");
        if quoted.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{quoted}\n\n"))
    }

    pub(crate) fn render_hard_break(&self) -> String {
        match self.config.hard_break_style {
            crate::config::HardBreakStyle::Html => "<br>".to_string(),
            crate::config::HardBreakStyle::Backslash => "\\\n".to_string(),
        }
    }

    pub(crate) fn render_code_block(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let content = extract_text(&node.content);
        if content.trim().is_empty() {
            return Ok(String::new());
        }

        let raw_language = node.str_attr("language", "");
        let language = self
            .config
            .language_map
            .get(raw_language)
            .map(String::as_str)
            .unwrap_or(raw_language);

        Ok(format!(
            "```{language}\n{}\n```\n\n",
            content.trim_end_matches('\n')
        ))
    }

    pub(crate) fn render_panel(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let full_content = self.render_children(&node.content)?;
        if full_content.trim().is_empty() {
            return Ok(String::new());
        }

        let panel_type = node.str_attr("panelType", "").to_lowercase();
        let has_panel_type = !panel_type.is_empty();
        let panel_title = node.str_attr("title", "").to_string();
        let (upper, title_case) = panel_type_labels(&panel_type);

        match self.config.panel_style {
            PanelStyle::None => finish_quoted(blockquote_content(&full_content, "")),
            PanelStyle::Bold => {
                let prefix = if has_panel_type {
                    format!("**{title_case}**: ")
                } else {
                    String::new()
                };
                finish_quoted(blockquote_content(&full_content, &prefix))
            }
            PanelStyle::Title => {
                if !has_panel_type {
                    return finish_quoted(blockquote_content(&full_content, ""));
                }
                let callout = if panel_title.is_empty() {
                    format!("[!{upper}]")
                } else {
                    format!("[!{upper}: {panel_title}]")
                };
                let quoted = blockquote_content(&full_content, "");
                if quoted.is_empty() {
                    Ok(format!("> {callout}\n\n"))
                } else {
                    Ok(format!("> {callout}\n{quoted}\n\n"))
                }
            }
            PanelStyle::Github => {
                if !has_panel_type {
                    return finish_quoted(blockquote_content(&full_content, ""));
                }
                let callout = format!("[!{upper}]");
                let quoted = blockquote_content(&full_content, "");
                if quoted.is_empty() {
                    Ok(format!("> {callout}\n\n"))
                } else {
                    Ok(format!("> {callout}\n{quoted}\n\n"))
                }
            }
        }
    }

    pub(crate) fn render_decision_list(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let mut items = Vec::new();
        for child in &node.content {
            if child.kind != "decisionItem" {
                continue;
            }
            let item = self.render_decision_item_content(child)?;
            if !item.is_empty() {
                items.push(item);
            }
        }

        if items.is_empty() {
            return Ok(String::new());
        }

        // Items join with a blank quoted line so they stay one blockquote.
        Ok(format!("{}\n\n", items.join("\n> \n")))
    }

    pub(crate) fn render_decision_item_content(
        &mut self,
        node: &Node,
    ) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let state = node.str_attr("state", "");
        let prefix = match (state, self.config.decision_style) {
            ("DECIDED", DecisionStyle::Text) => "**DECIDED**: ",
            ("DECIDED", DecisionStyle::Emoji) => "**\u{2713} Decision**: ",
            ("UNDECIDED", DecisionStyle::Text) => "**UNDECIDED**: ",
            ("UNDECIDED", DecisionStyle::Emoji) => "**? Decision**: ",
            (_, DecisionStyle::Text) => "**DECISION**: ",
            (_, DecisionStyle::Emoji) => "**Decision**: ",
        };

        let inner = self.render_children(&node.content)?;
        Ok(blockquote_content(&inner, prefix))
    }

    pub(crate) fn render_expand(&mut self, node: &Node) -> Result<String, ConvertError> {
        let title = node.str_attr("title", "").to_string();
        let content = self.render_children(&node.content)?;

        match self.config.expand_style {
            ExpandStyle::Html => Ok(format!(
                "<details><summary>{}</summary>\n\n{}\n\n</details>\n\n",
                escape_html(&title),
                content.trim_end_matches('\n')
            )),
            ExpandStyle::Pandoc => {
                let mut opener = String::from(":::{ .details");
                if !title.is_empty() {
                    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
                    opener.push_str(&format!(" summary=\"{escaped}\""));
                }
                Ok(format!(
                    "{opener} }}\n\n{}\n\n:::\n\n",
                    content.trim_end_matches('\n')
                ))
            }
            ExpandStyle::Blockquote => {
                let mut out = String::new();
                if !title.is_empty() {
                    out.push_str(&format!("> **{title}**\n> \n"));
                }
                if content.is_empty() {
                    return Ok(format!("{out}\n\n"));
                }
                out.push_str(&blockquote_content(&content, ""));
                Ok(format!("{out}\n\n"))
            }
        }
    }

    pub(crate) fn render_layout_section(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let content = self.render_children(&node.content)?;

        match self.config.layout_section_style {
            LayoutSectionStyle::Html => Ok(format!(
                "<div class=\"layout-section\">\n\n{content}</div>\n\n"
            )),
            LayoutSectionStyle::Pandoc => {
                Ok(format!("::::{{ .layoutSection }}\n{content}::::\n\n"))
            }
            LayoutSectionStyle::Standard => Ok(content),
        }
    }

    pub(crate) fn render_layout_column(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let content = self.render_children(&node.content)?;
        let width = node.float_attr("width", 0.0);

        match self.config.layout_section_style {
            LayoutSectionStyle::Html => {
                let trimmed = content.trim_end_matches('\n');
                if width > 0.0 {
                    Ok(format!(
                        "<div class=\"layout-column\" style=\"width: {}%;\">\n\n{trimmed}\n</div>\n\n",
                        format_width(width)
                    ))
                } else {
                    Ok(format!(
                        "<div class=\"layout-column\">\n\n{trimmed}\n</div>\n\n"
                    ))
                }
            }
            LayoutSectionStyle::Pandoc => {
                let trimmed = content.trim_end_matches('\n');
                if width > 0.0 {
                    Ok(format!(
                        ":::{{ .layoutColumn width=\"{}%\" }}\n\n{trimmed}\n\n:::\n\n",
                        format_width(width)
                    ))
                } else {
                    Ok(format!(":::{{ .layoutColumn }}\n\n{trimmed}\n\n:::\n\n"))
                }
            }
            LayoutSectionStyle::Standard => Ok(content),
        }
    }
}

/// Prefix every line with `"> "`, deepening nesting when a line already
/// starts with `>`. Empty lines become `"> "`; the first line can carry an
/// extra prefix (panel labels, decision prefixes).
pub(crate) fn blockquote_content(content: &str, first_line_prefix: &str) -> String {
    let content = content.trim_end_matches('\n');
    if content.is_empty() {
        return String::new();
    }

    let mut quoted = Vec::new();
    for (index, line) in content.split('\n').enumerate() {
        if index == 0 && !first_line_prefix.is_empty() {
            quoted.push(format!("> {first_line_prefix}{line}"));
        } else if line.is_empty() {
            quoted.push("> ".to_string());
        } else if line.starts_with('>') {
            quoted.push(format!(">{line}"));
        } else {
            quoted.push(format!("> {line}"));
        }
    }

    quoted.join("\n")
}

/// Apply the list-item indentation discipline: the first line carries the
/// marker, continuation lines an equal width of spaces.
pub(crate) fn indent(content: &str, marker: &str) -> String {
    let content = content.trim_end_matches('\n');
    if content.is_empty() {
        return String::new();
    }

    let pad = " ".repeat(marker.len());

    let mut lines = Vec::new();
    for (index, line) in content.split('\n').enumerate() {
        if index == 0 {
            lines.push(format!("{marker}{line}"));
        } else if line.is_empty() {
            lines.push(String::new());
        } else {
            lines.push(format!("{pad}{line}"));
        }
    }

    lines.join("\n")
}

/// Concatenated text of the direct text children (code block payloads).
pub(crate) fn extract_text(content: &[Node]) -> String {
    content
        .iter()
        .filter(|child| child.kind == "text")
        .map(Node::text_value)
        .collect()
}

fn finish_quoted(quoted: String) -> Result<String, ConvertError> {
    if quoted.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("{quoted}\n\n"))
    }
}

fn node_alignment(node: &Node) -> Option<&str> {
    let mut alignment = node.str_attr("align", "");
    if alignment.is_empty() {
        alignment = node.str_attr("layout", "");
    }
    match alignment {
        "left" | "center" | "right" => Some(alignment),
        _ => None,
    }
}

fn panel_type_labels(panel_type: &str) -> (String, String) {
    match panel_type {
        "info" => ("INFO".to_string(), "Info".to_string()),
        "note" => ("NOTE".to_string(), "Note".to_string()),
        "success" => ("SUCCESS".to_string(), "Success".to_string()),
        "warning" => ("WARNING".to_string(), "Warning".to_string()),
        "error" => ("ERROR".to_string(), "Error".to_string()),
        "" => ("INFO".to_string(), "Info".to_string()),
        other => {
            let upper = other.to_uppercase();
            let mut chars = other.chars();
            let title_case = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => "Info".to_string(),
            };
            (upper, title_case)
        }
    }
}

/// Column widths print with trailing zeros trimmed (`33.33`, `50`).
fn format_width(width: f64) -> String {
    let formatted = format!("{width:.6}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::serializer::MarkdownSerializer;

    fn render(input: &str) -> String {
        MarkdownSerializer::new(Config::default())
            .unwrap()
            .serialize(input.as_bytes())
            .unwrap()
            .markdown
    }

    fn render_with(config: Config, input: &str) -> String {
        MarkdownSerializer::new(config)
            .unwrap()
            .serialize(input.as_bytes())
            .unwrap()
            .markdown
    }

    #[test]
    fn heading_clamps_level_and_applies_offset() {
        let input = r#"{"type":"doc","content":[{"type":"heading","attrs":{"level":9},"content":[{"type":"text","text":"Title"}]}]}"#;
        assert_eq!(render(input), "###### Title\n");

        let offset = Config {
            heading_offset: 2,
            ..Config::default()
        };
        let h1 = r#"{"type":"doc","content":[{"type":"heading","attrs":{"level":1},"content":[{"type":"text","text":"Title"}]}]}"#;
        assert_eq!(render_with(offset, h1), "### Title\n");
    }

    #[test]
    fn heading_accepts_legacy_level_field() {
        let input = r#"{"type":"doc","content":[{"type":"heading","level":2,"content":[{"type":"text","text":"Legacy"}]}]}"#;
        assert_eq!(render(input), "## Legacy\n");
    }

    #[test]
    fn heading_level_arrives_as_float() {
        let input = r#"{"type":"doc","content":[{"type":"heading","attrs":{"level":3.0},"content":[{"type":"text","text":"Float"}]}]}"#;
        assert_eq!(render(input), "### Float\n");
    }

    #[test]
    fn blockquote_nests_existing_quotes() {
        let input = r#"{"type":"doc","content":[{"type":"blockquote","content":[
            {"type":"blockquote","content":[{"type":"paragraph","content":[{"type":"text","text":"deep"}]}]}
        ]}]}"#;
        assert_eq!(render(input), ">> deep\n");
    }

    #[test]
    fn code_block_applies_language_map() {
        let mut config = Config::default();
        config
            .language_map
            .insert("golang".to_string(), "go".to_string());
        let input = r#"{"type":"doc","content":[{"type":"codeBlock","attrs":{"language":"golang"},"content":[{"type":"text","text":"package main\n"}]}]}"#;
        assert_eq!(
            render_with(config, input),
            "```go\npackage main\n```\n"
        );
    }

    #[test]
    fn whitespace_only_code_block_is_skipped() {
        let input = r#"{"type":"doc","content":[{"type":"codeBlock","content":[{"type":"text","text":"  \n "}]}]}"#;
        assert_eq!(render(input), "");
    }

    #[test]
    fn github_panel_renders_callout() {
        let input = r#"{"type":"doc","content":[{"type":"panel","attrs":{"panelType":"warning"},"content":[
            {"type":"paragraph","content":[{"type":"text","text":"watch out"}]}
        ]}]}"#;
        assert_eq!(render(input), "> [!WARNING]\n> watch out\n");
    }

    #[test]
    fn bold_panel_prefixes_first_line() {
        let config = Config {
            panel_style: PanelStyle::Bold,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"panel","attrs":{"panelType":"info"},"content":[
            {"type":"paragraph","content":[{"type":"text","text":"heads up"}]}
        ]}]}"#;
        assert_eq!(render_with(config, input), "> **Info**: heads up\n");
    }

    #[test]
    fn title_panel_with_title_attr() {
        let config = Config {
            panel_style: PanelStyle::Title,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"panel","attrs":{"panelType":"note","title":"Read me"},"content":[
            {"type":"paragraph","content":[{"type":"text","text":"body"}]}
        ]}]}"#;
        assert_eq!(render_with(config, input), "> [!NOTE: Read me]\n> body\n");
    }

    #[test]
    fn title_panel_without_type_falls_back_to_plain_blockquote() {
        let config = Config {
            panel_style: PanelStyle::Title,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"panel","attrs":{"title":"Orphan"},"content":[
            {"type":"paragraph","content":[{"type":"text","text":"body"}]}
        ]}]}"#;
        assert_eq!(render_with(config, input), "> body\n");
    }

    #[test]
    fn decision_list_joins_items_with_blank_quoted_line() {
        let input = r#"{"type":"doc","content":[{"type":"decisionList","content":[
            {"type":"decisionItem","attrs":{"state":"DECIDED"},"content":[{"type":"paragraph","content":[{"type":"text","text":"ship it"}]}]},
            {"type":"decisionItem","attrs":{"state":"UNDECIDED"},"content":[{"type":"paragraph","content":[{"type":"text","text":"maybe"}]}]}
        ]}]}"#;
        assert_eq!(
            render(input),
            "> **\u{2713} Decision**: ship it\n> \n> **? Decision**: maybe\n"
        );
    }

    #[test]
    fn decision_text_style() {
        let config = Config {
            decision_style: DecisionStyle::Text,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"decisionList","content":[
            {"type":"decisionItem","content":[{"type":"paragraph","content":[{"type":"text","text":"open"}]}]}
        ]}]}"#;
        assert_eq!(render_with(config, input), "> **DECISION**: open\n");
    }

    #[test]
    fn expand_html_escapes_title() {
        let input = r#"{"type":"doc","content":[{"type":"expand","attrs":{"title":"a <b>"},"content":[
            {"type":"paragraph","content":[{"type":"text","text":"hidden"}]}
        ]}]}"#;
        assert_eq!(
            render(input),
            "<details><summary>a &lt;b&gt;</summary>\n\nhidden\n\n</details>\n"
        );
    }

    #[test]
    fn expand_pandoc_has_summary_attr() {
        let config = Config {
            expand_style: ExpandStyle::Pandoc,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"expand","attrs":{"title":"More"},"content":[
            {"type":"paragraph","content":[{"type":"text","text":"hidden"}]}
        ]}]}"#;
        assert_eq!(
            render_with(config, input),
            ":::{ .details summary=\"More\" }\n\nhidden\n\n:::\n"
        );
    }

    #[test]
    fn expand_blockquote_style() {
        let config = Config {
            expand_style: ExpandStyle::Blockquote,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"expand","attrs":{"title":"More"},"content":[
            {"type":"paragraph","content":[{"type":"text","text":"hidden"}]}
        ]}]}"#;
        assert_eq!(render_with(config, input), "> **More**\n> \n> hidden\n");
    }

    #[test]
    fn layout_column_width_trims_trailing_zeros() {
        let config = Config {
            layout_section_style: LayoutSectionStyle::Html,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"layoutSection","content":[
            {"type":"layoutColumn","attrs":{"width":33.33},"content":[{"type":"paragraph","content":[{"type":"text","text":"col"}]}]}
        ]}]}"#;
        assert_eq!(
            render_with(config, input),
            "<div class=\"layout-section\">\n\n<div class=\"layout-column\" style=\"width: 33.33%;\">\n\ncol\n</div>\n\n</div>\n"
        );
    }

    #[test]
    fn layout_standard_passes_through() {
        let input = r#"{"type":"doc","content":[{"type":"layoutSection","content":[
            {"type":"layoutColumn","content":[{"type":"paragraph","content":[{"type":"text","text":"col"}]}]}
        ]}]}"#;
        assert_eq!(render(input), "col\n");
    }

    #[test]
    fn aligned_paragraph_html() {
        let config = Config {
            alignment_style: AlignmentStyle::Html,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"paragraph","attrs":{"align":"center"},"content":[{"type":"text","text":"centered"}]}]}"#;
        assert_eq!(
            render_with(config, input),
            "<div align=\"center\">centered</div>\n"
        );
    }

    #[test]
    fn aligned_heading_pandoc() {
        let config = Config {
            alignment_style: AlignmentStyle::Pandoc,
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"heading","attrs":{"level":2,"layout":"right"},"content":[{"type":"text","text":"Title"}]}]}"#;
        assert_eq!(
            render_with(config, input),
            "## Title {style=\"text-align: right;\"}\n"
        );
    }
}
