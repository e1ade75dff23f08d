//! Fenced div conversion: `.details` expands, alignment wrappers,
//! extension divs, layout divs and the unknown-class fallback.

use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;
use crate::result::WarningKind;

use super::pandoc::extract_text_align;
use super::segment::PandocDiv;
use super::ParseState;

impl ParseState<'_> {
    pub(crate) fn convert_pandoc_div(
        &mut self,
        div: &PandocDiv,
    ) -> Result<Option<Node>, ConvertError> {
        if div.classes.iter().any(|class| class == "adf-extension") {
            return self.convert_extension_div(div);
        }

        if div.classes.iter().any(|class| class == "adf-bodied-extension") {
            return self.convert_bodied_extension_div(div);
        }

        if div.classes.iter().any(|class| class == "details") {
            if !self.config.detect_expand_pandoc() {
                return Ok(Some(literal_paragraph(&div.literal())));
            }

            let kind = if self.pandoc_expand_depth > 0 || self.html_expand_depth > 0 {
                "nestedExpand"
            } else {
                "expand"
            };

            self.pandoc_expand_depth += 1;
            let content = self.convert_block_fragment(&div.body);
            self.pandoc_expand_depth -= 1;
            let content = content?;

            let mut expand = Node {
                kind: kind.to_string(),
                content,
                ..Node::default()
            };
            if let Some(title) = div.attrs.get("summary") {
                let title = title.trim();
                if !title.is_empty() {
                    expand.set_attr("title", Value::String(title.to_string()));
                }
            }
            return Ok(Some(expand));
        }

        if div.classes.iter().any(|class| class == "layoutSection") {
            let content = self.convert_block_fragment(&div.body)?;
            if content.is_empty() {
                return Ok(None);
            }
            return Ok(Some(Node {
                kind: "layoutSection".to_string(),
                content,
                ..Node::default()
            }));
        }

        if div.classes.iter().any(|class| class == "layoutColumn") {
            let content = self.convert_block_fragment(&div.body)?;
            let mut column = Node {
                kind: "layoutColumn".to_string(),
                content,
                ..Node::default()
            };
            if let Some(width) = div.attrs.get("width") {
                let width = width.trim().trim_end_matches('%');
                if let Ok(parsed) = width.parse::<f64>() {
                    if let Some(number) = serde_json::Number::from_f64(parsed) {
                        column.set_attr("width", Value::Number(number));
                    }
                }
            }
            return Ok(Some(column));
        }

        let alignment = div
            .attrs
            .get("align")
            .map(|value| value.trim().to_lowercase())
            .filter(|value| matches!(value.as_str(), "left" | "center" | "right"))
            .or_else(|| {
                div.attrs
                    .get("style")
                    .and_then(|style| extract_text_align(style))
            });
        if let Some(alignment) = alignment {
            if !self.config.detect_align_pandoc() {
                return Ok(Some(literal_paragraph(&div.literal())));
            }

            let content = self.convert_block_fragment(&div.body)?;
            let aligned = self.apply_pandoc_alignment(content, &alignment);
            if aligned.is_empty() {
                return Ok(None);
            }
            if aligned.len() == 1 {
                return Ok(Some(aligned.into_iter().next().expect("one element")));
            }
            return Ok(Some(Node {
                kind: "layoutSection".to_string(),
                content: aligned,
                ..Node::default()
            }));
        }

        // Unknown classes degrade to a blockquote only when the caller
        // opted into the Pandoc dialect; otherwise the div stays literal.
        let pandoc_dialect_requested =
            self.config.detect_expand_pandoc() || self.config.detect_align_pandoc();
        if !div.classes.is_empty() && pandoc_dialect_requested {
            self.warn(
                WarningKind::DroppedFeature,
                "pandocDiv",
                "unknown pandoc div class converted to blockquote",
            );
            let mut content = self.convert_block_fragment(&div.body)?;
            if content.is_empty() {
                content = vec![literal_paragraph(&div.body)];
            }
            return Ok(Some(Node {
                kind: "blockquote".to_string(),
                content,
                ..Node::default()
            }));
        }

        Ok(Some(literal_paragraph(&div.literal())))
    }

    fn apply_pandoc_alignment(&mut self, content: Vec<Node>, alignment: &str) -> Vec<Node> {
        let mut out = Vec::with_capacity(content.len());
        for mut node in content {
            match node.kind.as_str() {
                "paragraph" | "heading" => {
                    node.set_attr("layout", Value::String(alignment.to_string()));
                }
                other => {
                    self.warn(
                        WarningKind::DroppedFeature,
                        other,
                        "alignment skipped for unsupported block in pandoc div",
                    );
                }
            }
            out.push(node);
        }
        out
    }
}

pub(crate) fn literal_paragraph(text: &str) -> Node {
    Node {
        kind: "paragraph".to_string(),
        content: vec![Node::text(text, Vec::new())],
        ..Node::default()
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Doc;
    use crate::parser::config::{AlignmentDetection, ExpandDetection};
    use crate::parser::{MarkdownParser, ReverseConfig};

    fn pandoc_config() -> ReverseConfig {
        ReverseConfig {
            expand_detection: ExpandDetection::Pandoc,
            alignment_detection: AlignmentDetection::Pandoc,
            ..ReverseConfig::default()
        }
    }

    fn parse_doc_with(config: ReverseConfig, markdown: &str) -> Doc {
        let result = MarkdownParser::new(config).unwrap().parse(markdown).unwrap();
        serde_json::from_slice(&result.adf).unwrap()
    }

    #[test]
    fn details_div_becomes_expand() {
        let doc = parse_doc_with(
            pandoc_config(),
            ":::{ .details summary=\"More\" }\n\nhidden\n\n:::\n",
        );
        let expand = &doc.content[0];
        assert_eq!(expand.kind, "expand");
        assert_eq!(expand.str_attr("title", ""), "More");
        assert_eq!(expand.content[0].content[0].text_value(), "hidden");
    }

    #[test]
    fn nested_details_div_is_nested_expand() {
        let doc = parse_doc_with(
            pandoc_config(),
            ":::{ .details summary=\"outer\" }\n:::{ .details summary=\"inner\" }\ndeep\n:::\n:::\n",
        );
        let outer = &doc.content[0];
        assert_eq!(outer.kind, "expand");
        assert_eq!(outer.content[0].kind, "nestedExpand");
    }

    #[test]
    fn aligned_div_sets_layout_on_inner_paragraph() {
        let doc = parse_doc_with(
            pandoc_config(),
            ":::{ style=\"text-align: center;\" }\n\ncentered\n\n:::\n",
        );
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.kind, "paragraph");
        assert_eq!(paragraph.str_attr("layout", ""), "center");
    }

    #[test]
    fn aligned_div_with_multiple_blocks_wraps_in_layout_section() {
        let doc = parse_doc_with(
            pandoc_config(),
            ":::{ align=right }\n\none\n\ntwo\n\n:::\n",
        );
        let section = &doc.content[0];
        assert_eq!(section.kind, "layoutSection");
        assert_eq!(section.content.len(), 2);
        assert_eq!(section.content[0].str_attr("layout", ""), "right");
    }

    #[test]
    fn unknown_div_class_becomes_blockquote_with_warning() {
        let result = MarkdownParser::new(pandoc_config())
            .unwrap()
            .parse(":::{ .mystery }\n\nbody\n\n:::\n")
            .unwrap();
        let doc: Doc = serde_json::from_slice(&result.adf).unwrap();
        assert_eq!(doc.content[0].kind, "blockquote");
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn layout_divs_reconstruct_columns() {
        let markdown = "::::{ .layoutSection }\n:::{ .layoutColumn width=\"50%\" }\n\nleft\n\n:::\n::::\n";
        let doc = parse_doc_with(pandoc_config(), markdown);
        let section = &doc.content[0];
        assert_eq!(section.kind, "layoutSection");
        assert_eq!(section.content[0].kind, "layoutColumn");
        assert_eq!(section.content[0].float_attr("width", 0.0), 50.0);
    }

    #[test]
    fn expand_detection_off_preserves_div_as_text() {
        let config = ReverseConfig {
            alignment_detection: AlignmentDetection::Pandoc,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, ":::{ .details }\nx\n:::\n");
        assert_eq!(doc.content[0].kind, "paragraph");
        assert!(doc.content[0].content[0]
            .text_value()
            .contains(".details"));
    }
}
