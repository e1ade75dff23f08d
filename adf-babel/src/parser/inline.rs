//! Inline AST conversion: text runs, emphasis nesting, links, images and
//! raw HTML, feeding the ambient mark stack.

use comrak::nodes::{AstNode, NodeLink, NodeValue};
use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;
use crate::hooks::{
    link_metadata_from_destination, media_metadata_from_destination, LinkParseInput,
    MediaParseInput,
};
use crate::result::WarningKind;

use super::mark_stack::{append_inline_node, new_text_node, MarkStack};
use super::ParseState;

impl ParseState<'_> {
    pub(crate) fn convert_inline_children<'a>(
        &mut self,
        parent: &'a AstNode<'a>,
        stack: &mut MarkStack,
    ) -> Result<Vec<Node>, ConvertError> {
        let mut content = Vec::new();

        for child in parent.children() {
            self.check_cancelled()?;
            let converted = self.convert_inline_node(child, stack)?;
            for node in converted {
                append_inline_node(&mut content, node);
            }
        }

        Ok(content)
    }

    pub(crate) fn convert_inline_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        stack: &mut MarkStack,
    ) -> Result<Vec<Node>, ConvertError> {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Text(text) => {
                let text = text.clone();
                drop(data);

                if text.is_empty() {
                    return Ok(Vec::new());
                }
                // Inside a mention span the text is the display name.
                if let Some(id) = self.current_html_mention_id() {
                    return Ok(vec![mention_node(&id, text.trim())]);
                }
                Ok(vec![new_text_node(text, stack.current())])
            }

            NodeValue::SoftBreak => Ok(vec![new_text_node(" ", stack.current())]),
            NodeValue::LineBreak => Ok(vec![Node::bare("hardBreak")]),

            NodeValue::Code(code) => {
                let literal = code.literal.clone();
                drop(data);

                stack.push(crate::ast::Mark::bare("code"));
                let result = new_text_node(literal, stack.current());
                stack.pop_by_kind("code");
                Ok(vec![result])
            }

            NodeValue::Emph => {
                drop(data);
                stack.push(crate::ast::Mark::bare("em"));
                let content = self.convert_inline_children(node, stack);
                stack.pop_by_kind("em");
                content
            }

            NodeValue::Strong => {
                drop(data);
                stack.push(crate::ast::Mark::bare("strong"));
                let content = self.convert_inline_children(node, stack);
                stack.pop_by_kind("strong");
                content
            }

            NodeValue::Strikethrough => {
                drop(data);
                stack.push(crate::ast::Mark::bare("strike"));
                let content = self.convert_inline_children(node, stack);
                stack.pop_by_kind("strike");
                content
            }

            NodeValue::Link(link) => {
                let link = link.clone();
                drop(data);
                self.convert_link_node(node, &link, stack)
            }

            NodeValue::Image(link) => {
                let link = link.clone();
                drop(data);
                self.convert_image_node(node, &link, stack)
            }

            NodeValue::HtmlInline(html) => {
                let html = html.clone();
                drop(data);
                Ok(self.convert_raw_html(&html, stack))
            }

            other => {
                let kind = format!("{other:?}");
                let kind = kind.split(['(', ' ', '{']).next().unwrap_or("unknown").to_string();
                drop(data);

                if node.first_child().is_some() {
                    return self.convert_inline_children(node, stack);
                }

                let mut text = String::new();
                collect_text(node, &mut text);
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Ok(Vec::new());
                }
                self.warn(
                    WarningKind::UnknownNode,
                    &kind,
                    format!("unsupported markdown inline node: {kind}"),
                );
                Ok(vec![new_text_node(text, stack.current())])
            }
        }
    }

    fn convert_link_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        link: &NodeLink,
        stack: &mut MarkStack,
    ) -> Result<Vec<Node>, ConvertError> {
        let href = link.url.trim().to_string();
        if href.is_empty() {
            return self.convert_inline_children(node, stack);
        }

        let mut text = String::new();
        collect_text(node, &mut text);
        let text = text.trim().to_string();

        let mut destination = href.clone();
        let mut title = link.title.trim().to_string();
        let mut force_link = false;
        let mut force_card = false;

        let input = LinkParseInput {
            source_path: self.options.source_path.clone(),
            destination: destination.clone(),
            title: title.clone(),
            text: text.clone(),
            meta: link_metadata_from_destination(&destination),
        };
        if let Some(output) = self.apply_link_parse_hook(input)? {
            destination = output.destination;
            title = output.title;
            force_link = output.force_link;
            force_card = output.force_card;
        }

        // Mention links use a reserved scheme.
        if !force_card && !force_link && self.config.detect_mention_link() {
            if let Some(id) = destination.strip_prefix("mention:") {
                let display = text.trim_start_matches('@');
                return Ok(vec![mention_node(id, display)]);
            }
        }

        let looks_like_card = destination.starts_with("http://") || destination.starts_with("https://");
        if force_card || (!force_link && self.config.detect_inline_card_link() && looks_like_card) {
            let mut card = Node::bare("inlineCard");
            card.set_attr("url", Value::String(destination.clone()));
            if !text.is_empty() && text != destination {
                let mut inner = crate::ast::Attrs::new();
                inner.insert("name".to_string(), Value::String(text));
                inner.insert("url".to_string(), Value::String(destination));
                card.set_attr("data", Value::Object(inner));
            }
            return Ok(vec![card]);
        }

        let mut mark = crate::ast::Mark::with_attr("link", "href", destination);
        if !title.is_empty() {
            if let Some(attrs) = mark.attrs.as_mut() {
                attrs.insert("title".to_string(), Value::String(title));
            }
        }

        stack.push(mark);
        let content = self.convert_inline_children(node, stack);
        stack.pop_by_kind("link");
        content
    }

    fn convert_image_node<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        link: &NodeLink,
        _stack: &mut MarkStack,
    ) -> Result<Vec<Node>, ConvertError> {
        let destination = link.url.trim().to_string();
        let mut alt = String::new();
        collect_text(node, &mut alt);
        let alt = alt.trim().to_string();

        let input = MediaParseInput {
            source_path: self.options.source_path.clone(),
            destination: destination.clone(),
            alt: alt.clone(),
            meta: media_metadata_from_destination(&destination),
        };
        if let Some(output) = self.apply_media_parse_hook(input)? {
            let mut media = Node::bare("media");
            media.set_attr("type", Value::String(output.media_type));
            if !output.id.is_empty() {
                media.set_attr("id", Value::String(output.id));
            } else {
                media.set_attr("url", Value::String(output.url));
            }
            if !output.alt.is_empty() {
                media.set_attr("alt", Value::String(output.alt));
            }
            return Ok(vec![media_single(media)]);
        }

        let mut media = Node::bare("media");
        media.set_attr("type", Value::String("image".to_string()));

        // Destinations under the media base URL are internal attachments.
        let internal_id = if self.config.media_base_url.is_empty() {
            None
        } else {
            let mut base = self.config.media_base_url.clone();
            if !base.ends_with('/') {
                base.push('/');
            }
            destination.strip_prefix(&base).map(str::to_string)
        };

        match internal_id {
            Some(id) if !id.is_empty() => media.set_attr("id", Value::String(id)),
            _ => media.set_attr("url", Value::String(destination)),
        }

        if !alt.is_empty() && alt != "Image" {
            media.set_attr("alt", Value::String(alt));
        }

        Ok(vec![media_single(media)])
    }

    fn current_html_mention_id(&self) -> Option<String> {
        self.html_mention_stack.last().cloned()
    }
}

pub(crate) fn mention_node(id: &str, display: &str) -> Node {
    let mut mention = Node::bare("mention");
    mention.set_attr("id", Value::String(id.to_string()));
    let display = display.trim_start_matches('@').trim();
    if !display.is_empty() {
        mention.set_attr("text", Value::String(display.to_string()));
    }
    mention
}

fn media_single(media: Node) -> Node {
    Node {
        kind: "mediaSingle".to_string(),
        content: vec![media],
        ..Node::default()
    }
}

/// Plain text of an AST subtree; breaks collapse to spaces.
pub(crate) fn collect_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(text) => out.push_str(text),
        NodeValue::Code(code) => out.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
        NodeValue::HtmlInline(_) => {}
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::ast::Doc;
    use crate::hooks::{HookError, LinkParseOutput, MediaParseOutput};
    use crate::parser::config::{InlineCardDetection, MentionDetection};
    use crate::parser::{MarkdownParser, ReverseConfig};

    fn parse_doc_with(config: ReverseConfig, markdown: &str) -> Doc {
        let result = MarkdownParser::new(config).unwrap().parse(markdown).unwrap();
        serde_json::from_slice(&result.adf).unwrap()
    }

    fn parse_doc(markdown: &str) -> Doc {
        parse_doc_with(ReverseConfig::default(), markdown)
    }

    #[test]
    fn nested_emphasis_builds_mark_lists() {
        let doc = parse_doc("**bold _bold+italic_ end**\n");
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.content.len(), 3);
        assert_eq!(paragraph.content[0].marks.len(), 1);
        assert_eq!(paragraph.content[0].marks[0].kind, "strong");
        assert_eq!(paragraph.content[1].text_value(), "bold+italic");
        assert_eq!(paragraph.content[1].marks.len(), 2);
        assert_eq!(paragraph.content[1].marks[1].kind, "em");
    }

    #[test]
    fn adjacent_equal_runs_coalesce() {
        let doc = parse_doc("plain ~~struck~~ more\n");
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.content.len(), 3);
        assert_eq!(paragraph.content[1].marks[0].kind, "strike");
    }

    #[test]
    fn code_span_gets_code_mark() {
        let doc = parse_doc("run `cargo doc` now\n");
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.content[1].text_value(), "cargo doc");
        assert_eq!(paragraph.content[1].marks[0].kind, "code");
    }

    #[test]
    fn link_becomes_link_mark_with_title() {
        let doc = parse_doc("[docs](https://example.com \"Docs\")\n");
        let text = &doc.content[0].content[0];
        assert_eq!(text.text_value(), "docs");
        let mark = &text.marks[0];
        assert_eq!(mark.kind, "link");
        assert_eq!(mark.str_attr("href", ""), "https://example.com");
        assert_eq!(mark.str_attr("title", ""), "Docs");
    }

    #[test]
    fn mention_link_reconstructs_mention() {
        let doc = parse_doc("[@Alice](mention:u1)\n");
        let mention = &doc.content[0].content[0];
        assert_eq!(mention.kind, "mention");
        assert_eq!(mention.str_attr("id", ""), "u1");
        assert_eq!(mention.str_attr("text", ""), "Alice");
    }

    #[test]
    fn mention_detection_none_keeps_the_link() {
        let config = ReverseConfig {
            mention_detection: MentionDetection::None,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "[@Alice](mention:u1)\n");
        let text = &doc.content[0].content[0];
        assert_eq!(text.kind, "text");
        assert_eq!(text.marks[0].str_attr("href", ""), "mention:u1");
    }

    #[test]
    fn inline_card_link_detection() {
        let config = ReverseConfig {
            inline_card_detection: InlineCardDetection::Link,
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "[Page](https://example.com/page)\n");
        let card = &doc.content[0].content[0];
        assert_eq!(card.kind, "inlineCard");
        assert_eq!(card.str_attr("url", ""), "https://example.com/page");
        let data = card.attrs.as_ref().unwrap().get("data").unwrap();
        assert_eq!(data["name"], "Page");
    }

    #[test]
    fn hook_force_card_overrides_detection() {
        let config = ReverseConfig {
            link_hook: Some(Arc::new(|_cancel, input| {
                Ok(LinkParseOutput {
                    destination: input.destination,
                    title: String::new(),
                    force_link: false,
                    force_card: true,
                    handled: true,
                })
            })),
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "[Page](https://example.com/page)\n");
        assert_eq!(doc.content[0].content[0].kind, "inlineCard");
    }

    #[test]
    fn conflicting_force_flags_fail() {
        let config = ReverseConfig {
            link_hook: Some(Arc::new(|_cancel, input| {
                Ok(LinkParseOutput {
                    destination: input.destination,
                    title: String::new(),
                    force_link: true,
                    force_card: true,
                    handled: true,
                })
            })),
            ..ReverseConfig::default()
        };
        let err = MarkdownParser::new(config)
            .unwrap()
            .parse("[Page](https://example.com/page)\n")
            .unwrap_err();
        assert!(matches!(err, crate::error::ConvertError::Hook(_)));
    }

    #[test]
    fn external_image_keeps_url_and_alt() {
        let doc = parse_doc("![Cat photo](https://example.com/cat.png)\n");
        let media = &doc.content[0].content[0];
        assert_eq!(media.kind, "media");
        assert_eq!(media.str_attr("type", ""), "image");
        assert_eq!(media.str_attr("url", ""), "https://example.com/cat.png");
        assert_eq!(media.str_attr("alt", ""), "Cat photo");
    }

    #[test]
    fn default_alt_is_omitted() {
        let doc = parse_doc("![Image](https://example.com/cat.png)\n");
        let media = &doc.content[0].content[0];
        assert_eq!(media.str_attr("alt", "absent"), "absent");
    }

    #[test]
    fn media_base_url_strips_to_internal_id() {
        let config = ReverseConfig {
            media_base_url: "https://media.example.com/files".to_string(),
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "![Image](https://media.example.com/files/abc-123)\n");
        let media = &doc.content[0].content[0];
        assert_eq!(media.str_attr("id", ""), "abc-123");
        assert_eq!(media.str_attr("url", "absent"), "absent");
    }

    #[test]
    fn media_hook_maps_destination() {
        let config = ReverseConfig {
            media_hook: Some(Arc::new(|_cancel, _input| {
                Ok(MediaParseOutput {
                    media_type: "file".to_string(),
                    id: "att-7".to_string(),
                    url: String::new(),
                    alt: String::new(),
                    handled: true,
                })
            })),
            ..ReverseConfig::default()
        };
        let doc = parse_doc_with(config, "![doc](attachments/doc.pdf)\n");
        let media = &doc.content[0].content[0];
        assert_eq!(media.str_attr("type", ""), "file");
        assert_eq!(media.str_attr("id", ""), "att-7");
    }

    #[test]
    fn unresolved_media_hook_warns_and_falls_back() {
        let config = ReverseConfig {
            media_hook: Some(Arc::new(|_cancel, _input| Err(HookError::Unresolved))),
            ..ReverseConfig::default()
        };
        let result = MarkdownParser::new(config)
            .unwrap()
            .parse("![Cat](https://example.com/cat.png)\n")
            .unwrap();
        let doc: Doc = serde_json::from_slice(&result.adf).unwrap();
        assert_eq!(doc.content[0].content[0].str_attr("url", ""), "https://example.com/cat.png");
        assert_eq!(result.warnings.len(), 1);
    }
}
