//! Media renderers: external images, internal attachment placeholders and
//! the media container nodes.

use crate::ast::Node;
use crate::config::UnknownPolicy;
use crate::error::ConvertError;
use crate::hooks::{media_metadata_from_attrs, MediaRenderInput};
use crate::result::WarningKind;

use super::RenderState;

impl RenderState<'_> {
    pub(crate) fn render_media_single(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let content = self.render_children(&node.content)?;
        if content.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{content}\n\n"))
    }

    pub(crate) fn render_media_group(&mut self, node: &Node) -> Result<String, ConvertError> {
        if node.content.is_empty() {
            return Ok(String::new());
        }

        let mut items = Vec::new();
        for child in &node.content {
            items.push(self.render_node(child)?);
        }
        Ok(format!("{}\n\n", items.join("\n")))
    }

    pub(crate) fn render_media(&mut self, node: &Node) -> Result<String, ConvertError> {
        let media_type = node.str_attr("type", "").to_string();
        let id = node.str_attr("id", "").to_string();
        let alt = node.str_attr("alt", "").to_string();
        let url = node.str_attr("url", "").to_string();

        let input = MediaRenderInput {
            source_path: self.options.source_path.clone(),
            media_type: media_type.clone(),
            id: id.clone(),
            url: url.clone(),
            alt: alt.clone(),
            meta: media_metadata_from_attrs(node.attrs.as_ref(), &id, &url),
            attrs: node.attrs.clone(),
        };
        if let Some(output) = self.apply_media_render_hook(&node.kind, input)? {
            return Ok(output.markdown);
        }

        // External image.
        if media_type == "image" && !url.is_empty() {
            let alt = if alt.is_empty() { "Image" } else { &alt };
            return Ok(format!("![{alt}]({url})"));
        }

        // Internal image with a configured base URL synthesises a real link.
        if media_type == "image" && !id.is_empty() && !self.config.media_base_url.is_empty() {
            let mut base = self.config.media_base_url.clone();
            if !base.ends_with('/') {
                base.push('/');
            }
            let alt = if alt.is_empty() { "Image" } else { &alt };
            return Ok(format!("![{alt}]({base}{id})"));
        }

        if id.is_empty() {
            if self.config.unknown_nodes == UnknownPolicy::Error {
                return Err(ConvertError::Parse(format!(
                    "media node{} missing id",
                    if media_type.is_empty() {
                        String::new()
                    } else {
                        format!(" of type {media_type}")
                    }
                )));
            }
            self.warn(
                WarningKind::MissingAttribute,
                &node.kind,
                "media node missing id",
            );
            return Ok(match media_type.as_str() {
                "image" => "[Image: (no id)]".to_string(),
                "file" => "[File: (no id)]".to_string(),
                _ => "[Media: (no id)]".to_string(),
            });
        }

        Ok(match media_type.as_str() {
            "image" => format!("[Image: {id}]"),
            "file" => format!("[File: {id}]"),
            _ => format!("[Media: {id}]"),
        })
    }
}

#[cfg(test)]
mod tests {
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
    fn external_image_renders_inline() {
        let input = r#"{"type":"doc","content":[{"type":"mediaSingle","content":[
            {"type":"media","attrs":{"type":"image","url":"https://example.com/cat.png","alt":"Cat"}}
        ]}]}"#;
        assert_eq!(render(input), "![Cat](https://example.com/cat.png)\n");
    }

    #[test]
    fn internal_image_uses_media_base_url() {
        let config = Config {
            media_base_url: "https://media.example.com/files".to_string(),
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[{"type":"mediaSingle","content":[
            {"type":"media","attrs":{"type":"image","id":"abc-123"}}
        ]}]}"#;
        assert_eq!(
            render_with(config, input),
            "![Image](https://media.example.com/files/abc-123)\n"
        );
    }

    #[test]
    fn internal_media_placeholders() {
        let image = r#"{"type":"doc","content":[{"type":"mediaSingle","content":[
            {"type":"media","attrs":{"type":"image","id":"img-1"}}
        ]}]}"#;
        assert_eq!(render(image), "[Image: img-1]\n");

        let file = r#"{"type":"doc","content":[{"type":"mediaGroup","content":[
            {"type":"media","attrs":{"type":"file","id":"file-1"}},
            {"type":"media","attrs":{"type":"file","id":"file-2"}}
        ]}]}"#;
        assert_eq!(render(file), "[File: file-1]\n[File: file-2]\n");
    }

    #[test]
    fn missing_id_warns_and_renders_placeholder() {
        let result = MarkdownSerializer::new(Config::default())
            .unwrap()
            .serialize(
                br#"{"type":"doc","content":[{"type":"mediaSingle","content":[{"type":"media","attrs":{"type":"file"}}]}]}"#,
            )
            .unwrap();
        assert_eq!(result.markdown, "[File: (no id)]\n");
        assert_eq!(result.warnings.len(), 1);
    }
}
