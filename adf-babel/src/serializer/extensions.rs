//! Extension node rendering: registered handlers, bodied extension
//! wrappers and the generic json/text/strip fallbacks.

use serde::Serialize;

use crate::ast::{Attrs, Node};
use crate::config::{BodiedExtensionStyle, ExtensionMode};
use crate::error::ConvertError;
use crate::hooks::{ExtensionRenderInput, HookError};
use crate::result::WarningKind;

use super::{escape_html, RenderState};

#[derive(Serialize)]
struct ExtensionPayload<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attrs: Option<&'a Attrs>,
    #[serde(skip_serializing_if = "<[Node]>::is_empty")]
    content: &'a [Node],
}

impl RenderState<'_> {
    pub(crate) fn render_extension(&mut self, node: &Node) -> Result<String, ConvertError> {
        let extension_key = node.str_attr("extensionKey", "").to_string();

        if !extension_key.is_empty() {
            if let Some(handler) = self.config.extension_handlers.get(&extension_key) {
                let handler = handler.clone();
                let input = ExtensionRenderInput {
                    source_path: self.options.source_path.clone(),
                    node: node.clone(),
                };
                self.check_cancelled()?;
                let output = handler.to_markdown(self.cancel, input).map_err(|err| match err {
                    HookError::Cancelled => ConvertError::Cancelled,
                    other => ConvertError::Extension(format!(
                        "extension handler {extension_key:?} failed: {other}"
                    )),
                })?;
                self.check_cancelled()?;

                if output.handled {
                    let mut out = String::from("::: { .adf-extension ");
                    out.push_str(&format!("key={extension_key:?}"));
                    for (key, value) in &output.metadata {
                        out.push_str(&format!(" {key}={value:?}"));
                    }
                    out.push_str(" }\n");
                    out.push_str(&output.markdown);
                    if !output.markdown.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(":::\n\n");
                    return Ok(out);
                }
            }
        }

        if node.kind == "bodiedExtension"
            && self.config.bodied_extension_style != BodiedExtensionStyle::Json
        {
            return self.render_bodied_extension(node);
        }

        let mut extension_type = node.str_attr("extensionType", "").to_string();
        if extension_type.is_empty() {
            extension_type = extension_key;
        }
        if extension_type.is_empty() {
            extension_type = node.kind.clone();
        }

        match self.config.extensions.mode_for(&extension_type) {
            ExtensionMode::Strip => {
                self.warn(
                    WarningKind::DroppedFeature,
                    &node.kind,
                    format!("extension {extension_type:?} stripped"),
                );
                Ok(String::new())
            }
            ExtensionMode::Text => {
                let text = self.extension_fallback_text(node)?;
                if text.is_empty() {
                    self.warn(
                        WarningKind::ExtensionFallback,
                        &node.kind,
                        format!("extension {extension_type:?} has no fallback text"),
                    );
                }
                Ok(text)
            }
            ExtensionMode::Json => self.render_extension_json(node),
        }
    }

    fn render_extension_json(&mut self, node: &Node) -> Result<String, ConvertError> {
        let payload = ExtensionPayload {
            kind: &node.kind,
            attrs: node.attrs.as_ref(),
            content: &node.content,
        };
        let data = serde_json::to_string_pretty(&payload).map_err(|err| {
            ConvertError::Extension(format!("failed to serialize extension node: {err}"))
        })?;
        Ok(format!("```adf:extension\n{data}\n```\n\n"))
    }

    fn extension_fallback_text(&mut self, node: &Node) -> Result<String, ConvertError> {
        if !node.content.is_empty() {
            let text = self.render_children(&node.content)?;
            let text = text.trim();
            if !text.is_empty() {
                return Ok(text.to_string());
            }
        }
        Ok(node.str_attr("text", "").to_string())
    }

    fn render_bodied_extension(&mut self, node: &Node) -> Result<String, ConvertError> {
        let children = self.render_children(&node.content)?;

        match self.config.bodied_extension_style {
            BodiedExtensionStyle::Standard => Ok(children),
            BodiedExtensionStyle::Html => {
                let key = node.str_attr("extensionKey", "");
                let extension_type = node.str_attr("extensionType", "");
                let params = serialize_extension_params(node.attrs.as_ref());

                let mut out = String::from("<div class=\"adf-bodied-extension\" ");
                out.push_str(&format!(
                    "data-extension-key=\"{}\" ",
                    escape_html(key)
                ));
                out.push_str(&format!(
                    "data-extension-type=\"{}\"",
                    escape_html(extension_type)
                ));
                if !params.is_empty() {
                    out.push_str(&format!(" data-parameters=\"{}\"", escape_html(&params)));
                }
                out.push_str(">\n\n");
                out.push_str(&children);
                if !children.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("</div>\n\n");
                Ok(out)
            }
            BodiedExtensionStyle::Pandoc => {
                let key = node.str_attr("extensionKey", "");
                let extension_type = node.str_attr("extensionType", "");
                let params = serialize_extension_params(node.attrs.as_ref());

                let mut out = String::from("::: { .adf-bodied-extension ");
                out.push_str(&format!("key={key:?} "));
                out.push_str(&format!("extensionType={extension_type:?}"));
                if !params.is_empty() {
                    out.push_str(&format!(" parameters={params:?}"));
                }
                out.push_str(" }\n\n");
                out.push_str(&children);
                if !children.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(":::\n\n");
                Ok(out)
            }
            BodiedExtensionStyle::Json => self.render_extension_json(node),
        }
    }
}

fn serialize_extension_params(attrs: Option<&Attrs>) -> String {
    match attrs.and_then(|attrs| attrs.get("parameters")) {
        Some(params) if !params.is_null() => serde_json::to_string(params).unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::cancel::CancelToken;
    use crate::config::{Config, ExtensionMode, ExtensionRules};
    use crate::hooks::{
        ExtensionHandler, ExtensionMetadata, ExtensionParseInput, ExtensionParseOutput,
        ExtensionRenderInput, ExtensionRenderOutput, HookError,
    };
    use crate::serializer::MarkdownSerializer;

    struct ChartHandler;

    impl ExtensionHandler for ChartHandler {
        fn to_markdown(
            &self,
            _cancel: &CancelToken,
            input: ExtensionRenderInput,
        ) -> Result<ExtensionRenderOutput, HookError> {
            let mut metadata = ExtensionMetadata::new();
            metadata.insert("zed".to_string(), "last".to_string());
            metadata.insert("axis".to_string(), "x".to_string());
            Ok(ExtensionRenderOutput {
                markdown: format!("chart {}", input.node.str_attr("extensionKey", "")),
                metadata,
                handled: true,
            })
        }

        fn from_markdown(
            &self,
            _cancel: &CancelToken,
            _input: ExtensionParseInput,
        ) -> Result<ExtensionParseOutput, HookError> {
            Ok(ExtensionParseOutput::default())
        }
    }

    fn render_with(config: Config, input: &str) -> String {
        MarkdownSerializer::new(config)
            .unwrap()
            .serialize(input.as_bytes())
            .unwrap()
            .markdown
    }

    const EXTENSION_DOC: &str = r#"{"type":"doc","content":[
        {"type":"extension","attrs":{"extensionKey":"chart","extensionType":"com.example.chart"}}
    ]}"#;

    #[test]
    fn handler_output_is_wrapped_with_sorted_metadata() {
        let mut handlers: HashMap<String, Arc<dyn ExtensionHandler>> = HashMap::new();
        handlers.insert("chart".to_string(), Arc::new(ChartHandler));
        let config = Config {
            extension_handlers: handlers,
            ..Config::default()
        };
        assert_eq!(
            render_with(config, EXTENSION_DOC),
            "::: { .adf-extension key=\"chart\" axis=\"x\" zed=\"last\" }\nchart chart\n:::\n"
        );
    }

    #[test]
    fn json_mode_emits_reserved_fence() {
        let output = render_with(Config::default(), EXTENSION_DOC);
        assert!(output.starts_with("```adf:extension\n"));
        assert!(output.contains("\"type\": \"extension\""));
        assert!(output.contains("\"extensionKey\": \"chart\""));
    }

    #[test]
    fn strip_mode_drops_with_warning() {
        let config = Config {
            extensions: ExtensionRules {
                default: ExtensionMode::Strip,
                by_type: HashMap::new(),
            },
            ..Config::default()
        };
        let result = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(EXTENSION_DOC.as_bytes())
            .unwrap();
        assert_eq!(result.markdown, "");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn text_mode_uses_rendered_children() {
        let config = Config {
            extensions: ExtensionRules {
                default: ExtensionMode::Text,
                by_type: HashMap::new(),
            },
            ..Config::default()
        };
        let input = r#"{"type":"doc","content":[
            {"type":"bodiedExtension","attrs":{"extensionKey":"note"},"content":[
                {"type":"paragraph","content":[{"type":"text","text":"inner"}]}
            ]}
        ]}"#;
        let config = Config {
            bodied_extension_style: crate::config::BodiedExtensionStyle::Json,
            ..config
        };
        assert_eq!(render_with(config, input), "inner\n");
    }

    #[test]
    fn bodied_extension_pandoc_wrapper() {
        let input = r#"{"type":"doc","content":[
            {"type":"bodiedExtension","attrs":{"extensionKey":"note","extensionType":"com.example.note","parameters":{"tone":"calm"}},"content":[
                {"type":"paragraph","content":[{"type":"text","text":"inner"}]}
            ]}
        ]}"#;
        assert_eq!(
            render_with(Config::default(), input),
            "::: { .adf-bodied-extension key=\"note\" extensionType=\"com.example.note\" parameters=\"{\\\"tone\\\":\\\"calm\\\"}\" }\n\ninner\n\n:::\n"
        );
    }
}
