//! Extension reconstruction: reserved `adf:` fences, `.adf-extension`
//! handler divs and `.adf-bodied-extension` wrappers.

use serde_json::Value;

use crate::ast::Node;
use crate::error::ConvertError;
use crate::hooks::{ExtensionMetadata, ExtensionParseInput, HookError};
use crate::result::WarningKind;

use super::pandoc_div::literal_paragraph;
use super::segment::PandocDiv;
use super::ParseState;

impl ParseState<'_> {
    /// Reserved fenced-code languages carrying embedded ADF JSON.
    pub(crate) fn parse_extension_fence(
        &mut self,
        language: &str,
        body: &str,
    ) -> Result<Option<Node>, ConvertError> {
        match language.trim().to_lowercase().as_str() {
            "adf:extension" => {
                let payload: Node = serde_json::from_str(body).map_err(|err| {
                    ConvertError::Extension(format!("failed to parse adf:extension payload: {err}"))
                })?;
                if payload.kind.trim().is_empty() {
                    return Err(ConvertError::Extension(
                        "adf:extension payload missing type".to_string(),
                    ));
                }
                Ok(Some(payload))
            }

            "adf:inlinecard" => {
                let payload: serde_json::Map<String, Value> = serde_json::from_str(body)
                    .map_err(|err| {
                        ConvertError::Extension(format!(
                            "failed to parse adf:inlineCard payload: {err}"
                        ))
                    })?;
                Ok(Some(Node {
                    kind: "inlineCard".to_string(),
                    attrs: Some(payload),
                    ..Node::default()
                }))
            }

            _ => Ok(None),
        }
    }

    /// `.adf-extension` divs route to the registered handler for their
    /// key; unhandled divs fall back to a blockquote of the parsed body.
    pub(crate) fn convert_extension_div(
        &mut self,
        div: &PandocDiv,
    ) -> Result<Option<Node>, ConvertError> {
        let key = div.attrs.get("key").map(String::as_str).unwrap_or("").trim();

        if !key.is_empty() {
            if let Some(handler) = self.config.extension_handlers.get(key) {
                let handler = handler.clone();
                let mut metadata = ExtensionMetadata::new();
                for (name, value) in &div.attrs {
                    if name != "key" {
                        metadata.insert(name.clone(), value.clone());
                    }
                }

                let input = ExtensionParseInput {
                    source_path: self.options.source_path.clone(),
                    extension_key: key.to_string(),
                    body: div.body.clone(),
                    metadata,
                };

                self.check_cancelled()?;
                let output = handler.from_markdown(self.cancel, input).map_err(|err| {
                    match err {
                        HookError::Cancelled => ConvertError::Cancelled,
                        other => ConvertError::Extension(format!(
                            "extension handler {key:?} failed: {other}"
                        )),
                    }
                })?;
                self.check_cancelled()?;

                if output.handled {
                    if output.node.kind.trim().is_empty() {
                        return Err(ConvertError::Extension(format!(
                            "extension handler {key:?} returned a node without a type"
                        )));
                    }
                    return Ok(Some(output.node));
                }
            }
        }

        self.warn(
            WarningKind::ExtensionFallback,
            "extension",
            format!("no handler reconstructed extension div {key:?}; body kept as blockquote"),
        );
        let mut content = self.convert_block_fragment(&div.body)?;
        if content.is_empty() {
            content = vec![literal_paragraph(&div.body)];
        }
        Ok(Some(Node {
            kind: "blockquote".to_string(),
            content,
            ..Node::default()
        }))
    }

    /// `.adf-bodied-extension` divs rebuild the node with its parameters
    /// and re-parsed body.
    pub(crate) fn convert_bodied_extension_div(
        &mut self,
        div: &PandocDiv,
    ) -> Result<Option<Node>, ConvertError> {
        if !self.config.detect_bodied_extension_pandoc() {
            return Ok(Some(literal_paragraph(&div.literal())));
        }

        let mut node = Node::bare("bodiedExtension");
        if let Some(key) = div.attrs.get("key") {
            if !key.trim().is_empty() {
                node.set_attr("extensionKey", Value::String(key.trim().to_string()));
            }
        }
        if let Some(extension_type) = div.attrs.get("extensionType") {
            if !extension_type.trim().is_empty() {
                node.set_attr(
                    "extensionType",
                    Value::String(extension_type.trim().to_string()),
                );
            }
        }
        if let Some(parameters) = div.attrs.get("parameters") {
            if let Ok(parsed) = serde_json::from_str::<Value>(parameters) {
                node.set_attr("parameters", parsed);
            }
        }

        node.content = self.convert_block_fragment(&div.body)?;
        Ok(Some(node))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::ast::{Doc, Node};
    use crate::cancel::CancelToken;
    use crate::error::ConvertError;
    use crate::hooks::{
        ExtensionHandler, ExtensionParseInput, ExtensionParseOutput, ExtensionRenderInput,
        ExtensionRenderOutput, HookError,
    };
    use crate::parser::{MarkdownParser, ReverseConfig};

    struct ChartHandler;

    impl ExtensionHandler for ChartHandler {
        fn to_markdown(
            &self,
            _cancel: &CancelToken,
            _input: ExtensionRenderInput,
        ) -> Result<ExtensionRenderOutput, HookError> {
            Ok(ExtensionRenderOutput::default())
        }

        fn from_markdown(
            &self,
            _cancel: &CancelToken,
            input: ExtensionParseInput,
        ) -> Result<ExtensionParseOutput, HookError> {
            let mut node = Node::bare("extension");
            node.set_attr(
                "extensionKey",
                serde_json::Value::String(input.extension_key),
            );
            if let Some(axis) = input.metadata.get("axis") {
                node.set_attr("axis", serde_json::Value::String(axis.clone()));
            }
            Ok(ExtensionParseOutput {
                node,
                handled: true,
            })
        }
    }

    fn parse_doc_with(config: ReverseConfig, markdown: &str) -> Doc {
        let result = MarkdownParser::new(config).unwrap().parse(markdown).unwrap();
        serde_json::from_slice(&result.adf).unwrap()
    }

    #[test]
    fn extension_fence_rebuilds_node() {
        let markdown = "```adf:extension\n{\"type\": \"extension\", \"attrs\": {\"extensionKey\": \"chart\"}}\n```\n";
        let doc = parse_doc_with(ReverseConfig::default(), markdown);
        assert_eq!(doc.content[0].kind, "extension");
        assert_eq!(doc.content[0].str_attr("extensionKey", ""), "chart");
    }

    #[test]
    fn extension_fence_without_type_is_an_error() {
        let markdown = "```adf:extension\n{\"attrs\": {}}\n```\n";
        let err = MarkdownParser::new(ReverseConfig::default())
            .unwrap()
            .parse(markdown)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Extension(_)));
    }

    #[test]
    fn inline_card_fence_rebuilds_attrs() {
        let markdown = "```adf:inlineCard\n{\"url\": \"https://example.com\"}\n```\n";
        let doc = parse_doc_with(ReverseConfig::default(), markdown);
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.content[0].kind, "inlineCard");
        assert_eq!(
            paragraph.content[0].str_attr("url", ""),
            "https://example.com"
        );
    }

    #[test]
    fn handler_div_round_trips_through_from_markdown() {
        let mut handlers: HashMap<String, Arc<dyn ExtensionHandler>> = HashMap::new();
        handlers.insert("chart".to_string(), Arc::new(ChartHandler));
        let config = ReverseConfig {
            extension_handlers: handlers,
            ..ReverseConfig::default()
        };
        let markdown = "::: { .adf-extension key=\"chart\" axis=\"x\" }\nchart body\n:::\n";
        let doc = parse_doc_with(config, markdown);
        assert_eq!(doc.content[0].kind, "extension");
        assert_eq!(doc.content[0].str_attr("axis", ""), "x");
    }

    #[test]
    fn unhandled_extension_div_falls_back_to_blockquote() {
        let mut handlers: HashMap<String, Arc<dyn ExtensionHandler>> = HashMap::new();
        handlers.insert("other".to_string(), Arc::new(ChartHandler));
        let config = ReverseConfig {
            extension_handlers: handlers,
            ..ReverseConfig::default()
        };
        let result = MarkdownParser::new(config)
            .unwrap()
            .parse("::: { .adf-extension key=\"chart\" }\nbody text\n:::\n")
            .unwrap();
        let doc: Doc = serde_json::from_slice(&result.adf).unwrap();
        assert_eq!(doc.content[0].kind, "blockquote");
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn bodied_extension_div_reconstructs() {
        let markdown = "::: { .adf-bodied-extension key=\"note\" extensionType=\"com.example.note\" parameters=\"{\\\"tone\\\":\\\"calm\\\"}\" }\n\ninner\n\n:::\n";
        let doc = parse_doc_with(ReverseConfig::default(), markdown);
        let node = &doc.content[0];
        assert_eq!(node.kind, "bodiedExtension");
        assert_eq!(node.str_attr("extensionKey", ""), "note");
        assert_eq!(node.str_attr("extensionType", ""), "com.example.note");
        let parameters = node.attrs.as_ref().unwrap().get("parameters").unwrap();
        assert_eq!(parameters["tone"], "calm");
        assert_eq!(node.content[0].content[0].text_value(), "inner");
    }
}
