//! Applying render hooks: unresolved-reference policy, output validation
//! and the per-conversion link resolution cache.

use crate::ast::Mark;
use crate::error::ConvertError;
use crate::hooks::{
    link_metadata_from_attrs, HookError, LinkRenderInput, LinkRenderOutput, LinkSource,
    MediaRenderInput, MediaRenderOutput, ResolutionMode,
};
use crate::result::WarningKind;

use super::RenderState;

/// A memoized link-hook resolution. `handled: false` records that the hook
/// declined, so it is not asked again for the same link.
#[derive(Debug, Clone)]
pub(crate) struct CachedLink {
    pub(crate) handled: bool,
    pub(crate) href: String,
    pub(crate) title: String,
    pub(crate) text_only: bool,
}

impl RenderState<'_> {
    /// Resolve a link mark through the hook, consulting the cache first.
    /// Returns `None` to keep built-in rendering, `Some(None)` is expressed
    /// as text-only via the outer Option pair below.
    pub(crate) fn resolve_link_mark(
        &mut self,
        mark: &Mark,
        href: &str,
        title: &str,
    ) -> Result<Option<(String, String)>, ConvertError> {
        if self.config.link_hook.is_none() {
            return Ok(Some((href.to_string(), title.to_string())));
        }

        let key = (href.to_string(), title.to_string());
        let cached = match self.link_cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let input = LinkRenderInput {
                    source: LinkSource::Mark,
                    source_path: self.options.source_path.clone(),
                    href: href.to_string(),
                    title: title.to_string(),
                    text: String::new(),
                    meta: link_metadata_from_attrs(mark.attrs.as_ref(), href),
                    attrs: mark.attrs.clone(),
                };
                let resolved = match self.apply_link_render_hook(&mark.kind, input)? {
                    Some(output) => CachedLink {
                        handled: true,
                        href: output.href,
                        title: output.title,
                        text_only: output.text_only,
                    },
                    None => CachedLink {
                        handled: false,
                        href: String::new(),
                        title: String::new(),
                        text_only: false,
                    },
                };
                self.link_cache.insert(key, resolved.clone());
                resolved
            }
        };

        if !cached.handled {
            return Ok(Some((href.to_string(), title.to_string())));
        }
        if cached.text_only {
            return Ok(None);
        }
        Ok(Some((cached.href, cached.title)))
    }

    /// Invoke the link render hook. `Ok(None)` means "not handled, use the
    /// built-in rendering" (no hook, hook declined, or unresolved in
    /// best-effort mode).
    pub(crate) fn apply_link_render_hook(
        &mut self,
        node_type: &str,
        input: LinkRenderInput,
    ) -> Result<Option<LinkRenderOutput>, ConvertError> {
        let hook = match &self.config.link_hook {
            Some(hook) => hook.clone(),
            None => return Ok(None),
        };

        self.check_cancelled()?;
        let href = input.href.clone();
        let result = hook(self.cancel, input);
        self.check_cancelled()?;

        let mut output = match result {
            Ok(output) => output,
            Err(HookError::Unresolved) => {
                if self.config.resolution_mode == ResolutionMode::Strict {
                    return Err(ConvertError::Hook(format!(
                        "unresolved link reference {href:?}"
                    )));
                }
                self.warn(
                    WarningKind::UnresolvedReference,
                    node_type,
                    format!("unresolved link reference {href:?}; using fallback rendering"),
                );
                return Ok(None);
            }
            Err(HookError::Cancelled) => return Err(ConvertError::Cancelled),
            Err(HookError::Failed(msg)) => {
                return Err(ConvertError::Hook(format!("link hook failed: {msg}")));
            }
        };

        if !output.handled {
            return Ok(None);
        }

        if !output.text_only && output.href.trim().is_empty() {
            return Err(ConvertError::Hook(
                "invalid link hook output: handled output requires non-empty href unless textOnly"
                    .to_string(),
            ));
        }

        output.href = output.href.trim().to_string();
        output.title = output.title.trim().to_string();
        Ok(Some(output))
    }

    /// Invoke the media render hook; same handled/unresolved contract.
    pub(crate) fn apply_media_render_hook(
        &mut self,
        node_type: &str,
        input: MediaRenderInput,
    ) -> Result<Option<MediaRenderOutput>, ConvertError> {
        let hook = match &self.config.media_hook {
            Some(hook) => hook.clone(),
            None => return Ok(None),
        };

        self.check_cancelled()?;
        let reference = if input.id.is_empty() {
            input.url.clone()
        } else {
            input.id.clone()
        };
        let result = hook(self.cancel, input);
        self.check_cancelled()?;

        let output = match result {
            Ok(output) => output,
            Err(HookError::Unresolved) => {
                if self.config.resolution_mode == ResolutionMode::Strict {
                    return Err(ConvertError::Hook(format!(
                        "unresolved media reference {reference:?}"
                    )));
                }
                self.warn(
                    WarningKind::UnresolvedReference,
                    node_type,
                    format!("unresolved media reference {reference:?}; using fallback rendering"),
                );
                return Ok(None);
            }
            Err(HookError::Cancelled) => return Err(ConvertError::Cancelled),
            Err(HookError::Failed(msg)) => {
                return Err(ConvertError::Hook(format!("media hook failed: {msg}")));
            }
        };

        if !output.handled {
            return Ok(None);
        }

        if output.markdown.trim().is_empty() {
            return Err(ConvertError::Hook(
                "invalid media hook output: handled output requires non-empty markdown".to_string(),
            ));
        }

        Ok(Some(output))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::cancel::CancelToken;
    use crate::config::Config;
    use crate::error::ConvertError;
    use crate::hooks::{HookError, LinkRenderOutput, MediaRenderOutput, ResolutionMode};
    use crate::result::WarningKind;
    use crate::serializer::{MarkdownSerializer, RenderOptions};

    const LINKED_DOC: &str = r#"{"type":"doc","content":[{"type":"paragraph","content":[
        {"type":"text","text":"a","marks":[{"type":"link","attrs":{"href":"page:1"}}]},
        {"type":"text","text":" and "},
        {"type":"text","text":"b","marks":[{"type":"link","attrs":{"href":"page:1"}}]}
    ]}]}"#;

    #[test]
    fn link_hook_rewrites_and_is_cached_per_identity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = Config {
            link_hook: Some(Arc::new(move |_cancel, input| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(LinkRenderOutput {
                    href: format!("https://wiki.example/{}", input.href.trim_start_matches("page:")),
                    title: String::new(),
                    text_only: false,
                    handled: true,
                })
            })),
            ..Config::default()
        };

        let result = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(LINKED_DOC.as_bytes())
            .unwrap();
        assert_eq!(
            result.markdown,
            "[a](https://wiki.example/1) and [b](https://wiki.example/1)\n"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn text_only_strips_the_link() {
        let config = Config {
            link_hook: Some(Arc::new(|_cancel, _input| {
                Ok(LinkRenderOutput {
                    text_only: true,
                    handled: true,
                    ..LinkRenderOutput::default()
                })
            })),
            ..Config::default()
        };
        let result = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(LINKED_DOC.as_bytes())
            .unwrap();
        assert_eq!(result.markdown, "a and b\n");
    }

    #[test]
    fn unresolved_is_a_warning_in_best_effort_mode() {
        let config = Config {
            link_hook: Some(Arc::new(|_cancel, _input| Err(HookError::Unresolved))),
            ..Config::default()
        };
        let result = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(LINKED_DOC.as_bytes())
            .unwrap();
        assert_eq!(result.markdown, "[a](page:1) and [b](page:1)\n");
        assert!(result
            .warnings
            .iter()
            .all(|warning| warning.kind == WarningKind::UnresolvedReference));
    }

    #[test]
    fn unresolved_fails_in_strict_mode() {
        let config = Config {
            link_hook: Some(Arc::new(|_cancel, _input| Err(HookError::Unresolved))),
            resolution_mode: ResolutionMode::Strict,
            ..Config::default()
        };
        let err = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(LINKED_DOC.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Hook(_)));
    }

    #[test]
    fn hook_cancelling_its_token_aborts_the_conversion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = Config {
            link_hook: Some(Arc::new(move |cancel: &CancelToken, _input| {
                counter.fetch_add(1, Ordering::SeqCst);
                cancel.cancel();
                Err(HookError::Cancelled)
            })),
            ..Config::default()
        };
        let serializer = MarkdownSerializer::new(config).unwrap();
        let err = serializer
            .serialize_with(
                LINKED_DOC.as_bytes(),
                &CancelToken::new(),
                RenderOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err, ConvertError::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn media_hook_overrides_output() {
        let config = Config {
            media_hook: Some(Arc::new(|_cancel, input| {
                Ok(MediaRenderOutput {
                    markdown: format!("![attachment]({})", input.id),
                    handled: true,
                })
            })),
            ..Config::default()
        };
        let result = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(
                br#"{"type":"doc","content":[{"type":"mediaSingle","content":[{"type":"media","attrs":{"type":"image","id":"img-9"}}]}]}"#,
            )
            .unwrap();
        assert_eq!(result.markdown, "![attachment](img-9)\n");
    }

    #[test]
    fn handled_link_output_requires_href() {
        let config = Config {
            link_hook: Some(Arc::new(|_cancel, _input| {
                Ok(LinkRenderOutput {
                    handled: true,
                    ..LinkRenderOutput::default()
                })
            })),
            ..Config::default()
        };
        let err = MarkdownSerializer::new(config)
            .unwrap()
            .serialize(LINKED_DOC.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Hook(_)));
    }
}
