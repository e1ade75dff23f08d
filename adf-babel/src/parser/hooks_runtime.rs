//! Applying parse hooks: unresolved-reference policy and output
//! validation for the reverse direction.

use crate::error::ConvertError;
use crate::hooks::{
    HookError, LinkParseInput, LinkParseOutput, MediaParseInput, MediaParseOutput, ResolutionMode,
};
use crate::result::WarningKind;

use super::ParseState;

impl ParseState<'_> {
    /// Invoke the link parse hook. `Ok(None)` means "not handled, use the
    /// built-in parsing".
    pub(crate) fn apply_link_parse_hook(
        &mut self,
        input: LinkParseInput,
    ) -> Result<Option<LinkParseOutput>, ConvertError> {
        let hook = match &self.config.link_hook {
            Some(hook) => hook.clone(),
            None => return Ok(None),
        };

        self.check_cancelled()?;
        let destination = input.destination.clone();
        let result = hook(self.cancel, input);
        self.check_cancelled()?;

        let mut output = match result {
            Ok(output) => output,
            Err(HookError::Unresolved) => {
                if self.config.resolution_mode == ResolutionMode::Strict {
                    return Err(ConvertError::Hook(format!(
                        "unresolved link destination {destination:?}"
                    )));
                }
                self.warn(
                    WarningKind::UnresolvedReference,
                    "link",
                    format!("unresolved link destination {destination:?}; using fallback parsing"),
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

        output.destination = output.destination.trim().to_string();
        output.title = output.title.trim().to_string();

        if output.force_link && output.force_card {
            return Err(ConvertError::Hook(
                "invalid link hook output: forceLink and forceCard are mutually exclusive"
                    .to_string(),
            ));
        }
        if output.destination.is_empty() {
            return Err(ConvertError::Hook(
                "invalid link hook output: handled output requires non-empty destination"
                    .to_string(),
            ));
        }

        Ok(Some(output))
    }

    /// Invoke the media parse hook; same handled/unresolved contract.
    pub(crate) fn apply_media_parse_hook(
        &mut self,
        input: MediaParseInput,
    ) -> Result<Option<MediaParseOutput>, ConvertError> {
        let hook = match &self.config.media_hook {
            Some(hook) => hook.clone(),
            None => return Ok(None),
        };

        self.check_cancelled()?;
        let destination = input.destination.clone();
        let result = hook(self.cancel, input);
        self.check_cancelled()?;

        let mut output = match result {
            Ok(output) => output,
            Err(HookError::Unresolved) => {
                if self.config.resolution_mode == ResolutionMode::Strict {
                    return Err(ConvertError::Hook(format!(
                        "unresolved media destination {destination:?}"
                    )));
                }
                self.warn(
                    WarningKind::UnresolvedReference,
                    "image",
                    format!(
                        "unresolved media destination {destination:?}; using fallback parsing"
                    ),
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

        output.media_type = output.media_type.trim().to_lowercase();
        output.id = output.id.trim().to_string();
        output.url = output.url.trim().to_string();
        output.alt = output.alt.trim().to_string();

        if output.media_type != "image" && output.media_type != "file" {
            return Err(ConvertError::Hook(format!(
                "invalid media hook output: unsupported mediaType {:?}",
                output.media_type
            )));
        }
        match (output.id.is_empty(), output.url.is_empty()) {
            (true, true) => {
                return Err(ConvertError::Hook(
                    "invalid media hook output: handled output requires id or url".to_string(),
                ));
            }
            (false, false) => {
                return Err(ConvertError::Hook(
                    "invalid media hook output: id and url are mutually exclusive".to_string(),
                ));
            }
            _ => {}
        }

        Ok(Some(output))
    }
}
