//! Translation of non-English feedback into English.

use std::sync::Arc;
use std::time::Duration;

use lifewheel_core::Notice;
use tracing::{debug, warn};

use crate::Source;
use crate::backend::{AiBackend, AiError, bounded};

/// Punctuation allowed in text that is assumed to already be English.
const PLAIN_PUNCTUATION: &str = ".,!?'\";:-()";

/// True when `text` contains anything beyond ASCII letters, digits,
/// whitespace and basic punctuation.
///
/// This is a character whitelist, not language detection: accented English
/// is sent for translation and ASCII French is not.
pub fn needs_translation(text: &str) -> bool {
    !text.chars().all(|c| {
        c.is_ascii_alphanumeric() || c.is_whitespace() || PLAIN_PUNCTUATION.contains(c)
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub source: Source,
    pub notice: Option<Notice>,
}

pub struct Translator {
    backend: Option<Arc<dyn AiBackend>>,
    timeout: Duration,
}

impl Translator {
    pub fn new(backend: Option<Arc<dyn AiBackend>>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// English rendering of `text`, or `text` itself when no translation is
    /// needed or the remote call fails.
    pub async fn translate(&self, text: &str) -> Translation {
        if !needs_translation(text) {
            return Translation {
                text: text.to_string(),
                source: Source::Skipped,
                notice: None,
            };
        }
        match self.remote(text).await {
            Ok(translated) => {
                debug!(chars = translated.len(), "translated feedback");
                Translation {
                    text: translated,
                    source: Source::Remote,
                    notice: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "translation failed, keeping original text");
                Translation {
                    text: text.to_string(),
                    source: Source::Fallback,
                    notice: Some(Notice::warning(
                        "Translation service unavailable, using original text",
                    )),
                }
            }
        }
    }

    async fn remote(&self, text: &str) -> Result<String, AiError> {
        let backend = self.backend.as_ref().ok_or(AiError::NotConfigured)?;
        let translated = bounded(self.timeout, backend.translate(text)).await?;
        let translated = translated.trim();
        if translated.is_empty() {
            return Err(AiError::Decode("empty translation".into()));
        }
        Ok(translated.to_string())
    }
}
