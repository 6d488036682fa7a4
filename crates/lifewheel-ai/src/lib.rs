//! AI layer: classification, translation, score updates and analysis.
//!
//! Each service wraps an optional remote [`AiBackend`], bounds every call
//! with a timeout and degrades to a deterministic local heuristic. None of
//! them return errors; fallbacks are reported through [`Source`] and a
//! warning [`lifewheel_core::Notice`].

pub mod analysis;
pub mod backend;
pub mod classifier;
pub mod decode;
pub mod keywords;
pub mod openai;
pub mod scoring;
pub mod translator;

#[cfg(test)]
mod fake;

use std::sync::Arc;
use std::time::Duration;

pub use analysis::{Analysis, Analyzer};
pub use backend::{AiBackend, AiError, FeedbackInput, RawScores};
pub use classifier::{Classification, Classifier};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use scoring::{ScoreUpdate, ScoreUpdater};
pub use translator::{Translation, Translator, needs_translation};

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The remote backend answered.
    Remote,
    /// The local heuristic answered after the remote path failed or was absent.
    Fallback,
    /// No work was needed.
    Skipped,
}

/// Per-capability timeouts.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub classify_timeout: Duration,
    pub translate_timeout: Duration,
    pub update_timeout: Duration,
    pub analysis_timeout: Duration,
}

impl AiConfig {
    /// Same timeout for every capability except analysis, which keeps its
    /// longer default unless `timeout` exceeds it.
    pub fn with_timeout(timeout: Duration) -> Self {
        let defaults = Self::default();
        Self {
            classify_timeout: timeout,
            translate_timeout: timeout,
            update_timeout: timeout,
            analysis_timeout: defaults.analysis_timeout.max(timeout),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            classify_timeout: Duration::from_secs(8),
            translate_timeout: Duration::from_secs(8),
            update_timeout: Duration::from_secs(8),
            analysis_timeout: Duration::from_secs(15),
        }
    }
}

/// The four AI services sharing one backend.
pub struct WheelAi {
    pub classifier: Classifier,
    pub translator: Translator,
    pub scorer: ScoreUpdater,
    pub analyzer: Analyzer,
    backend_name: Option<String>,
}

impl WheelAi {
    pub fn new(backend: Option<Arc<dyn AiBackend>>, config: &AiConfig) -> Self {
        Self {
            backend_name: backend.as_ref().map(|b| b.name().to_string()),
            classifier: Classifier::new(backend.clone(), config.classify_timeout),
            translator: Translator::new(backend.clone(), config.translate_timeout),
            scorer: ScoreUpdater::new(backend.clone(), config.update_timeout),
            analyzer: Analyzer::new(backend, config.analysis_timeout),
        }
    }

    /// Every capability served by its local fallback.
    pub fn offline() -> Self {
        Self::new(None, &AiConfig::default())
    }

    pub fn is_online(&self) -> bool {
        self.backend_name.is_some()
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend_name.as_deref()
    }
}
