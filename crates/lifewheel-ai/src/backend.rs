//! The remote AI capability and the error type every remote call reports.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use lifewheel_core::{Category, WheelScores};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no AI backend configured")]
    NotConfigured,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Feedback as handed to the score-update capability.
///
/// `from` is the sender's display name, used in the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackInput {
    pub from: String,
    pub text: String,
    pub categories: Vec<Category>,
}

/// Untrusted category → score mapping returned by a remote update call.
///
/// Values are neither clamped nor checked for finiteness, and keys are not
/// yet checked against the enumeration; see [`crate::scoring::merge_scores`].
pub type RawScores = BTreeMap<String, f64>;

/// A remote language-model capability.
///
/// Implementations return raw, unvalidated results. Callers in this crate
/// restrict labels to the enumeration, drop non-finite scores and clamp the
/// rest. Every call is bounded by a timeout and falls back to a local
/// heuristic on any error.
#[async_trait]
pub trait AiBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Category labels the text relates to.
    async fn classify(&self, text: &str) -> Result<Vec<String>, AiError>;

    /// English rendering of `text`.
    async fn translate(&self, text: &str) -> Result<String, AiError>;

    /// Updated absolute scores for (at least) the affected categories.
    async fn update_scores(
        &self,
        baseline: &WheelScores,
        feedback: &FeedbackInput,
    ) -> Result<RawScores, AiError>;

    /// Narrative analysis of a wheel.
    async fn analyze(&self, scores: &WheelScores, username: &str) -> Result<String, AiError>;
}

/// Race `call` against `limit`; expiry is reported as [`AiError::Timeout`].
///
/// The losing future is dropped, not cancelled remotely.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, AiError>
where
    F: Future<Output = Result<T, AiError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AiError::Timeout(limit))?
}
