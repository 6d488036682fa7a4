//! Narrative analysis of a user's wheel.

use std::sync::Arc;
use std::time::Duration;

use lifewheel_core::{Notice, WheelScores, format_score};
use tracing::warn;

use crate::Source;
use crate::backend::{AiBackend, AiError, bounded};

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub text: String,
    pub source: Source,
    pub notice: Option<Notice>,
}

/// Wording for the gap between the highest and lowest score.
pub fn balance_assessment(spread: f64) -> &'static str {
    if spread <= 2.0 {
        "good"
    } else if spread <= 4.0 {
        "moderate"
    } else {
        "significant imbalance in"
    }
}

/// Offline analysis naming the strongest and weakest areas.
///
/// Returns `None` for an empty wheel.
pub fn template_analysis(scores: &WheelScores, username: &str) -> Option<String> {
    let (high, high_score) = scores.highest()?;
    let (low, low_score) = scores.lowest()?;
    let balance = balance_assessment(high_score - low_score);
    Some(format!(
        "Here's a simple analysis of {username}'s Wheel of Life:\n\n\
         Your strongest area is {high} with a score of {}/10. \
         This shows good development and focus in this area.\n\n\
         Your area with the most room for improvement is {low} with a score of {}/10. \
         Consider dedicating some time to develop this aspect of your life.\n\n\
         Overall, your wheel shows a {balance} balance across life categories. \
         Continue to work on maintaining or improving this balance.",
        format_score(high_score),
        format_score(low_score),
    ))
}

pub struct Analyzer {
    backend: Option<Arc<dyn AiBackend>>,
    timeout: Duration,
}

impl Analyzer {
    pub fn new(backend: Option<Arc<dyn AiBackend>>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn analyze(&self, scores: &WheelScores, username: &str) -> Analysis {
        let Some(template) = template_analysis(scores, username) else {
            return Analysis {
                text: format!("{username} has no wheel scores to analyse yet."),
                source: Source::Skipped,
                notice: None,
            };
        };
        match self.remote(scores, username).await {
            Ok(text) => Analysis {
                text,
                source: Source::Remote,
                notice: None,
            },
            Err(e) => {
                warn!(error = %e, user = %username, "analysis failed, using template");
                Analysis {
                    text: template,
                    source: Source::Fallback,
                    notice: Some(Notice::warning(
                        "Analysis service unavailable, using simple analysis template",
                    )),
                }
            }
        }
    }

    async fn remote(&self, scores: &WheelScores, username: &str) -> Result<String, AiError> {
        let backend = self.backend.as_ref().ok_or(AiError::NotConfigured)?;
        let text = bounded(self.timeout, backend.analyze(scores, username)).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AiError::Decode("empty analysis".into()));
        }
        Ok(text.to_string())
    }
}
