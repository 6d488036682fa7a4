//! Feedback-driven score updates.
//!
//! The remote model proposes absolute scores for the affected categories;
//! [`merge_scores`] folds them into the baseline. Without a usable answer a
//! sentiment heuristic nudges each affected category instead.

use std::sync::Arc;
use std::time::Duration;

use lifewheel_core::{Category, Notice, WheelScores};
use tracing::{debug, warn};

use crate::Source;
use crate::backend::{AiBackend, AiError, FeedbackInput, RawScores, bounded};
use crate::keywords::{Sentiment, sentiment};

pub const POSITIVE_ADJUSTMENT: f64 = 0.8;
pub const NEGATIVE_ADJUSTMENT: f64 = -0.5;
pub const NEUTRAL_ADJUSTMENT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreUpdate {
    pub scores: WheelScores,
    pub source: Source,
    pub notice: Option<Notice>,
}

/// Overlay untrusted remote scores onto `baseline`.
///
/// Every returned key naming a known category replaces the baseline value,
/// clamped into range. Unknown keys and non-finite values are ignored, and
/// categories without a usable answer keep their baseline value.
pub fn merge_scores(baseline: &WheelScores, returned: &RawScores) -> WheelScores {
    let mut merged = baseline.clone();
    for (label, &value) in returned {
        match Category::from_label(label) {
            Some(category) if value.is_finite() => merged.set(category, value),
            Some(_) => debug!(label = %label, value, "ignoring non-finite score"),
            None => debug!(label = %label, "ignoring score for unknown category"),
        }
    }
    merged
}

/// Score delta implied by the wording of `text`.
pub fn sentiment_adjustment(text: &str) -> f64 {
    match sentiment(text) {
        Sentiment::Negative => NEGATIVE_ADJUSTMENT,
        Sentiment::Positive => POSITIVE_ADJUSTMENT,
        Sentiment::Neutral => NEUTRAL_ADJUSTMENT,
    }
}

/// Apply [`sentiment_adjustment`] to every affected category the baseline
/// defines.
pub fn fallback_update(baseline: &WheelScores, feedback: &FeedbackInput) -> WheelScores {
    let delta = sentiment_adjustment(&feedback.text);
    let mut updated = baseline.clone();
    for &category in &feedback.categories {
        if let Some(current) = baseline.get(category) {
            updated.set(category, current + delta);
        }
    }
    updated
}

pub struct ScoreUpdater {
    backend: Option<Arc<dyn AiBackend>>,
    timeout: Duration,
}

impl ScoreUpdater {
    pub fn new(backend: Option<Arc<dyn AiBackend>>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// New scores for `baseline` after `feedback`.
    ///
    /// With no affected categories the baseline is returned untouched and
    /// the backend is not called.
    pub async fn update(&self, baseline: &WheelScores, feedback: &FeedbackInput) -> ScoreUpdate {
        if feedback.categories.is_empty() {
            return ScoreUpdate {
                scores: baseline.clone(),
                source: Source::Skipped,
                notice: None,
            };
        }
        match self.remote(baseline, feedback).await {
            Ok(returned) => ScoreUpdate {
                scores: merge_scores(baseline, &returned),
                source: Source::Remote,
                notice: None,
            },
            Err(e) => {
                warn!(error = %e, categories = ?feedback.categories, "score update failed, using sentiment heuristic");
                ScoreUpdate {
                    scores: fallback_update(baseline, feedback),
                    source: Source::Fallback,
                    notice: Some(Notice::warning(
                        "AI scoring unavailable, scores were adjusted with a simple heuristic",
                    )),
                }
            }
        }
    }

    async fn remote(
        &self,
        baseline: &WheelScores,
        feedback: &FeedbackInput,
    ) -> Result<RawScores, AiError> {
        let backend = self.backend.as_ref().ok_or(AiError::NotConfigured)?;
        let returned = bounded(self.timeout, backend.update_scores(baseline, feedback)).await?;
        debug!(backend = backend.name(), returned = ?returned, "remote score update");
        Ok(returned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBackend;
    use lifewheel_core::{MAX_SCORE, MIN_SCORE};

    fn input(text: &str, categories: &[Category]) -> FeedbackInput {
        FeedbackInput {
            from: "Joe".into(),
            text: text.into(),
            categories: categories.to_vec(),
        }
    }

    fn updater(fake: FakeBackend) -> (ScoreUpdater, Arc<FakeBackend>) {
        let fake = Arc::new(fake);
        let backend: Arc<dyn AiBackend> = fake.clone();
        (ScoreUpdater::new(Some(backend), Duration::from_millis(200)), fake)
    }

    fn in_range(scores: &WheelScores) -> bool {
        scores.iter().all(|(_, v)| (MIN_SCORE..=MAX_SCORE).contains(&v))
    }

    #[tokio::test]
    async fn no_categories_is_identity_without_a_call() {
        let baseline = WheelScores::neutral();
        let (u, fake) = updater(FakeBackend::with_scores(&[("Career", 9.0)]));
        let out = u.update(&baseline, &input("terrible", &[])).await;
        assert_eq!(out.scores, baseline);
        assert_eq!(out.source, Source::Skipped);
        assert_eq!(fake.calls(), 0);

        let offline = ScoreUpdater::new(None, Duration::from_secs(1));
        assert_eq!(offline.update(&baseline, &input("great", &[])).await.scores, baseline);
    }

    #[tokio::test]
    async fn negative_fallback_lowers_only_affected() {
        let baseline = WheelScores::neutral();
        let (u, _) = updater(FakeBackend::failing());
        let out = u
            .update(&baseline, &input("That was terrible", &[Category::Career]))
            .await;
        assert_eq!(out.source, Source::Fallback);
        assert!(out.notice.is_some());
        assert_eq!(out.scores.get(Category::Career), Some(4.5));
        for c in Category::ALL.iter().filter(|&&c| c != Category::Career) {
            assert_eq!(out.scores.get(*c), Some(5.0));
        }
    }

    #[test]
    fn fallback_adjustments() {
        let baseline = WheelScores::neutral();
        let up = fallback_update(&baseline, &input("Great progress", &[Category::Finance]));
        assert!((up.get(Category::Finance).unwrap() - 5.8).abs() < 1e-9);
        let plain = fallback_update(&baseline, &input("Keep going", &[Category::Finance]));
        assert_eq!(plain.get(Category::Finance), Some(5.5));
    }

    #[test]
    fn fallback_skips_undefined_categories() {
        let baseline: WheelScores = [(Category::Career, 5.0)].into_iter().collect();
        let out = fallback_update(&baseline, &input("bad", &[Category::Career, Category::Finance]));
        assert_eq!(out.get(Category::Career), Some(4.5));
        assert_eq!(out.get(Category::Finance), None);
    }

    #[test]
    fn fallback_clamps_at_the_edges() {
        let baseline: WheelScores = [(Category::Career, 10.0), (Category::Finance, 1.0)]
            .into_iter()
            .collect();
        let up = fallback_update(&baseline, &input("amazing", &[Category::Career]));
        assert_eq!(up.get(Category::Career), Some(MAX_SCORE));
        let down = fallback_update(&baseline, &input("awful", &[Category::Finance]));
        assert_eq!(down.get(Category::Finance), Some(MIN_SCORE));
    }

    #[tokio::test]
    async fn remote_scores_are_merged_and_clamped() {
        let baseline = WheelScores::neutral();
        let (u, _) = updater(FakeBackend::with_scores(&[
            ("Career", 6.5),
            ("Finance", 42.0),
            ("Hobbies", 9.0),
        ]));
        let out = u
            .update(&baseline, &input("Great raise", &[Category::Career, Category::Finance]))
            .await;
        assert_eq!(out.source, Source::Remote);
        assert_eq!(out.scores.get(Category::Career), Some(6.5));
        assert_eq!(out.scores.get(Category::Finance), Some(MAX_SCORE));
        assert_eq!(out.scores.get(Category::MentalHealth), Some(5.0));
        assert_eq!(out.scores.len(), 6);
        assert!(in_range(&out.scores));
    }

    #[test]
    fn merge_keeps_baseline_for_non_finite_values() {
        let baseline = WheelScores::neutral();
        let returned: RawScores = [
            ("Career".to_string(), f64::NAN),
            ("Finance".to_string(), f64::INFINITY),
            ("Mental Health".to_string(), 7.0),
        ]
        .into_iter()
        .collect();
        let merged = merge_scores(&baseline, &returned);
        assert_eq!(merged.get(Category::Career), Some(5.0));
        assert_eq!(merged.get(Category::Finance), Some(5.0));
        assert_eq!(merged.get(Category::MentalHealth), Some(7.0));
        assert!(in_range(&merged));
    }

    #[tokio::test]
    async fn nan_from_backend_never_reaches_the_wheel() {
        let baseline = WheelScores::neutral();
        let (u, _) = updater(FakeBackend::with_scores(&[("Career", f64::NAN)]));
        let out = u
            .update(&baseline, &input("Great raise", &[Category::Career]))
            .await;
        assert_eq!(out.source, Source::Remote);
        assert_eq!(out.scores.get(Category::Career), Some(5.0));
        assert_eq!(out.scores.len(), 6);
        assert!(in_range(&out.scores));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_triggers_fallback() {
        let baseline = WheelScores::neutral();
        let (u, _) = updater(
            FakeBackend::with_scores(&[("Career", 9.0)]).with_delay(Duration::from_secs(60)),
        );
        let out = u
            .update(&baseline, &input("terrible week", &[Category::Career]))
            .await;
        assert_eq!(out.source, Source::Fallback);
        assert_eq!(out.scores.get(Category::Career), Some(4.5));
    }
}
