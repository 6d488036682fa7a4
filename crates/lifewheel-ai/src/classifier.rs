//! Feedback text → relevant wheel categories.
//!
//! The remote model is asked for a JSON array of category labels. Anything
//! outside the enumeration is dropped. When the remote path fails for any
//! reason the keyword table in [`crate::keywords`] takes over.

use std::sync::Arc;
use std::time::Duration;

use lifewheel_core::{Category, Notice, retain_known};
use tracing::{debug, warn};

use crate::Source;
use crate::backend::{AiBackend, AiError, bounded};
use crate::keywords;

/// Categories detected in a piece of feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Subset of the enumeration, deduplicated, in canonical order.
    pub categories: Vec<Category>,
    pub source: Source,
    pub notice: Option<Notice>,
}

pub struct Classifier {
    backend: Option<Arc<dyn AiBackend>>,
    timeout: Duration,
}

impl Classifier {
    pub fn new(backend: Option<Arc<dyn AiBackend>>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Classify `text`. Never fails; see [`Classification::source`].
    ///
    /// An empty remote answer is accepted as-is. Only a failed remote call
    /// falls back to keyword matching.
    pub async fn classify(&self, text: &str) -> Classification {
        match self.remote(text).await {
            Ok(categories) => Classification {
                categories,
                source: Source::Remote,
                notice: None,
            },
            Err(e) => {
                warn!(error = %e, "classification failed, using keyword matching");
                Classification {
                    categories: keywords::classify_offline(text),
                    source: Source::Fallback,
                    notice: Some(Notice::warning(
                        "AI categorisation unavailable, categories were detected by keyword matching",
                    )),
                }
            }
        }
    }

    async fn remote(&self, text: &str) -> Result<Vec<Category>, AiError> {
        let backend = self.backend.as_ref().ok_or(AiError::NotConfigured)?;
        let labels = bounded(self.timeout, backend.classify(text)).await?;
        let categories = retain_known(&labels);
        if categories.len() < labels.len() {
            debug!(
                backend = backend.name(),
                returned = ?labels,
                kept = categories.len(),
                "dropped labels outside the category list"
            );
        }
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBackend;

    fn classifier(fake: FakeBackend) -> (Classifier, Arc<FakeBackend>) {
        let fake = Arc::new(fake);
        let backend: Arc<dyn AiBackend> = fake.clone();
        (
            Classifier::new(Some(backend), Duration::from_millis(200)),
            fake,
        )
    }

    #[tokio::test]
    async fn remote_labels_are_filtered_and_ordered() {
        let (c, fake) = classifier(FakeBackend::with_labels(&[
            "Mental Health",
            "Hobbies",
            "career",
            "Career",
        ]));
        let out = c.classify("Work has been stressful").await;
        assert_eq!(out.source, Source::Remote);
        assert_eq!(out.categories, vec![Category::Career, Category::MentalHealth]);
        assert!(out.notice.is_none());
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn empty_remote_answer_is_not_a_failure() {
        let (c, _) = classifier(FakeBackend::with_labels(&[]));
        let out = c.classify("The weather is nice").await;
        assert_eq!(out.source, Source::Remote);
        assert!(out.categories.is_empty());
    }

    #[tokio::test]
    async fn failure_falls_back_to_keywords() {
        let (c, _) = classifier(FakeBackend::failing());
        let out = c.classify("My job is going great").await;
        assert_eq!(out.source, Source::Fallback);
        assert!(out.categories.contains(&Category::Career));
        assert!(out.notice.is_some());
    }

    #[tokio::test]
    async fn offline_uses_default_when_nothing_matches() {
        let c = Classifier::new(None, Duration::from_secs(1));
        let out = c.classify("Nice hat").await;
        assert_eq!(out.source, Source::Fallback);
        assert_eq!(out.categories, keywords::DEFAULT_CATEGORIES.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out_into_fallback() {
        let (c, _) = classifier(
            FakeBackend::with_labels(&["Finance"]).with_delay(Duration::from_secs(30)),
        );
        let out = c.classify("Saving money every month").await;
        assert_eq!(out.source, Source::Fallback);
        assert_eq!(out.categories, vec![Category::Finance]);
    }
}
