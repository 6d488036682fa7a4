//! Scripted [`AiBackend`] for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lifewheel_core::WheelScores;

use crate::backend::{AiBackend, AiError, FeedbackInput, RawScores};

/// Answers every capability from its script; `None` means "fail".
#[derive(Default)]
pub struct FakeBackend {
    pub labels: Option<Vec<String>>,
    pub translation: Option<String>,
    pub scores: Option<RawScores>,
    pub analysis: Option<String>,
    pub delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            labels: Some(labels.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_translation(text: &str) -> Self {
        Self {
            translation: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn with_scores(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: Some(scores.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
            ..Self::default()
        }
    }

    pub fn with_analysis(text: &str) -> Self {
        Self {
            analysis: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T: Clone>(&self, scripted: &Option<T>) -> Result<T, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        scripted.clone().ok_or(AiError::Api {
            status: 500,
            message: "scripted failure".into(),
        })
    }
}

#[async_trait]
impl AiBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<String>, AiError> {
        self.answer(&self.labels).await
    }

    async fn translate(&self, _text: &str) -> Result<String, AiError> {
        self.answer(&self.translation).await
    }

    async fn update_scores(
        &self,
        _baseline: &WheelScores,
        _feedback: &FeedbackInput,
    ) -> Result<RawScores, AiError> {
        self.answer(&self.scores).await
    }

    async fn analyze(&self, _scores: &WheelScores, _username: &str) -> Result<String, AiError> {
        self.answer(&self.analysis).await
    }
}
