//! The feedback submission workflow.
//!
//! ```text
//! Idle → Validating → [Translating] → Classifying → FetchingBaseline
//!      → Updating → Persisting → Refreshing → Idle
//!                                           ↘ Failed → Idle
//! ```

use std::fmt;
use std::sync::atomic::Ordering;

use chrono::NaiveDate;
use lifewheel_ai::{FeedbackInput, needs_translation};
use lifewheel_core::{BaselineOrigin, FeedbackRecord, Notice, NoticeLevel, ScoreSnapshot, User};
use lifewheel_store::StoreError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Translating,
    Classifying,
    FetchingBaseline,
    Updating,
    Persisting,
    Refreshing,
    Failed,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Translating => "translating",
            Self::Classifying => "classifying",
            Self::FetchingBaseline => "fetching baseline",
            Self::Updating => "updating",
            Self::Persisting => "persisting",
            Self::Refreshing => "refreshing",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Feedback as entered by the logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackDraft {
    pub recipient_id: String,
    pub text: String,
    pub date: Option<NaiveDate>,
}

impl FeedbackDraft {
    pub fn new(recipient_id: impl Into<String>, text: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            text: text.into(),
            date: Some(date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("you must be logged in to submit feedback")]
    NotLoggedIn,
    #[error("please select who the feedback is for")]
    MissingRecipient,
    #[error("you cannot give feedback to yourself")]
    SelfFeedback,
    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),
    #[error("feedback text cannot be empty")]
    EmptyText,
    #[error("please select a date")]
    MissingDate,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a feedback submission is already in progress")]
    AlreadySubmitting,

    #[error("the database is not ready: {0}")]
    NotReady(#[source] StoreError),

    #[error("could not load the recipient's scores: {0}")]
    Baseline(#[source] StoreError),

    #[error(
        "failed to save feedback (snapshot saved: {snapshot_saved}, feedback saved: {feedback_saved}): {source}"
    )]
    Persist {
        snapshot_saved: bool,
        feedback_saved: bool,
        #[source]
        source: StoreError,
    },
}

impl SubmitError {
    /// The message to show the user.
    pub fn notice(&self) -> Notice {
        Notice::error(self.to_string())
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub feedback: FeedbackRecord,
    pub snapshot: ScoreSnapshot,
    pub baseline_origin: BaselineOrigin,
    /// Fallbacks and warnings raised along the way, then the success notice.
    pub notices: Vec<Notice>,
    /// States visited, in order, ending with [`SubmissionState::Idle`].
    pub states: Vec<SubmissionState>,
}

/// Holds the per-session submitting flag; dropping it releases the flag and
/// returns the session to idle.
struct InFlight<'a> {
    session: &'a Session,
    visited: Vec<SubmissionState>,
}

impl<'a> InFlight<'a> {
    fn acquire(session: &'a Session) -> Result<Self, SubmitError> {
        session
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SubmitError::AlreadySubmitting)?;
        Ok(Self {
            session,
            visited: Vec::new(),
        })
    }

    fn enter(&mut self, state: SubmissionState) {
        debug!(%state, "submission state");
        if let Ok(mut phase) = self.session.phase.lock() {
            *phase = state;
        }
        self.visited.push(state);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut phase) = self.session.phase.lock() {
            *phase = SubmissionState::Idle;
        }
        self.session.submitting.store(false, Ordering::Release);
    }
}

/// Checked inputs for one submission.
struct Validated {
    sender: User,
    recipient: User,
    text: String,
    date: NaiveDate,
}

impl Session {
    /// Submit feedback from the logged-in user.
    ///
    /// AI failures never fail a submission; they fall back and add a warning
    /// notice to the report. Validation and store errors fail it. Both
    /// persistence writes are always attempted and nothing is rolled back.
    pub async fn submit_feedback(&self, draft: FeedbackDraft) -> Result<SubmissionReport, SubmitError> {
        let mut flight = InFlight::acquire(self)?;
        let result = self.run_submission(&mut flight, draft).await;
        if let Err(e) = &result {
            flight.enter(SubmissionState::Failed);
            warn!(error = %e, "feedback submission failed");
        }
        result
    }

    async fn run_submission(
        &self,
        flight: &mut InFlight<'_>,
        draft: FeedbackDraft,
    ) -> Result<SubmissionReport, SubmitError> {
        let mut notices = Vec::new();

        flight.enter(SubmissionState::Validating);
        let Validated {
            sender,
            recipient,
            text,
            date,
        } = self.validate(draft).await?;
        self.store.check_setup().await.map_err(SubmitError::NotReady)?;

        let text = if needs_translation(&text) {
            flight.enter(SubmissionState::Translating);
            let translation = self.ai.translator.translate(&text).await;
            notices.extend(translation.notice);
            translation.text
        } else {
            text
        };

        flight.enter(SubmissionState::Classifying);
        let classification = self.ai.classifier.classify(&text).await;
        notices.extend(classification.notice);
        let categories = classification.categories;
        if categories.is_empty() {
            notices.push(Notice::warning("No wheel of life categories were detected"));
        }

        flight.enter(SubmissionState::FetchingBaseline);
        let baseline = self
            .store
            .wheel_history(&recipient.id)
            .await
            .map_err(SubmitError::Baseline)?
            .resolve(date);
        debug!(recipient = %recipient.id, %date, origin = ?baseline.origin, "resolved baseline");

        flight.enter(SubmissionState::Updating);
        let input = FeedbackInput {
            from: sender.username.clone(),
            text: text.clone(),
            categories: categories.clone(),
        };
        let update = self.ai.scorer.update(&baseline.scores, &input).await;
        notices.extend(update.notice);

        flight.enter(SubmissionState::Persisting);
        let snapshot = ScoreSnapshot::new(recipient.id.clone(), date, update.scores);
        let feedback = FeedbackRecord::new(
            sender.id.clone(),
            recipient.id.clone(),
            text,
            date,
            categories,
        );
        let saved = self.store.save_snapshot(&snapshot).await;
        let inserted = self.store.insert_feedback(&feedback).await;
        match (saved, inserted) {
            (Ok(()), Ok(())) => {}
            (Err(source), Ok(())) => {
                return Err(SubmitError::Persist {
                    snapshot_saved: false,
                    feedback_saved: true,
                    source,
                });
            }
            (Ok(()), Err(source)) => {
                return Err(SubmitError::Persist {
                    snapshot_saved: true,
                    feedback_saved: false,
                    source,
                });
            }
            (Err(source), Err(other)) => {
                warn!(error = %other, "feedback insert also failed");
                return Err(SubmitError::Persist {
                    snapshot_saved: false,
                    feedback_saved: false,
                    source,
                });
            }
        }

        flight.enter(SubmissionState::Refreshing);
        tokio::join!(
            self.refresh_user(&recipient.id),
            self.refresh_user(&sender.id)
        );

        flight.enter(SubmissionState::Idle);
        notices.push(Notice::success("Feedback submitted successfully"));
        info!(
            id = %feedback.id,
            from = %sender.id,
            to = %recipient.id,
            categories = feedback.categories.len(),
            scoring = ?update.source,
            "feedback submitted"
        );
        Ok(SubmissionReport {
            feedback,
            snapshot,
            baseline_origin: baseline.origin,
            notices,
            states: flight.visited.clone(),
        })
    }

    async fn validate(&self, draft: FeedbackDraft) -> Result<Validated, ValidationError> {
        let state = self.state.read().await;
        let sender = state
            .current
            .as_ref()
            .and_then(|id| state.views.get(id))
            .map(|v| v.user.clone())
            .ok_or(ValidationError::NotLoggedIn)?;

        let recipient_id = draft.recipient_id.trim();
        if recipient_id.is_empty() {
            return Err(ValidationError::MissingRecipient);
        }
        if recipient_id == sender.id {
            return Err(ValidationError::SelfFeedback);
        }
        let recipient = state
            .views
            .get(recipient_id)
            .map(|v| v.user.clone())
            .ok_or_else(|| ValidationError::UnknownRecipient(recipient_id.to_string()))?;

        let text = draft.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let date = draft.date.ok_or(ValidationError::MissingDate)?;

        Ok(Validated {
            sender,
            recipient,
            text: text.to_string(),
            date,
        })
    }
}

impl SubmissionReport {
    /// True when any step raised a warning, e.g. fell back to a local heuristic.
    pub fn has_warnings(&self) -> bool {
        self.notices.iter().any(|n| n.level == NoticeLevel::Warning)
    }
}
