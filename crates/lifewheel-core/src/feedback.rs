//! Feedback exchanged between users.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::Category;

/// A stored piece of feedback.
///
/// `text` is the post-translation text. `categories` are computed once at
/// creation and may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub from: String,
    pub to: String,
    pub text: String,
    pub date: NaiveDate,
    pub categories: Vec<Category>,
}

impl FeedbackRecord {
    /// Create a record with a fresh random identifier.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
        date: NaiveDate,
        categories: Vec<Category>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            from: from.into(),
            to: to.into(),
            text: text.into(),
            date,
            categories,
        }
    }
}

/// Feedback seen from one user's point of view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFeedback {
    pub received: Vec<FeedbackRecord>,
    pub given: Vec<FeedbackRecord>,
}
