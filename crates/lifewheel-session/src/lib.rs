//! Session runtime: logged-in user, per-user views kept in sync with the
//! store, and the feedback submission workflow.

mod session;
mod workflow;

pub use session::{Session, SessionError, UserView};
pub use workflow::{FeedbackDraft, SubmissionReport, SubmissionState, SubmitError, ValidationError};
