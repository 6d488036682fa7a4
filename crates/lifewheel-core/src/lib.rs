//! Core types for Lifewheel: the category enumeration, score snapshots,
//! per-user wheel history, feedback records and user-visible notices.

pub mod category;
pub mod feedback;
pub mod history;
pub mod notice;
pub mod scores;
pub mod user;

pub use category::{Category, UnknownCategory, retain_known};
pub use feedback::{FeedbackRecord, UserFeedback};
pub use history::{
    Baseline, BaselineOrigin, MAX_SERIES_DAYS, ScoreSnapshot, WheelHistory, snapshot_id,
};
pub use notice::{Notice, NoticeLevel};
pub use scores::{MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE, WheelScores, clamp_score, format_score};
pub use user::{User, default_users};
