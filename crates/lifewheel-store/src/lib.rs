//! Storage layer: the [`WheelStore`] interface, an in-memory store that also
//! serves as the mock/degraded mode, and DuckDB persistence.

mod error;
pub mod events;
mod memory;

pub use error::StoreError;
pub use events::{EventHub, StoreEvent, Subscription};
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use async_trait::async_trait;
use lifewheel_core::{FeedbackRecord, ScoreSnapshot, User, UserFeedback, WheelHistory};

/// Whether a store is backed by real persistence or by seeded mock data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Live,
    /// Seeded in-memory data standing in for an unreachable or unconfigured
    /// backend. Nothing written survives the process.
    Mock,
}

/// Users, per-date score snapshots and feedback records, plus per-user change
/// notifications.
///
/// Every method reports failures; whether a failure aborts an operation or is
/// logged and tolerated is decided by the caller.
#[async_trait]
pub trait WheelStore: Send + Sync {
    fn mode(&self) -> StoreMode;

    /// Verify the backing tables are reachable.
    async fn check_setup(&self) -> Result<(), StoreError>;

    /// Upsert the fixed default users.
    async fn ensure_default_users(&self) -> Result<(), StoreError>;

    async fn users(&self) -> Result<Vec<User>, StoreError>;

    /// All snapshots for one user.
    async fn wheel_history(&self, user_id: &str) -> Result<WheelHistory, StoreError>;

    /// Insert or overwrite the snapshot for (user, date).
    async fn save_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<(), StoreError>;

    /// Feedback received by and given by one user, oldest first.
    async fn user_feedback(&self, user_id: &str) -> Result<UserFeedback, StoreError>;

    async fn insert_feedback(&self, record: &FeedbackRecord) -> Result<(), StoreError>;

    /// Subscribe to changes concerning `user_id`.
    fn subscribe(&self, user_id: &str) -> Subscription;
}
