//! In-memory store.
//!
//! Used for tests, for ephemeral runs, and as the explicit mock mode when no
//! persistent backend is configured.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lifewheel_core::{
    FeedbackRecord, ScoreSnapshot, User, UserFeedback, WheelHistory, default_users,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{EventHub, StoreError, StoreEvent, StoreMode, Subscription, WheelStore};

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, User>,
    /// Keyed by snapshot id (`{user}_{date}`).
    snapshots: BTreeMap<String, ScoreSnapshot>,
    feedback: Vec<FeedbackRecord>,
}

pub struct MemoryStore {
    mode: StoreMode,
    tables: RwLock<Tables>,
    events: EventHub,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store reporting [`StoreMode::Live`].
    pub fn new() -> Self {
        Self {
            mode: StoreMode::Live,
            tables: RwLock::new(Tables::default()),
            events: EventHub::default(),
        }
    }

    /// Store seeded with the default users, reporting [`StoreMode::Mock`].
    pub fn mock() -> Self {
        let tables = Tables {
            users: default_users()
                .into_iter()
                .map(|u| (u.id.clone(), u))
                .collect(),
            ..Tables::default()
        };
        info!("using mock in-memory store");
        Self {
            mode: StoreMode::Mock,
            tables: RwLock::new(tables),
            events: EventHub::default(),
        }
    }

    /// Add or rename a user.
    pub async fn upsert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn snapshot_count(&self) -> usize {
        self.tables.read().await.snapshots.len()
    }

    pub async fn feedback_count(&self) -> usize {
        self.tables.read().await.feedback.len()
    }
}

#[async_trait]
impl WheelStore for MemoryStore {
    fn mode(&self) -> StoreMode {
        self.mode
    }

    async fn check_setup(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ensure_default_users(&self) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for user in default_users() {
            tables.users.insert(user.id.clone(), user);
        }
        Ok(())
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn wheel_history(&self, user_id: &str) -> Result<WheelHistory, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .snapshots
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| (s.date, s.scores.clone()))
            .collect())
    }

    async fn save_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<(), StoreError> {
        {
            let mut tables = self.tables.write().await;
            tables.snapshots.insert(snapshot.id(), snapshot.clone());
        }
        debug!(user = %snapshot.user_id, date = %snapshot.date, "saved snapshot");
        self.events.publish(StoreEvent::WheelChanged {
            user_id: snapshot.user_id.clone(),
            date: snapshot.date,
        });
        Ok(())
    }

    async fn user_feedback(&self, user_id: &str) -> Result<UserFeedback, StoreError> {
        let tables = self.tables.read().await;
        let mut out = UserFeedback::default();
        for fb in &tables.feedback {
            if fb.to == user_id {
                out.received.push(fb.clone());
            }
            if fb.from == user_id {
                out.given.push(fb.clone());
            }
        }
        Ok(out)
    }

    async fn insert_feedback(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        {
            let mut tables = self.tables.write().await;
            if tables.feedback.iter().any(|f| f.id == record.id) {
                return Err(StoreError::DuplicateFeedback(record.id.clone()));
            }
            tables.feedback.push(record.clone());
        }
        debug!(id = %record.id, from = %record.from, to = %record.to, "inserted feedback");
        self.events.publish(StoreEvent::FeedbackInserted {
            id: record.id.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
        });
        Ok(())
    }

    fn subscribe(&self, user_id: &str) -> Subscription {
        self.events.subscribe(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lifewheel_core::{Category, WheelScores};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[tokio::test]
    async fn mock_mode_is_seeded() {
        let store = MemoryStore::mock();
        assert_eq!(store.mode(), StoreMode::Mock);
        let names: Vec<_> = store
            .users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["Joe", "Mike", "Emma"]);
    }

    #[tokio::test]
    async fn new_store_is_live_and_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.mode(), StoreMode::Live);
        assert!(store.users().await.unwrap().is_empty());
        store.ensure_default_users().await.unwrap();
        store.ensure_default_users().await.unwrap();
        assert_eq!(store.users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn snapshot_upsert_is_per_user_per_date() {
        let store = MemoryStore::new();
        let mut scores = WheelScores::neutral();
        store
            .save_snapshot(&ScoreSnapshot::new("1", d(1), scores.clone()))
            .await
            .unwrap();
        scores.set(Category::Career, 8.0);
        store
            .save_snapshot(&ScoreSnapshot::new("1", d(1), scores.clone()))
            .await
            .unwrap();
        store
            .save_snapshot(&ScoreSnapshot::new("2", d(1), WheelScores::neutral()))
            .await
            .unwrap();

        assert_eq!(store.snapshot_count().await, 2);
        let history = store.wheel_history("1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.on(d(1)).unwrap().get(Category::Career), Some(8.0));
    }

    #[tokio::test]
    async fn feedback_split_into_received_and_given() {
        let store = MemoryStore::new();
        store
            .insert_feedback(&FeedbackRecord::new("1", "2", "a", d(1), vec![]))
            .await
            .unwrap();
        store
            .insert_feedback(&FeedbackRecord::new("2", "1", "b", d(2), vec![]))
            .await
            .unwrap();

        let fb = store.user_feedback("1").await.unwrap();
        assert_eq!(fb.given.len(), 1);
        assert_eq!(fb.given[0].text, "a");
        assert_eq!(fb.received.len(), 1);
        assert_eq!(fb.received[0].text, "b");
    }

    #[tokio::test]
    async fn duplicate_feedback_rejected() {
        let store = MemoryStore::new();
        let rec = FeedbackRecord::new("1", "2", "a", d(1), vec![]);
        store.insert_feedback(&rec).await.unwrap();
        let err = store.insert_feedback(&rec).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateFeedback(_)));
        assert_eq!(store.feedback_count().await, 1);
    }

    #[tokio::test]
    async fn writes_notify_the_concerned_user() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("2");

        store
            .insert_feedback(&FeedbackRecord::new("1", "2", "hi", d(1), vec![]))
            .await
            .unwrap();
        assert!(matches!(
            sub.next().await,
            Some(StoreEvent::FeedbackInserted { .. })
        ));

        store
            .save_snapshot(&ScoreSnapshot::new("2", d(1), WheelScores::neutral()))
            .await
            .unwrap();
        assert!(matches!(
            sub.next().await,
            Some(StoreEvent::WheelChanged { .. })
        ));
    }
}
