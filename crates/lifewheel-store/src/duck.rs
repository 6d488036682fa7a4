//! DuckDB persistence for users, wheel snapshots and feedback.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use duckdb::{Connection, params};
use lifewheel_core::{
    Category, FeedbackRecord, ScoreSnapshot, User, UserFeedback, WheelHistory, WheelScores,
    default_users,
};
use tracing::{debug, info};

use crate::{EventHub, StoreError, StoreEvent, StoreMode, Subscription, WheelStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id        VARCHAR PRIMARY KEY,
    username  VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS wheel_data (
    id        VARCHAR PRIMARY KEY,
    user_id   VARCHAR NOT NULL,
    date      VARCHAR NOT NULL,
    data      VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS feedback (
    id            VARCHAR PRIMARY KEY,
    from_user_id  VARCHAR NOT NULL,
    to_user_id    VARCHAR NOT NULL,
    text          VARCHAR NOT NULL,
    date          VARCHAR NOT NULL,
    categories    VARCHAR NOT NULL,
    created_at    TIMESTAMP DEFAULT current_timestamp
);
";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// DuckDB-backed [`WheelStore`].
///
/// Snapshot scores and feedback categories are stored as JSON text. Dates are
/// stored as `YYYY-MM-DD` text, which sorts chronologically.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
pub struct DuckStore {
    conn: Mutex<Connection>,
    events: EventHub,
}

impl DuckStore {
    /// Open an in-memory database with the schema created.
    pub fn open() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open or create a persistent database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::with_connection(Connection::open(path)?)?;
        info!(path = %path.display(), "opened wheel database");
        Ok(store)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            events: EventHub::default(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("database connection lock poisoned".into()))
    }

    /// Check whether all three tables exist.
    pub fn has_tables(&self) -> bool {
        ["users", "wheel_data", "feedback"]
            .iter()
            .all(|t| self.count_table(t).is_ok())
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT count(*)::BIGINT FROM {table}");
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_feedback(&self, column: &str, user_id: &str) -> Result<Vec<FeedbackRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, from_user_id, to_user_id, text, date, categories
             FROM feedback WHERE {column} = ? ORDER BY date, created_at"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, from, to, text, date, categories) = row?;
            let labels: Vec<String> = serde_json::from_str(&categories)?;
            out.push(FeedbackRecord {
                id,
                from,
                to,
                text,
                date: parse_date("feedback", &date)?,
                categories: labels
                    .iter()
                    .filter_map(|l| Category::from_label(l))
                    .collect(),
            });
        }
        Ok(out)
    }
}

fn parse_date(table: &'static str, raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| StoreError::Corrupt {
        table,
        detail: format!("bad date {raw:?}: {e}"),
    })
}

#[async_trait]
impl WheelStore for DuckStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Live
    }

    async fn check_setup(&self) -> Result<(), StoreError> {
        for table in ["users", "wheel_data", "feedback"] {
            self.count_table(table)
                .map_err(|e| StoreError::NotSetUp(format!("table {table}: {e}")))?;
        }
        Ok(())
    }

    async fn ensure_default_users(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        for user in default_users() {
            conn.execute(
                "INSERT OR REPLACE INTO users (id, username) VALUES (?, ?)",
                params![user.id, user.username],
            )?;
        }
        Ok(())
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, username FROM users ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    async fn wheel_history(&self, user_id: &str) -> Result<WheelHistory, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT date, data FROM wheel_data WHERE user_id = ?")?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut history = WheelHistory::new();
        for row in rows {
            let (date, data) = row?;
            let scores: WheelScores = serde_json::from_str(&data)?;
            history.insert(parse_date("wheel_data", &date)?, scores);
        }
        Ok(history)
    }

    async fn save_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<(), StoreError> {
        let data = serde_json::to_string(&snapshot.scores)?;
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT OR REPLACE INTO wheel_data (id, user_id, date, data) VALUES (?, ?, ?, ?)",
                params![
                    snapshot.id(),
                    snapshot.user_id,
                    snapshot.date.format(DATE_FORMAT).to_string(),
                    data
                ],
            )?;
        }
        debug!(user = %snapshot.user_id, date = %snapshot.date, "saved snapshot");
        self.events.publish(StoreEvent::WheelChanged {
            user_id: snapshot.user_id.clone(),
            date: snapshot.date,
        });
        Ok(())
    }

    async fn user_feedback(&self, user_id: &str) -> Result<UserFeedback, StoreError> {
        Ok(UserFeedback {
            received: self.query_feedback("to_user_id", user_id)?,
            given: self.query_feedback("from_user_id", user_id)?,
        })
    }

    async fn insert_feedback(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        let labels: Vec<&str> = record.categories.iter().map(|c| c.label()).collect();
        let categories = serde_json::to_string(&labels)?;
        {
            let conn = self.conn()?;
            let exists: i64 = conn.query_row(
                "SELECT count(*)::BIGINT FROM feedback WHERE id = ?",
                params![record.id],
                |row| row.get(0),
            )?;
            if exists > 0 {
                return Err(StoreError::DuplicateFeedback(record.id.clone()));
            }
            conn.execute(
                "INSERT INTO feedback (id, from_user_id, to_user_id, text, date, categories)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    record.id,
                    record.from,
                    record.to,
                    record.text,
                    record.date.format(DATE_FORMAT).to_string(),
                    categories
                ],
            )?;
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

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[tokio::test]
    async fn open_in_memory_has_schema() {
        let store = DuckStore::open().unwrap();
        assert!(store.has_tables());
        store.check_setup().await.unwrap();
        assert!(store.users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_users_are_idempotent() {
        let store = DuckStore::open().unwrap();
        store.ensure_default_users().await.unwrap();
        store.ensure_default_users().await.unwrap();
        let users = store.users().await.unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].username, "Joe");
    }

    #[tokio::test]
    async fn snapshot_roundtrip_and_upsert() {
        let store = DuckStore::open().unwrap();
        let mut scores = WheelScores::neutral();
        store
            .save_snapshot(&ScoreSnapshot::new("1", d(1), scores.clone()))
            .await
            .unwrap();
        scores.set(Category::Finance, 7.5);
        store
            .save_snapshot(&ScoreSnapshot::new("1", d(1), scores.clone()))
            .await
            .unwrap();
        store
            .save_snapshot(&ScoreSnapshot::new("1", d(4), WheelScores::neutral()))
            .await
            .unwrap();

        let history = store.wheel_history("1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.on(d(1)), Some(&scores));
        assert!(store.wheel_history("2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn feedback_roundtrip() {
        let store = DuckStore::open().unwrap();
        let rec = FeedbackRecord::new(
            "1",
            "2",
            "Great progress at work",
            d(2),
            vec![Category::Career, Category::MentalHealth],
        );
        store.insert_feedback(&rec).await.unwrap();

        let to = store.user_feedback("2").await.unwrap();
        assert_eq!(to.received, vec![rec.clone()]);
        assert!(to.given.is_empty());

        let from = store.user_feedback("1").await.unwrap();
        assert_eq!(from.given, vec![rec.clone()]);

        let err = store.insert_feedback(&rec).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateFeedback(_)));
    }

    #[tokio::test]
    async fn persistent_reopen_keeps_data() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("wheel.duckdb");

        let store = DuckStore::open_persistent(&db_path).unwrap();
        store.ensure_default_users().await.unwrap();
        store
            .save_snapshot(&ScoreSnapshot::new("3", d(9), WheelScores::neutral()))
            .await
            .unwrap();
        drop(store);

        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert_eq!(store.users().await.unwrap().len(), 3);
        assert_eq!(store.wheel_history("3").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn writes_publish_events() {
        let store = DuckStore::open().unwrap();
        let mut sub = store.subscribe("2");
        store
            .save_snapshot(&ScoreSnapshot::new("2", d(1), WheelScores::neutral()))
            .await
            .unwrap();
        assert_eq!(
            sub.next().await,
            Some(StoreEvent::WheelChanged {
                user_id: "2".into(),
                date: d(1)
            })
        );
    }
}
