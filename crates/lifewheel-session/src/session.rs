//! The logged-in session and the per-user views it keeps current.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use futures::future::join_all;
use lifewheel_ai::{Analysis, WheelAi};
use lifewheel_core::{ScoreSnapshot, User, UserFeedback, WheelHistory};
use lifewheel_store::{StoreError, StoreMode, WheelStore};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::workflow::SubmissionState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("no user is logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the session knows about one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserView {
    pub user: User,
    pub history: WheelHistory,
    pub feedback: UserFeedback,
}

impl UserView {
    fn empty(user: User) -> Self {
        Self {
            user,
            history: WheelHistory::new(),
            feedback: UserFeedback::default(),
        }
    }
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) views: BTreeMap<String, UserView>,
    pub(crate) current: Option<String>,
}

/// A client session over a [`WheelStore`].
///
/// Views are replaced wholesale with what the store returns, so a refresh
/// triggered by a push notification and one triggered by a local write can
/// race without corrupting anything.
pub struct Session {
    pub(crate) store: Arc<dyn WheelStore>,
    pub(crate) ai: Arc<WheelAi>,
    pub(crate) state: Arc<RwLock<State>>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) submitting: AtomicBool,
    pub(crate) phase: StdMutex<SubmissionState>,
}

async fn fetch_view(store: &dyn WheelStore, user: User) -> Result<UserView, StoreError> {
    let (history, feedback) = tokio::join!(
        store.wheel_history(&user.id),
        store.user_feedback(&user.id)
    );
    Ok(UserView {
        user,
        history: history?,
        feedback: feedback?,
    })
}

/// Reload one user's view; on failure the stale view is kept.
async fn reload(store: &dyn WheelStore, state: &RwLock<State>, user_id: &str) {
    let Some(user) = state.read().await.views.get(user_id).map(|v| v.user.clone()) else {
        debug!(user = %user_id, "refresh for user outside the session ignored");
        return;
    };
    match fetch_view(store, user).await {
        Ok(view) => {
            state.write().await.views.insert(user_id.to_string(), view);
        }
        Err(e) => warn!(user = %user_id, error = %e, "refresh failed, keeping previous view"),
    }
}

impl Session {
    /// Ensure the default users exist, then load every user's history and
    /// feedback. A user whose data fails to load starts with an empty view.
    pub async fn open(store: Arc<dyn WheelStore>, ai: Arc<WheelAi>) -> Result<Self, SessionError> {
        if let Err(e) = store.ensure_default_users().await {
            warn!(error = %e, "could not ensure default users");
        }
        let users = store.users().await?;
        let loaded = join_all(users.into_iter().map(|user| {
            let store = store.as_ref();
            async move {
                match fetch_view(store, user.clone()).await {
                    Ok(view) => view,
                    Err(e) => {
                        warn!(user = %user.id, error = %e, "failed to load user data");
                        UserView::empty(user)
                    }
                }
            }
        }))
        .await;

        let views: BTreeMap<String, UserView> = loaded
            .into_iter()
            .map(|v| (v.user.id.clone(), v))
            .collect();
        info!(
            users = views.len(),
            mode = ?store.mode(),
            ai = ai.backend_name().unwrap_or("offline"),
            "session opened"
        );

        Ok(Self {
            store,
            ai,
            state: Arc::new(RwLock::new(State {
                views,
                current: None,
            })),
            watchers: Mutex::new(Vec::new()),
            submitting: AtomicBool::new(false),
            phase: StdMutex::new(SubmissionState::Idle),
        })
    }

    pub fn store_mode(&self) -> StoreMode {
        self.store.mode()
    }

    pub fn ai(&self) -> &WheelAi {
        &self.ai
    }

    /// Users known to the session, ordered by id.
    pub async fn users(&self) -> Vec<User> {
        let state = self.state.read().await;
        state.views.values().map(|v| v.user.clone()).collect()
    }

    pub async fn view(&self, user_id: &str) -> Option<UserView> {
        self.state.read().await.views.get(user_id).cloned()
    }

    pub async fn current_user(&self) -> Option<User> {
        let state = self.state.read().await;
        let id = state.current.as_ref()?;
        state.views.get(id).map(|v| v.user.clone())
    }

    /// Where the submission workflow currently is.
    pub fn submission_state(&self) -> SubmissionState {
        self.phase
            .lock()
            .map(|p| *p)
            .unwrap_or(SubmissionState::Idle)
    }

    /// Log in as `user_id`, subscribe to their changes and make sure a
    /// snapshot exists for `today`.
    ///
    /// Logging in while another user is logged in logs them out first.
    /// A failure to seed today's snapshot is logged, not returned.
    pub async fn login(&self, user_id: &str, today: NaiveDate) -> Result<User, SessionError> {
        let user = {
            let state = self.state.read().await;
            state
                .views
                .get(user_id)
                .map(|v| v.user.clone())
                .ok_or_else(|| SessionError::UnknownUser(user_id.to_string()))?
        };
        self.logout().await;

        let mut sub = self.store.subscribe(user_id);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let watched = user_id.to_string();
        let handle = tokio::spawn(async move {
            while let Some(event) = sub.next().await {
                debug!(user = %watched, ?event, "store change");
                reload(store.as_ref(), &state, &watched).await;
            }
        });
        self.watchers.lock().await.push(handle);
        self.state.write().await.current = Some(user_id.to_string());

        self.seed_today(user_id, today).await;
        info!(user = %user.id, username = %user.username, "logged in");
        Ok(user)
    }

    /// Create today's snapshot from the most recent one, or neutral scores,
    /// if it does not exist yet.
    async fn seed_today(&self, user_id: &str, today: NaiveDate) {
        let history = match self.store.wheel_history(user_id).await {
            Ok(h) => h,
            Err(e) => {
                warn!(user = %user_id, error = %e, "could not read history to seed today");
                return;
            }
        };
        let Some(scores) = history.seed_for(today) else {
            return;
        };
        let snapshot = ScoreSnapshot::new(user_id, today, scores);
        match self.store.save_snapshot(&snapshot).await {
            Ok(()) => {
                debug!(user = %user_id, date = %today, "seeded today's snapshot");
                self.refresh_user(user_id).await;
            }
            Err(e) => warn!(user = %user_id, error = %e, "could not seed today's snapshot"),
        }
    }

    /// Unsubscribe and forget the current user.
    pub async fn logout(&self) {
        let handles: Vec<_> = self.watchers.lock().await.drain(..).collect();
        for handle in handles {
            handle.abort();
        }
        if let Some(user) = self.state.write().await.current.take() {
            info!(user = %user, "logged out");
        }
    }

    /// End the session.
    pub async fn close(&self) {
        self.logout().await;
        debug!("session closed");
    }

    /// Reload one user's view from the store. Errors keep the stale view.
    pub async fn refresh_user(&self, user_id: &str) {
        reload(self.store.as_ref(), &self.state, user_id).await;
    }

    /// Narrative analysis of `user_id`'s wheel as of `date`.
    pub async fn analyze(&self, user_id: &str, date: NaiveDate) -> Result<Analysis, SessionError> {
        let view = self
            .view(user_id)
            .await
            .ok_or_else(|| SessionError::UnknownUser(user_id.to_string()))?;
        let scores = view.history.resolve(date).scores;
        Ok(self.ai.analyzer.analyze(&scores, &view.user.username).await)
    }

    /// Analysis for the logged-in user.
    pub async fn analyze_current(&self, date: NaiveDate) -> Result<Analysis, SessionError> {
        let user = self.current_user().await.ok_or(SessionError::NotLoggedIn)?;
        self.analyze(&user.id, date).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for handle in self.watchers.get_mut().drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use lifewheel_ai::Source;
    use lifewheel_core::{Category, FeedbackRecord, WheelScores};
    use lifewheel_store::MemoryStore;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    async fn open(store: Arc<MemoryStore>) -> Session {
        Session::open(store, Arc::new(WheelAi::offline()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_loads_default_users() {
        let store = Arc::new(MemoryStore::new());
        let session = open(store).await;
        let names: Vec<String> = session.users().await.into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["Joe", "Mike", "Emma"]);
        assert_eq!(session.store_mode(), StoreMode::Live);
        assert!(session.current_user().await.is_none());
    }

    #[tokio::test]
    async fn login_unknown_user_fails() {
        let session = open(Arc::new(MemoryStore::mock())).await;
        let err = session.login("42", d(5)).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownUser(_)));
    }

    #[tokio::test]
    async fn login_seeds_today_from_latest_history() {
        let store = Arc::new(MemoryStore::mock());
        let mut scores = WheelScores::neutral();
        scores.set(Category::Career, 7.0);
        store
            .save_snapshot(&ScoreSnapshot::new("1", d(1), scores.clone()))
            .await
            .unwrap();
        store
            .save_snapshot(&ScoreSnapshot::new("1", d(20), WheelScores::neutral()))
            .await
            .unwrap();

        let session = open(Arc::clone(&store)).await;
        session.login("1", d(5)).await.unwrap();

        let stored = store.wheel_history("1").await.unwrap();
        assert_eq!(stored.on(d(5)), Some(&scores));
        let view = session.view("1").await.unwrap();
        assert_eq!(view.history.on(d(5)), Some(&scores));
        assert_eq!(session.current_user().await.unwrap().username, "Joe");
    }

    #[tokio::test]
    async fn login_without_history_seeds_neutral() {
        let store = Arc::new(MemoryStore::mock());
        let session = open(Arc::clone(&store)).await;
        session.login("3", d(5)).await.unwrap();
        let stored = store.wheel_history("3").await.unwrap();
        assert_eq!(stored.on(d(5)), Some(&WheelScores::neutral()));
    }

    #[tokio::test]
    async fn login_keeps_existing_snapshot() {
        let store = Arc::new(MemoryStore::mock());
        let mut scores = WheelScores::neutral();
        scores.set(Category::Finance, 2.0);
        store
            .save_snapshot(&ScoreSnapshot::new("2", d(5), scores.clone()))
            .await
            .unwrap();
        let session = open(Arc::clone(&store)).await;
        session.login("2", d(5)).await.unwrap();
        assert_eq!(store.snapshot_count().await, 1);
        assert_eq!(store.wheel_history("2").await.unwrap().on(d(5)), Some(&scores));
    }

    #[tokio::test]
    async fn push_notification_refreshes_view() {
        let store = Arc::new(MemoryStore::mock());
        let session = open(Arc::clone(&store)).await;
        session.login("2", d(5)).await.unwrap();

        let record = FeedbackRecord::new("1", "2", "Nice", d(5), vec![]);
        store.insert_feedback(&record).await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let view = session.view("2").await.unwrap();
                if !view.feedback.received.is_empty() {
                    return view.feedback.received;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(seen, vec![record]);
    }

    #[tokio::test]
    async fn logout_stops_watching() {
        let store = Arc::new(MemoryStore::mock());
        let session = open(Arc::clone(&store)).await;
        session.login("2", d(5)).await.unwrap();
        session.logout().await;
        assert!(session.current_user().await.is_none());

        store
            .insert_feedback(&FeedbackRecord::new("1", "2", "Nice", d(5), vec![]))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.view("2").await.unwrap().feedback.received.is_empty());
    }

    #[tokio::test]
    async fn analyze_offline_uses_template() {
        let store = Arc::new(MemoryStore::mock());
        let session = open(store).await;
        let analysis = session.analyze("1", d(5)).await.unwrap();
        assert_eq!(analysis.source, Source::Fallback);
        assert!(analysis.text.contains("Joe's Wheel of Life"));
        assert!(matches!(
            session.analyze_current(d(5)).await,
            Err(SessionError::NotLoggedIn)
        ));
    }
}
