//! Change notifications scoped to a user.
//!
//! Every store owns an [`EventHub`]. Writes publish a [`StoreEvent`];
//! [`Subscription`]s filter the shared broadcast stream down to the events
//! that concern one user (their own wheel changing, feedback sent to them).

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::warn;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A snapshot for `user_id` on `date` was written.
    WheelChanged { user_id: String, date: NaiveDate },
    /// Feedback `id` from `from` to `to` was inserted.
    FeedbackInserted { id: String, from: String, to: String },
    /// The subscriber fell behind and missed `missed` events; state should be
    /// reloaded from the store.
    Lagged { missed: u64 },
}

impl StoreEvent {
    /// Whether a session for `user_id` should refresh on this event.
    pub fn concerns(&self, user_id: &str) -> bool {
        match self {
            Self::WheelChanged { user_id: u, .. } => u == user_id,
            Self::FeedbackInserted { to, .. } => to == user_id,
            Self::Lagged { .. } => true,
        }
    }
}

/// Broadcast fan-out for store writes.
pub struct EventHub {
    tx: broadcast::Sender<StoreEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: StoreEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self, user_id: &str) -> Subscription {
        Subscription {
            user_id: user_id.to_string(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription to one user's changes. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) ends the subscription.
pub struct Subscription {
    user_id: String,
    rx: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Wait for the next event concerning this user. Returns `None` once the
    /// store has been dropped.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.concerns(&self.user_id) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(user = %self.user_id, missed, "subscription lagged");
                    return Some(StoreEvent::Lagged { missed });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}
