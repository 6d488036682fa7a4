//! Users of the wheel.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// The fixed set of users every deployment starts with.
pub fn default_users() -> Vec<User> {
    vec![
        User::new("1", "Joe"),
        User::new("2", "Mike"),
        User::new("3", "Emma"),
    ]
}
