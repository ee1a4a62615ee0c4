use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::user::models::UserId;

/// Kind of authentication state transition an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    Registered,
    Login,
    Logout,
}

impl AuthEventKind {
    /// Get the event type name.
    ///
    /// # Returns
    /// Event type string ("registered", "login" or "logout")
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEventKind::Registered => "registered",
            AuthEventKind::Login => "login",
            AuthEventKind::Logout => "logout",
        }
    }
}

/// Domain event published once per successful authentication state transition.
///
/// `event_id` lets consumers drop duplicates of an at-least-once delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub event_id: String,
    pub kind: AuthEventKind,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl AuthEvent {
    /// Create a new event with a unique event ID and the current timestamp.
    pub fn new(kind: AuthEventKind, user_id: UserId) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            kind,
            user_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn registered(user_id: UserId) -> Self {
        Self::new(AuthEventKind::Registered, user_id)
    }

    pub fn login(user_id: UserId) -> Self {
        Self::new(AuthEventKind::Login, user_id)
    }

    pub fn logout(user_id: UserId) -> Self {
        Self::new(AuthEventKind::Logout, user_id)
    }
}
