use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::auth::events::AuthEvent;
use crate::auth::events::AuthEventKind;

/// Serializable envelope for authentication events.
///
/// Wire representation published to the broker; `event_type` carries the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuthEventMessage {
    Registered(AuthEventPayload),
    Login(AuthEventPayload),
    Logout(AuthEventPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEventPayload {
    pub event_id: String,
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
}

impl AuthEventMessage {
    /// Partition key; every event of a user lands on the same partition.
    pub fn key(&self) -> &str {
        &self.payload().user_id
    }

    pub fn payload(&self) -> &AuthEventPayload {
        match self {
            AuthEventMessage::Registered(payload)
            | AuthEventMessage::Login(payload)
            | AuthEventMessage::Logout(payload) => payload,
        }
    }
}

impl From<&AuthEvent> for AuthEventMessage {
    fn from(event: &AuthEvent) -> Self {
        let payload = AuthEventPayload {
            event_id: event.event_id.clone(),
            user_id: event.user_id.to_string(),
            occurred_at: event.occurred_at,
        };

        match event.kind {
            AuthEventKind::Registered => AuthEventMessage::Registered(payload),
            AuthEventKind::Login => AuthEventMessage::Login(payload),
            AuthEventKind::Logout => AuthEventMessage::Logout(payload),
        }
    }
}
