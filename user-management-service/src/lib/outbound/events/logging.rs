use async_trait::async_trait;

use crate::auth::errors::EventPublisherError;
use crate::auth::events::AuthEvent;
use crate::auth::ports::EventPublisher;
use crate::outbound::events::messages::AuthEventMessage;

/// Publisher that writes each event to the log instead of a broker.
///
/// Selected with `broker.backend = "log"` for local runs without Kafka.
#[derive(Debug, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: &AuthEvent) -> Result<(), EventPublisherError> {
        let payload = serde_json::to_string(&AuthEventMessage::from(event))
            .map_err(|e| EventPublisherError::SerializationFailed(e.to_string()))?;

        tracing::info!(event_type = event.kind.as_str(), %payload, "Auth event");
        Ok(())
    }
}
