use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::auth::errors::EventPublisherError;
use crate::auth::events::AuthEvent;
use crate::auth::ports::EventPublisher;

/// Hands events to a background worker that owns the real publisher.
///
/// `publish` never waits: the event is queued on the spot, or, when the queue
/// is full, by a detached task that waits for room. Either way cancelling the
/// request afterwards does not cancel delivery, and a slow broker never stalls
/// the caller. The worker runs up to `max_in_flight` deliveries at once and
/// exits after every sender is dropped and the in-flight deliveries finish.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<AuthEvent>,
}

impl EventDispatcher {
    /// Spawn the worker and return the dispatcher together with its handle.
    ///
    /// # Arguments
    /// * `publisher` - Publisher the worker delivers to
    /// * `capacity` - Number of events that may wait in the queue (at least 1)
    /// * `max_in_flight` - Deliveries running concurrently (at least 1; 1 keeps queue order)
    pub fn spawn(
        publisher: Arc<dyn EventPublisher>,
        capacity: usize,
        max_in_flight: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let max_in_flight = max_in_flight.clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize));
        let worker = tokio::spawn(run(publisher, rx, max_in_flight));

        tracing::info!(capacity, max_in_flight, "Event dispatcher started");
        (Self { tx }, worker)
    }
}

async fn run(
    publisher: Arc<dyn EventPublisher>,
    mut rx: mpsc::Receiver<AuthEvent>,
    max_in_flight: usize,
) {
    let slots = Arc::new(Semaphore::new(max_in_flight));

    while let Some(event) = rx.recv().await {
        let Ok(slot) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };
        let publisher = Arc::clone(&publisher);

        tokio::spawn(async move {
            deliver(publisher.as_ref(), &event).await;
            drop(slot);
        });
    }

    // Every slot back means every delivery has finished
    let permits = u32::try_from(max_in_flight).unwrap_or(u32::MAX);
    let _ = slots.acquire_many(permits).await;
    tracing::info!("Event dispatcher stopped");
}

async fn deliver(publisher: &dyn EventPublisher, event: &AuthEvent) {
    if let Err(e) = publisher.publish(event).await {
        tracing::error!(
            event_type = event.kind.as_str(),
            event_id = %event.event_id,
            user_id = %event.user_id,
            error = %e,
            "Failed to deliver auth event"
        );
    }
}

#[async_trait]
impl EventPublisher for EventDispatcher {
    async fn publish(&self, event: &AuthEvent) -> Result<(), EventPublisherError> {
        match self.tx.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    event_type = event.kind.as_str(),
                    event_id = %event.event_id,
                    "Event queue full, enqueueing in the background"
                );

                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let event_id = event.event_id.clone();
                    if tx.send(event).await.is_err() {
                        tracing::error!(event_id = %event_id, "Event queue closed before enqueue");
                    }
                });
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(EventPublisherError::QueueClosed(
                "Event dispatcher is not running".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::user::models::UserId;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<AuthEvent>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: &AuthEvent) -> Result<(), EventPublisherError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    /// Holds every delivery until the gate is opened.
    struct StalledPublisher {
        gate: Semaphore,
        started: AtomicUsize,
        delivered: AtomicUsize,
    }

    impl StalledPublisher {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                started: AtomicUsize::new(0),
                delivered: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EventPublisher for StalledPublisher {
        async fn publish(&self, _event: &AuthEvent) -> Result<(), EventPublisherError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _open = self.gate.acquire().await.unwrap();
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingPublisher {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _event: &AuthEvent) -> Result<(), EventPublisherError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(EventPublisherError::PublishFailed("broker down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order_and_drains_on_drop() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (dispatcher, worker) = EventDispatcher::spawn(publisher.clone(), 4, 1);

        let user_id = UserId::new();
        let sent = vec![
            AuthEvent::registered(user_id),
            AuthEvent::login(user_id),
            AuthEvent::logout(user_id),
        ];
        for event in &sent {
            dispatcher.publish(event).await.unwrap();
        }

        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(*publisher.events.lock().unwrap(), sent);
    }

    #[tokio::test]
    async fn test_publish_failures_do_not_stop_worker() {
        let publisher = Arc::new(FailingPublisher {
            attempts: AtomicUsize::new(0),
        });
        let (dispatcher, worker) = EventDispatcher::spawn(publisher.clone(), 1, 1);

        dispatcher
            .publish(&AuthEvent::login(UserId::new()))
            .await
            .unwrap();
        dispatcher
            .publish(&AuthEvent::logout(UserId::new()))
            .await
            .unwrap();

        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(publisher.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_publish_after_worker_stopped_reports_closed_queue() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (dispatcher, worker) = EventDispatcher::spawn(publisher, 1, 1);

        worker.abort();
        let _ = worker.await;

        let result = dispatcher.publish(&AuthEvent::login(UserId::new())).await;
        assert!(matches!(result, Err(EventPublisherError::QueueClosed(_))));
    }

    #[tokio::test]
    async fn test_publish_does_not_wait_on_stalled_broker() {
        let publisher = Arc::new(StalledPublisher::new());
        let (dispatcher, worker) = EventDispatcher::spawn(publisher.clone(), 1, 1);

        // Everything past the first event overflows the queue
        let user_id = UserId::new();
        for _ in 0..5 {
            let published = tokio::time::timeout(
                std::time::Duration::from_millis(500),
                dispatcher.publish(&AuthEvent::login(user_id)),
            )
            .await;
            assert!(matches!(published, Ok(Ok(()))));
        }
        assert_eq!(publisher.delivered.load(Ordering::SeqCst), 0);

        publisher.gate.add_permits(1);
        drop(dispatcher);
        tokio::time::timeout(std::time::Duration::from_secs(5), worker)
            .await
            .expect("Dispatcher did not drain")
            .unwrap();

        assert_eq!(publisher.delivered.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_deliveries_run_concurrently_up_to_limit() {
        let publisher = Arc::new(StalledPublisher::new());
        let (dispatcher, worker) = EventDispatcher::spawn(publisher.clone(), 8, 4);

        for _ in 0..4 {
            dispatcher
                .publish(&AuthEvent::registered(UserId::new()))
                .await
                .unwrap();
        }
        // Four deliveries waiting at once on the gate
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while publisher.started.load(Ordering::SeqCst) < 4 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("Deliveries did not start");

        publisher.gate.add_permits(4);
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(publisher.delivered.load(Ordering::SeqCst), 4);
    }
}
