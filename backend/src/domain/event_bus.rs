//! In-process publish/subscribe for domain events.
//!
//! The bus replaces a global event publisher with an explicit handle built
//! once at startup and injected into producers. Events are queued on a
//! bounded channel and dispatched by a single task that fans each event out
//! to interested handlers on a semaphore-bounded pool of spawned tasks, so
//! slow notification work can never stall a request thread.
//!
//! Delivery is at-least-once from the handlers' point of view: a retried
//! publisher may enqueue the same logical event twice, so handlers with
//! user-visible side effects must be idempotent (see the deadline dedup
//! marker). `publish` never blocks and never fails the caller's mutation;
//! when the queue is full the event is dropped with a warning, and a
//! failing handler is logged without affecting its peers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::domain::{DomainEvent, Error, EventKind};

/// Default bound on the publish queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Default bound on concurrently running handler invocations.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// An independent consumer of domain events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Filter hook; handlers that only care about some kinds override this.
    fn wants(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// React to one event. Errors are isolated and logged by the bus.
    async fn handle(&self, event: &DomainEvent) -> Result<(), Error>;
}

/// Cloneable publishing handle over the dispatcher task.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Start the dispatcher with the given handlers and bounds. Must be
    /// called from within a tokio runtime.
    pub fn start(
        handlers: Vec<Arc<dyn EventHandler>>,
        queue_capacity: usize,
        max_in_flight: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Arc<DomainEvent>>(queue_capacity);
        let limiter = Arc::new(Semaphore::new(max_in_flight));

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for handler in &handlers {
                    if !handler.wants(event.kind) {
                        continue;
                    }
                    let Ok(permit) = Arc::clone(&limiter).acquire_owned().await else {
                        return;
                    };
                    let handler = Arc::clone(handler);
                    let event = Arc::clone(&event);
                    tokio::spawn(async move {
                        if let Err(error) = handler.handle(&event).await {
                            warn!(
                                handler = handler.name(),
                                kind = event.kind.label(),
                                %error,
                                "event handler failed"
                            );
                        }
                        drop(permit);
                    });
                }
            }
            debug!("event bus dispatcher stopped");
        });

        Self { tx }
    }

    /// Start with the default bounds.
    pub fn with_defaults(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self::start(handlers, DEFAULT_QUEUE_CAPACITY, DEFAULT_MAX_IN_FLIGHT)
    }

    /// Queue an event for asynchronous fan-out. Never blocks; a full or
    /// closed queue drops the event with a warning because a lost toast is
    /// preferable to a stalled or failed mutation.
    pub fn publish(&self, event: DomainEvent) {
        if let Err(error) = self.tx.try_send(Arc::new(event)) {
            warn!(%error, "event dropped: bus queue full or closed");
        }
    }
}

/// Handler that records every event it sees; used by tests to observe the
/// pipeline without real side effects.
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    seen: std::sync::Mutex<Vec<DomainEvent>>,
}

impl RecordingEventHandler {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of observed events, oldest first.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EventHandler for RecordingEventHandler {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), Error> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventSubjects, UserId};
    use chrono::Utc;
    use std::time::Duration;

    fn event(kind: EventKind) -> DomainEvent {
        DomainEvent::new(kind, UserId::random(), EventSubjects::default(), Utc::now())
    }

    async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<(), Error> {
            Err(Error::service_unavailable("store down"))
        }
    }

    struct CardOnlyHandler {
        inner: RecordingEventHandler,
    }

    #[async_trait]
    impl EventHandler for CardOnlyHandler {
        fn name(&self) -> &'static str {
            "card-only"
        }

        fn wants(&self, kind: EventKind) -> bool {
            matches!(kind, EventKind::CardMoved)
        }

        async fn handle(&self, event: &DomainEvent) -> Result<(), Error> {
            self.inner.handle(event).await
        }
    }

    #[tokio::test]
    async fn every_interested_handler_observes_the_event() {
        let first = Arc::new(RecordingEventHandler::new());
        let second = Arc::new(RecordingEventHandler::new());
        let bus = EventBus::with_defaults(vec![
            Arc::clone(&first) as Arc<dyn EventHandler>,
            Arc::clone(&second) as Arc<dyn EventHandler>,
        ]);

        bus.publish(event(EventKind::CardMoved));

        assert!(
            eventually(|| first.events().len() == 1 && second.events().len() == 1).await,
            "both handlers should observe the event"
        );
    }

    #[tokio::test]
    async fn handler_failure_does_not_starve_peers() {
        let recorder = Arc::new(RecordingEventHandler::new());
        let bus = EventBus::with_defaults(vec![
            Arc::new(FailingHandler) as Arc<dyn EventHandler>,
            Arc::clone(&recorder) as Arc<dyn EventHandler>,
        ]);

        bus.publish(event(EventKind::CardUpdated));
        bus.publish(event(EventKind::CardDeleted));

        assert!(
            eventually(|| recorder.events().len() == 2).await,
            "peer handler should observe both events despite failures"
        );
    }

    #[tokio::test]
    async fn uninterested_handlers_are_skipped() {
        let filtered = Arc::new(CardOnlyHandler {
            inner: RecordingEventHandler::new(),
        });
        let all = Arc::new(RecordingEventHandler::new());
        let bus = EventBus::with_defaults(vec![
            Arc::clone(&filtered) as Arc<dyn EventHandler>,
            Arc::clone(&all) as Arc<dyn EventHandler>,
        ]);

        bus.publish(event(EventKind::BoardUpdated));
        bus.publish(event(EventKind::CardMoved));

        assert!(eventually(|| all.events().len() == 2).await);
        let filtered_events = filtered.inner.events();
        assert_eq!(filtered_events.len(), 1);
        assert_eq!(filtered_events[0].kind, EventKind::CardMoved);
    }

    #[tokio::test]
    async fn publish_returns_normally_when_the_queue_is_full() {
        struct StallingHandler;

        #[async_trait]
        impl EventHandler for StallingHandler {
            fn name(&self) -> &'static str {
                "stalling"
            }

            async fn handle(&self, _event: &DomainEvent) -> Result<(), Error> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        }

        // Capacity one and a stalled pool: subsequent publishes must drop
        // rather than block the caller.
        let bus = EventBus::start(vec![Arc::new(StallingHandler)], 1, 1);
        for _ in 0..16 {
            bus.publish(event(EventKind::CardUpdated));
        }
    }
}
