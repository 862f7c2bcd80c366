//! Periodic scan for cards approaching their due time.
//!
//! Every tick the scanner queries cards due within the lookahead window and
//! publishes a `DEADLINE_NEAR` event for each one that has an assignee and
//! no dedup marker yet. The scanner never writes the marker itself; the
//! notification writer sets it when it appends the alert, so a scan that
//! dies between publish and append is retried harmlessly on the next tick.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::event_bus::EventBus;
use crate::domain::ports::{
    CardScheduleQuery, CardScheduleQueryError, DedupMarkerError, DedupMarkerStore,
};
use crate::domain::{DomainEvent, Error, EventKind, EventSubjects, UserId};

/// Gap between scans.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(30 * 60);
/// How far ahead of now a due time must fall to trigger an alert.
pub const LOOKAHEAD: Duration = Duration::from_secs(24 * 60 * 60);

fn map_schedule_error(error: CardScheduleQueryError) -> Error {
    match error {
        CardScheduleQueryError::Connection { message } => {
            Error::service_unavailable(format!("card schedule unavailable: {message}"))
        }
        CardScheduleQueryError::Query { message } => {
            Error::internal(format!("card schedule error: {message}"))
        }
    }
}

fn map_marker_error(error: DedupMarkerError) -> Error {
    match error {
        DedupMarkerError::Connection { message } => {
            Error::service_unavailable(format!("dedup marker store unavailable: {message}"))
        }
        DedupMarkerError::Command { message } => {
            Error::internal(format!("dedup marker error: {message}"))
        }
    }
}

/// Scans the schedule and feeds due-soon cards into the event pipeline.
pub struct DeadlineScanner<Q, M> {
    schedule: Arc<Q>,
    markers: Arc<M>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    running: Mutex<()>,
}

impl<Q, M> DeadlineScanner<Q, M> {
    /// Create a scanner over the given adapters and bus.
    pub fn new(schedule: Arc<Q>, markers: Arc<M>, bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            schedule,
            markers,
            bus,
            clock,
            running: Mutex::new(()),
        }
    }
}

impl<Q, M> DeadlineScanner<Q, M>
where
    Q: CardScheduleQuery + 'static,
    M: DedupMarkerStore + 'static,
{
    /// Run one scan. Returns the number of events published, or `None` when
    /// a previous scan is still in flight and this one was skipped.
    pub async fn run_once(&self) -> Result<Option<usize>, Error> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("deadline scan skipped: previous scan still running");
            return Ok(None);
        };

        let now = self.clock.utc();
        let horizon = now
            + chrono::Duration::from_std(LOOKAHEAD)
                .map_err(|e| Error::internal(format!("lookahead out of range: {e}")))?;
        let due = self
            .schedule
            .find_cards_due_between(now, horizon)
            .await
            .map_err(map_schedule_error)?;

        let mut published = 0;
        for card in due {
            let Some(due_at) = card.due_at else {
                continue;
            };
            let Some(assignee_id) = card.assignee_id else {
                continue;
            };
            if self
                .markers
                .is_set(card.id)
                .await
                .map_err(map_marker_error)?
            {
                continue;
            }

            let event = DomainEvent::new(
                EventKind::DeadlineNear,
                UserId::system(),
                EventSubjects {
                    list_id: Some(card.list_id),
                    card_id: Some(card.id),
                    user_id: Some(assignee_id),
                    ..EventSubjects::default()
                },
                now,
            )
            .with_change("dueAt", None, Some(json!(due_at.to_rfc3339())));
            self.bus.publish(event);
            published += 1;
        }

        debug!(published, "deadline scan complete");
        Ok(Some(published))
    }

    /// Spawn the periodic scan loop on the current runtime.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(error) = self.run_once().await {
                    warn!(%error, "deadline scan failed");
                }
            }
        })
    }
}
