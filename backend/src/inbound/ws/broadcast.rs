//! Event-bus subscriber routing domain events onto realtime topics.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::event_bus::EventHandler;
use crate::domain::ports::{RealtimePublisher, board_topic, team_topic, user_queue};
use crate::domain::{DomainEvent, Error};

/// Bridges the event bus to the realtime publisher.
pub struct RealtimeBroadcaster {
    publisher: Arc<dyn RealtimePublisher>,
}

impl RealtimeBroadcaster {
    /// Create a broadcaster over the given publisher.
    pub fn new(publisher: Arc<dyn RealtimePublisher>) -> Self {
        Self { publisher }
    }
}

/// Topics an event fans out to.
///
/// Board-scoped events reach the board topic, team and notice lifecycles
/// reach the team topic, and events about a specific user reach that user's
/// queue unless they caused the event themselves.
pub fn topics_for(event: &DomainEvent) -> Vec<String> {
    let mut topics = Vec::new();
    if let Some(board_id) = event.subjects.board_id {
        topics.push(board_topic(board_id));
    }
    if event.kind.is_team_scoped() {
        if let Some(team_id) = event.subjects.team_id {
            topics.push(team_topic(team_id));
        }
    }
    if let Some(user_id) = event.subjects.user_id {
        if user_id != event.actor_id {
            topics.push(user_queue(user_id));
        }
    }
    topics
}

#[async_trait]
impl EventHandler for RealtimeBroadcaster {
    fn name(&self) -> &'static str {
        "realtime-broadcaster"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), Error> {
        let payload = serde_json::to_value(event)
            .map_err(|e| Error::internal(format!("event serialization failed: {e}")))?;
        // Topics are independent destinations; a failure on one must not
        // starve the others of the event.
        for topic in topics_for(event) {
            if let Err(error) = self.publisher.broadcast(topic.clone(), payload.clone()).await {
                warn!(%topic, %error, "realtime broadcast failed");
            }
        }
        Ok(())
    }
}
