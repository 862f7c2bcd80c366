//! Port for fire-and-forget realtime broadcasts.
//!
//! Topic name formats are part of the wire contract and must not drift:
//! `/topic/board/{boardId}`, `/topic/board/{boardId}/presence`,
//! `/topic/team/{teamId}` and `/user/{userId}/queue/notifications`.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::domain::{BoardId, TeamId, UserId};

/// Errors raised by realtime publisher adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimePublisherError {
    /// The payload could not be serialised for the wire.
    #[error("realtime payload serialization failed: {message}")]
    Serialization { message: String },
}

/// Topic carrying every card/list/board mutation within a board.
pub fn board_topic(board_id: BoardId) -> String {
    format!("/topic/board/{board_id}")
}

/// Topic carrying presence snapshots for a board.
pub fn board_presence_topic(board_id: BoardId) -> String {
    format!("/topic/board/{board_id}/presence")
}

/// Topic carrying team and notice mutations.
pub fn team_topic(team_id: TeamId) -> String {
    format!("/topic/team/{team_id}")
}

/// Per-user queue for personal notifications; keyed by recipient identity
/// rather than being a broadcast topic.
pub fn user_queue(user_id: UserId) -> String {
    format!("/user/{user_id}/queue/notifications")
}

/// Fire-and-forget delivery to currently connected subscribers. There is no
/// buffering or replay; disconnected clients miss the message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Deliver `payload` to every live subscriber of `topic`.
    async fn broadcast(&self, topic: String, payload: Value)
        -> Result<(), RealtimePublisherError>;
}

/// Recording publisher for tests.
#[derive(Debug, Default)]
pub struct FixtureRealtimePublisher {
    sent: Mutex<Vec<(String, Value)>>,
}

impl FixtureRealtimePublisher {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of broadcast `(topic, payload)` pairs, oldest first.
    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RealtimePublisher for FixtureRealtimePublisher {
    async fn broadcast(
        &self,
        topic: String,
        payload: Value,
    ) -> Result<(), RealtimePublisherError> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((topic, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn topic_formats_are_stable() {
        let board = BoardId::from_uuid(Uuid::nil());
        let nil = "00000000-0000-0000-0000-000000000000";
        assert_eq!(board_topic(board), format!("/topic/board/{nil}"));
        assert_eq!(
            board_presence_topic(board),
            format!("/topic/board/{nil}/presence")
        );
        assert_eq!(
            user_queue(UserId::from_uuid(Uuid::nil())),
            format!("/user/{nil}/queue/notifications")
        );
    }
}
