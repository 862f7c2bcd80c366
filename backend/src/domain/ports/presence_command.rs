//! Driving port for board presence, consumed by the WebSocket adapter.

use async_trait::async_trait;

use crate::domain::{BoardId, Error, UserId};

/// Enter/leave operations on a board's ephemeral presence set.
///
/// Both operations re-broadcast the full member set on the board's presence
/// topic; the returned vector is the set after the mutation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceCommand: Send + Sync {
    /// Record `user_id` as viewing `board_id` and refresh the sliding
    /// expiry.
    async fn enter(&self, board_id: BoardId, user_id: UserId) -> Result<Vec<UserId>, Error>;

    /// Remove `user_id` from the board's presence set.
    async fn leave(&self, board_id: BoardId, user_id: UserId) -> Result<Vec<UserId>, Error>;
}
