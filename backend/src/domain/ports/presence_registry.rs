//! Port over the ephemeral per-board presence set.
//!
//! Presence is advisory. The Redis adapter stores each board's viewers in a
//! set under `presence:{boardId}` with a sliding 60-second expiry; re-entry
//! refreshes the TTL. Expiry is the only garbage collection, there is no
//! disconnect hook.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::domain::{BoardId, UserId};

/// Errors raised by presence registry adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceRegistryError {
    /// Store connection could not be established.
    #[error("presence registry connection failed: {message}")]
    Connection { message: String },
    /// Command failed during execution.
    #[error("presence registry command failed: {message}")]
    Command { message: String },
}

/// TTL-expiring membership set per board.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// Add `user_id` to the board's presence set and refresh the set's
    /// expiry. Returns the full member set afterwards.
    async fn enter(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, PresenceRegistryError>;

    /// Remove `user_id` from the board's presence set. Returns the full
    /// member set afterwards.
    async fn leave(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, PresenceRegistryError>;
}

/// In-memory registry for tests; entries never expire, so tests exercise
/// membership semantics only.
#[derive(Debug, Default)]
pub struct FixturePresenceRegistry {
    sets: Mutex<HashMap<BoardId, HashSet<UserId>>>,
}

impl FixturePresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_sets(&self) -> std::sync::MutexGuard<'_, HashMap<BoardId, HashSet<UserId>>> {
        self.sets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn snapshot(set: &HashSet<UserId>) -> Vec<UserId> {
        let mut members: Vec<UserId> = set.iter().copied().collect();
        members.sort();
        members
    }
}

#[async_trait]
impl PresenceRegistry for FixturePresenceRegistry {
    async fn enter(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, PresenceRegistryError> {
        let mut sets = self.lock_sets();
        let set = sets.entry(board_id).or_default();
        set.insert(user_id);
        Ok(Self::snapshot(set))
    }

    async fn leave(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, PresenceRegistryError> {
        let mut sets = self.lock_sets();
        let set = sets.entry(board_id).or_default();
        set.remove(&user_id);
        Ok(Self::snapshot(set))
    }
}
