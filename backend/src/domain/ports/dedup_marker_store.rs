//! Port over the per-card deadline dedup marker.
//!
//! A marker is a short-lived key (`deadline-marker:{cardId}`) whose mere
//! presence suppresses a repeated deadline alert within its window. The
//! marker is written exactly once, by the notification writer on append;
//! the scanner only tests for presence before publishing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::CardId;

/// Errors raised by dedup marker adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DedupMarkerError {
    /// Store connection could not be established.
    #[error("dedup marker connection failed: {message}")]
    Connection { message: String },
    /// Command failed during execution.
    #[error("dedup marker command failed: {message}")]
    Command { message: String },
}

/// Set-if-absent marker store with per-key TTL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DedupMarkerStore: Send + Sync {
    /// Atomically set the marker for `card_id` with the given TTL.
    /// Returns `true` when the marker was newly set and `false` when a
    /// live marker already existed.
    async fn acquire(&self, card_id: CardId, ttl: Duration) -> Result<bool, DedupMarkerError>;

    /// Whether a live marker exists for `card_id`.
    async fn is_set(&self, card_id: CardId) -> Result<bool, DedupMarkerError>;
}

/// In-memory marker store for tests; expiry is evaluated against the
/// injected clock so tests can advance time deterministically.
pub struct FixtureDedupMarkerStore {
    clock: Arc<dyn Clock>,
    markers: Mutex<HashMap<CardId, DateTime<Utc>>>,
}

impl FixtureDedupMarkerStore {
    /// Create an empty marker store using the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            markers: Mutex::new(HashMap::new()),
        }
    }

    fn lock_markers(&self) -> std::sync::MutexGuard<'_, HashMap<CardId, DateTime<Utc>>> {
        self.markers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn live(&self, expires_at: DateTime<Utc>) -> bool {
        expires_at > self.clock.utc()
    }
}

#[async_trait]
impl DedupMarkerStore for FixtureDedupMarkerStore {
    async fn acquire(&self, card_id: CardId, ttl: Duration) -> Result<bool, DedupMarkerError> {
        let now = self.clock.utc();
        let expires_at = now
            + chrono::Duration::from_std(ttl)
                .map_err(|e| DedupMarkerError::Command {
                    message: format!("ttl out of range: {e}"),
                })?;
        let mut markers = self.lock_markers();
        match markers.get(&card_id) {
            Some(existing) if self.live(*existing) => Ok(false),
            _ => {
                markers.insert(card_id, expires_at);
                Ok(true)
            }
        }
    }

    async fn is_set(&self, card_id: CardId) -> Result<bool, DedupMarkerError> {
        Ok(self
            .lock_markers()
            .get(&card_id)
            .is_some_and(|expires_at| self.live(*expires_at)))
    }
}
