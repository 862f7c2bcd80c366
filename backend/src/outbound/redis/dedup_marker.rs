//! Redis implementation of the dedup marker port.
//!
//! A marker is `deadline-marker:{cardId}` written with `SET NX EX`, so the
//! set-if-absent check and the TTL are one atomic command.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;

use crate::domain::CardId;
use crate::domain::ports::{DedupMarkerError, DedupMarkerStore};
use crate::outbound::redis::{RedisPool, deadline_marker_key};

/// Marker adapter over a shared connection pool.
#[derive(Clone)]
pub struct RedisDedupMarkerStore {
    pool: RedisPool,
}

impl RedisDedupMarkerStore {
    /// Create an adapter over the given pool.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

fn command_error(e: redis::RedisError) -> DedupMarkerError {
    DedupMarkerError::Command {
        message: e.to_string(),
    }
}

#[async_trait]
impl DedupMarkerStore for RedisDedupMarkerStore {
    async fn acquire(&self, card_id: CardId, ttl: Duration) -> Result<bool, DedupMarkerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| DedupMarkerError::Connection {
                message: e.to_string(),
            })?;
        // A sub-second TTL still needs a whole Redis second to be a marker.
        let seconds = ttl.as_secs().max(1);
        let reply: Option<String> = redis::cmd("SET")
            .arg(deadline_marker_key(card_id))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        Ok(reply.is_some())
    }

    async fn is_set(&self, card_id: CardId) -> Result<bool, DedupMarkerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| DedupMarkerError::Connection {
                message: e.to_string(),
            })?;
        let exists: bool = redis::cmd("EXISTS")
            .arg(deadline_marker_key(card_id))
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        Ok(exists)
    }
}
