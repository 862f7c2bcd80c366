//! Redis implementation of the presence registry port.
//!
//! Each board's viewers live in a set under `presence:{boardId}` with a
//! sliding 60-second expiry refreshed on entry. Expiry is the only garbage
//! collection; a client that vanishes without a `leave` falls out when the
//! key expires.

use async_trait::async_trait;
use bb8_redis::redis;

use crate::domain::ports::{PresenceRegistry, PresenceRegistryError};
use crate::domain::{BoardId, UserId};
use crate::outbound::redis::{RedisPool, presence_key};

/// Sliding expiry applied to each board's presence set.
const PRESENCE_TTL_SECS: u64 = 60;

/// Presence adapter over a shared connection pool.
#[derive(Clone)]
pub struct RedisPresenceRegistry {
    pool: RedisPool,
}

impl RedisPresenceRegistry {
    /// Create an adapter over the given pool.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<
        bb8_redis::bb8::PooledConnection<'_, bb8_redis::RedisConnectionManager>,
        PresenceRegistryError,
    > {
        self.pool
            .get()
            .await
            .map_err(|e| PresenceRegistryError::Connection {
                message: e.to_string(),
            })
    }
}

fn command_error(e: redis::RedisError) -> PresenceRegistryError {
    PresenceRegistryError::Command {
        message: e.to_string(),
    }
}

fn parse_members(raw: Vec<String>) -> Result<Vec<UserId>, PresenceRegistryError> {
    let mut members = raw
        .iter()
        .map(|entry| {
            entry.parse().map_err(|_| PresenceRegistryError::Command {
                message: format!("malformed presence member: {entry}"),
            })
        })
        .collect::<Result<Vec<UserId>, _>>()?;
    members.sort();
    Ok(members)
}

#[async_trait]
impl PresenceRegistry for RedisPresenceRegistry {
    async fn enter(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, PresenceRegistryError> {
        let key = presence_key(board_id);
        let mut conn = self.connection().await?;
        let (raw,): (Vec<String>,) = redis::pipe()
            .atomic()
            .cmd("SADD")
            .arg(&key)
            .arg(user_id.to_string())
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(PRESENCE_TTL_SECS)
            .ignore()
            .cmd("SMEMBERS")
            .arg(&key)
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        parse_members(raw)
    }

    async fn leave(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, PresenceRegistryError> {
        let key = presence_key(board_id);
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SREM")
            .arg(&key)
            .arg(user_id.to_string())
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        let raw: Vec<String> = redis::cmd("SMEMBERS")
            .arg(&key)
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        parse_members(raw)
    }
}
