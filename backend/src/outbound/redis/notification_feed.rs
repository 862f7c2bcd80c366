//! Redis implementation of the notification feed port.
//!
//! Each recipient's feed is a list under `notification:{userId}`: records
//! are JSON blobs prepended with `LPUSH`, capped with `LTRIM` and bound by
//! a 7-day key TTL. Read-state updates rewrite entries in place with
//! `LSET`; pruning rebuilds the list so the TTL is refreshed.

use async_trait::async_trait;
use bb8_redis::redis;
use chrono::{DateTime, Utc};

use crate::domain::notifications::{FEED_CAP, FEED_TTL};
use crate::domain::ports::{NotificationFeed, NotificationFeedError};
use crate::domain::{NotificationId, NotificationRecord, UserId};
use crate::outbound::redis::{RedisPool, notification_key};

/// Feed adapter over a shared connection pool.
#[derive(Clone)]
pub struct RedisNotificationFeed {
    pool: RedisPool,
}

impl RedisNotificationFeed {
    /// Create an adapter over the given pool.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<bb8_redis::bb8::PooledConnection<'_, bb8_redis::RedisConnectionManager>, NotificationFeedError>
    {
        self.pool
            .get()
            .await
            .map_err(|e| NotificationFeedError::Connection {
                message: e.to_string(),
            })
    }

    fn encode(record: &NotificationRecord) -> Result<String, NotificationFeedError> {
        serde_json::to_string(record).map_err(|e| NotificationFeedError::Serialization {
            message: e.to_string(),
        })
    }

    fn decode(raw: &str) -> Result<NotificationRecord, NotificationFeedError> {
        serde_json::from_str(raw).map_err(|e| NotificationFeedError::Serialization {
            message: e.to_string(),
        })
    }
}

fn command_error(e: redis::RedisError) -> NotificationFeedError {
    NotificationFeedError::Command {
        message: e.to_string(),
    }
}

#[async_trait]
impl NotificationFeed for RedisNotificationFeed {
    async fn append(
        &self,
        receiver: UserId,
        record: NotificationRecord,
    ) -> Result<(), NotificationFeedError> {
        let key = notification_key(receiver);
        let body = Self::encode(&record)?;
        let mut conn = self.connection().await?;

        let _: () = redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(&key)
            .arg(body)
            .ignore()
            .cmd("LTRIM")
            .arg(&key)
            .arg(0)
            .arg((FEED_CAP - 1) as i64)
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(FEED_TTL.as_secs())
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn list(
        &self,
        receiver: UserId,
    ) -> Result<Vec<NotificationRecord>, NotificationFeedError> {
        let mut conn = self.connection().await?;
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(notification_key(receiver))
            .arg(0)
            .arg(-1)
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        raw.iter().map(|entry| Self::decode(entry)).collect()
    }

    async fn mark_read(
        &self,
        receiver: UserId,
        id: NotificationId,
    ) -> Result<bool, NotificationFeedError> {
        let key = notification_key(receiver);
        let mut conn = self.connection().await?;
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&key)
            .arg(0)
            .arg(-1)
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;

        for (index, entry) in raw.iter().enumerate() {
            let mut record = Self::decode(entry)?;
            if record.id != id {
                continue;
            }
            if !record.is_read {
                record.is_read = true;
                let _: () = redis::cmd("LSET")
                    .arg(&key)
                    .arg(index as i64)
                    .arg(Self::encode(&record)?)
                    .query_async(&mut *conn)
                    .await
                    .map_err(command_error)?;
            }
            return Ok(true);
        }
        Ok(false)
    }

    async fn mark_all_read(&self, receiver: UserId) -> Result<u64, NotificationFeedError> {
        let key = notification_key(receiver);
        let mut conn = self.connection().await?;
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&key)
            .arg(0)
            .arg(-1)
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;

        let mut updated = 0;
        for (index, entry) in raw.iter().enumerate() {
            let mut record = Self::decode(entry)?;
            if record.is_read {
                continue;
            }
            record.is_read = true;
            let _: () = redis::cmd("LSET")
                .arg(&key)
                .arg(index as i64)
                .arg(Self::encode(&record)?)
                .query_async(&mut *conn)
                .await
                .map_err(command_error)?;
            updated += 1;
        }
        Ok(updated)
    }

    async fn prune(
        &self,
        receiver: UserId,
        older_than: DateTime<Utc>,
    ) -> Result<u64, NotificationFeedError> {
        let key = notification_key(receiver);
        let mut conn = self.connection().await?;
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&key)
            .arg(0)
            .arg(-1)
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;

        let mut survivors = Vec::with_capacity(raw.len());
        for entry in &raw {
            let record = Self::decode(entry)?;
            if record.created_at >= older_than {
                survivors.push(entry.clone());
            }
        }
        let removed = (raw.len() - survivors.len()) as u64;
        if removed == 0 {
            return Ok(0);
        }

        // Rebuild the list atomically; RPUSH keeps newest-first order.
        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(&key).ignore();
        if !survivors.is_empty() {
            pipe.cmd("RPUSH")
                .arg(&key)
                .arg(&survivors)
                .ignore()
                .cmd("EXPIRE")
                .arg(&key)
                .arg(FEED_TTL.as_secs())
                .ignore();
        }
        let _: () = pipe
            .query_async(&mut *conn)
            .await
            .map_err(command_error)?;
        Ok(removed)
    }
}
