//! Port over the capped per-recipient notification feed.
//!
//! The Redis adapter stores each feed as a list under
//! `notification:{userId}` (newest first, capped, TTL-bound). In-key
//! read-modify-write sequences rely on the store's single-key atomicity;
//! cross-recipient contention cannot occur because feeds never share a key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::notifications::FEED_CAP;
use crate::domain::{NotificationId, NotificationRecord, UserId};

/// Errors raised by notification feed adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationFeedError {
    /// Store connection could not be established.
    #[error("notification feed connection failed: {message}")]
    Connection { message: String },
    /// Command failed during execution.
    #[error("notification feed command failed: {message}")]
    Command { message: String },
    /// A stored record could not be serialised or parsed.
    #[error("notification feed serialization failed: {message}")]
    Serialization { message: String },
}

/// Capped, TTL-bound, per-recipient append log with in-place read state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    /// Prepend a record to the recipient's feed, evicting beyond the cap
    /// and refreshing the feed TTL.
    async fn append(
        &self,
        receiver: UserId,
        record: NotificationRecord,
    ) -> Result<(), NotificationFeedError>;

    /// The recipient's feed, newest first.
    async fn list(&self, receiver: UserId)
        -> Result<Vec<NotificationRecord>, NotificationFeedError>;

    /// Mark one record read in place. Returns whether the record existed.
    async fn mark_read(
        &self,
        receiver: UserId,
        id: NotificationId,
    ) -> Result<bool, NotificationFeedError>;

    /// Mark every record read in place. Returns the number updated.
    async fn mark_all_read(&self, receiver: UserId) -> Result<u64, NotificationFeedError>;

    /// Drop records created before `older_than`, re-inserting survivors so
    /// the feed key's TTL is refreshed. Returns the number removed.
    async fn prune(
        &self,
        receiver: UserId,
        older_than: DateTime<Utc>,
    ) -> Result<u64, NotificationFeedError>;
}

/// In-memory feed for tests and Redis-less runs. Applies the same 50-entry
/// cap as the Redis adapter; TTL expiry is exercised through `prune` only.
#[derive(Debug, Default)]
pub struct FixtureNotificationFeed {
    feeds: Mutex<HashMap<UserId, Vec<NotificationRecord>>>,
}

impl FixtureNotificationFeed {
    /// Create an empty feed store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_feeds(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Vec<NotificationRecord>>> {
        self.feeds
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl NotificationFeed for FixtureNotificationFeed {
    async fn append(
        &self,
        receiver: UserId,
        record: NotificationRecord,
    ) -> Result<(), NotificationFeedError> {
        let mut feeds = self.lock_feeds();
        let feed = feeds.entry(receiver).or_default();
        feed.insert(0, record);
        feed.truncate(FEED_CAP);
        Ok(())
    }

    async fn list(
        &self,
        receiver: UserId,
    ) -> Result<Vec<NotificationRecord>, NotificationFeedError> {
        Ok(self.lock_feeds().get(&receiver).cloned().unwrap_or_default())
    }

    async fn mark_read(
        &self,
        receiver: UserId,
        id: NotificationId,
    ) -> Result<bool, NotificationFeedError> {
        let mut feeds = self.lock_feeds();
        let Some(feed) = feeds.get_mut(&receiver) else {
            return Ok(false);
        };
        match feed.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, receiver: UserId) -> Result<u64, NotificationFeedError> {
        let mut feeds = self.lock_feeds();
        let Some(feed) = feeds.get_mut(&receiver) else {
            return Ok(0);
        };
        let mut updated = 0;
        for record in feed.iter_mut().filter(|record| !record.is_read) {
            record.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn prune(
        &self,
        receiver: UserId,
        older_than: DateTime<Utc>,
    ) -> Result<u64, NotificationFeedError> {
        let mut feeds = self.lock_feeds();
        let Some(feed) = feeds.get_mut(&receiver) else {
            return Ok(0);
        };
        let before = feed.len();
        feed.retain(|record| record.created_at >= older_than);
        Ok((before - feed.len()) as u64)
    }
}
