//! Driving port for reading a user's notification feed.

use async_trait::async_trait;

use crate::domain::{Error, NotificationRecord, UserId};

/// Read access to the capped notification feed, newest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationQuery: Send + Sync {
    /// The receiver's feed, newest first.
    async fn list(&self, receiver: UserId) -> Result<Vec<NotificationRecord>, Error>;
}
