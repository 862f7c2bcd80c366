//! Driving port for mutating notification read state.

use async_trait::async_trait;

use crate::domain::{Error, NotificationId, UserId};

/// Read-state mutations on the notification feed. Records are updated in
/// place, never deleted; deletion happens only through cap eviction and
/// TTL pruning.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationCommand: Send + Sync {
    /// Mark one record read. Returns whether the record existed.
    async fn mark_read(&self, receiver: UserId, id: NotificationId) -> Result<bool, Error>;

    /// Mark the whole feed read. Returns the number of records updated.
    async fn mark_all_read(&self, receiver: UserId) -> Result<u64, Error>;
}
