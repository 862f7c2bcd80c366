//! Redis-backed adapters for the notification feed, the deadline dedup
//! marker and the presence registry.
//!
//! Key formats are part of the wire contract shared with other services and
//! must not drift:
//!
//! - `notification:{userId}` — list, newest first, capped and TTL-bound
//! - `deadline-marker:{cardId}` — `SET NX EX` marker
//! - `presence:{boardId}` — set with a sliding 60s expiry

use bb8_redis::{RedisConnectionManager, bb8};

use crate::domain::{BoardId, CardId, UserId};

mod dedup_marker;
mod notification_feed;
mod presence;

pub use dedup_marker::RedisDedupMarkerStore;
pub use notification_feed::RedisNotificationFeed;
pub use presence::RedisPresenceRegistry;

/// Shared bb8 connection pool over Redis.
pub type RedisPool = bb8::Pool<RedisConnectionManager>;

/// Build a connection pool for the given Redis URL.
pub async fn connect(url: &str) -> Result<RedisPool, bb8_redis::redis::RedisError> {
    let manager = RedisConnectionManager::new(url)?;
    bb8::Pool::builder().build(manager).await
}

pub(crate) fn notification_key(user_id: UserId) -> String {
    format!("notification:{user_id}")
}

pub(crate) fn deadline_marker_key(card_id: CardId) -> String {
    format!("deadline-marker:{card_id}")
}

pub(crate) fn presence_key(board_id: BoardId) -> String {
    format!("presence:{board_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn key_formats_are_stable() {
        let nil = Uuid::nil();
        assert_eq!(
            notification_key(UserId::from_uuid(nil)),
            format!("notification:{nil}")
        );
        assert_eq!(
            deadline_marker_key(CardId::from_uuid(nil)),
            format!("deadline-marker:{nil}")
        );
        assert_eq!(
            presence_key(BoardId::from_uuid(nil)),
            format!("presence:{nil}")
        );
    }
}
