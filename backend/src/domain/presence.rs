//! Board presence: who is currently looking at a board.
//!
//! Every enter and leave re-broadcasts the full member set on the board's
//! presence topic. Clients treat each snapshot as authoritative, so a missed
//! frame is corrected by the next mutation and stale members fall out when
//! the registry's sliding expiry fires.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::domain::ports::{
    PresenceCommand, PresenceRegistry, PresenceRegistryError, RealtimePublisher,
    board_presence_topic,
};
use crate::domain::{BoardId, Error, UserId};

fn map_registry_error(error: PresenceRegistryError) -> Error {
    match error {
        PresenceRegistryError::Connection { message } => {
            Error::service_unavailable(format!("presence registry unavailable: {message}"))
        }
        PresenceRegistryError::Command { message } => {
            Error::internal(format!("presence registry error: {message}"))
        }
    }
}

/// Mutates the presence registry and fans the resulting snapshot out.
#[derive(Clone)]
pub struct PresenceService<P> {
    registry: Arc<P>,
    publisher: Arc<dyn RealtimePublisher>,
}

impl<P> PresenceService<P> {
    /// Create a service over the given registry and publisher.
    pub fn new(registry: Arc<P>, publisher: Arc<dyn RealtimePublisher>) -> Self {
        Self {
            registry,
            publisher,
        }
    }
}

impl<P: PresenceRegistry> PresenceService<P> {
    async fn broadcast_snapshot(&self, board_id: BoardId, members: &[UserId]) {
        let payload = json!({
            "boardId": board_id,
            "members": members,
        });
        // Best effort: a dropped snapshot is corrected by the next one.
        if let Err(error) = self
            .publisher
            .broadcast(board_presence_topic(board_id), payload)
            .await
        {
            warn!(%board_id, %error, "presence snapshot broadcast failed");
        }
    }
}

#[async_trait]
impl<P: PresenceRegistry> PresenceCommand for PresenceService<P> {
    async fn enter(&self, board_id: BoardId, user_id: UserId) -> Result<Vec<UserId>, Error> {
        let members = self
            .registry
            .enter(board_id, user_id)
            .await
            .map_err(map_registry_error)?;
        self.broadcast_snapshot(board_id, &members).await;
        Ok(members)
    }

    async fn leave(&self, board_id: BoardId, user_id: UserId) -> Result<Vec<UserId>, Error> {
        let members = self
            .registry
            .leave(board_id, user_id)
            .await
            .map_err(map_registry_error)?;
        self.broadcast_snapshot(board_id, &members).await;
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FixturePresenceRegistry, FixtureRealtimePublisher};
    use serde_json::Value;

    fn service() -> (
        PresenceService<FixturePresenceRegistry>,
        Arc<FixtureRealtimePublisher>,
    ) {
        let publisher = Arc::new(FixtureRealtimePublisher::new());
        let service = PresenceService::new(
            Arc::new(FixturePresenceRegistry::new()),
            Arc::clone(&publisher) as Arc<dyn RealtimePublisher>,
        );
        (service, publisher)
    }

    fn member_count(payload: &Value) -> usize {
        payload["members"].as_array().map(Vec::len).unwrap_or(0)
    }

    #[tokio::test]
    async fn enter_broadcasts_the_updated_member_set() {
        let (service, publisher) = service();
        let board_id = BoardId::random();
        let first = UserId::random();
        let second = UserId::random();

        let members = service.enter(board_id, first).await.expect("enter");
        assert_eq!(members, vec![first]);
        let members = service.enter(board_id, second).await.expect("enter");
        assert_eq!(members.len(), 2);

        let sent = publisher.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, board_presence_topic(board_id));
        assert_eq!(member_count(&sent[0].1), 1);
        assert_eq!(member_count(&sent[1].1), 2);
    }

    #[tokio::test]
    async fn leave_broadcasts_the_shrunken_set() {
        let (service, publisher) = service();
        let board_id = BoardId::random();
        let user = UserId::random();

        service.enter(board_id, user).await.expect("enter");
        let members = service.leave(board_id, user).await.expect("leave");
        assert!(members.is_empty());

        let sent = publisher.sent();
        assert_eq!(member_count(&sent[1].1), 0);
    }

    #[tokio::test]
    async fn boards_track_presence_independently() {
        let (service, _publisher) = service();
        let user = UserId::random();
        let one = BoardId::random();
        let two = BoardId::random();

        service.enter(one, user).await.expect("enter");
        let members = service.leave(two, user).await.expect("leave other board");
        assert!(members.is_empty());

        let members = service.enter(one, user).await.expect("re-enter");
        assert_eq!(members, vec![user]);
    }
}
