//! Connection registry fanning broadcasts out to live WebSocket sessions.
//!
//! The hub is the in-process implementation of the realtime publisher port:
//! topic names map to sets of live sessions, and a broadcast writes the same
//! frame to each of them. Sessions that fail to accept a write are treated
//! as dead and dropped from every topic; there is no buffering or replay.

use std::collections::HashMap;

use actix_ws::Session;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{RealtimePublisher, RealtimePublisherError};
use crate::inbound::ws::messages::ServerFrame;

/// Topic-indexed registry of live sessions.
#[derive(Default)]
pub struct BroadcastHub {
    topics: Mutex<HashMap<String, HashMap<Uuid, Session>>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection's session to a topic.
    pub async fn subscribe(&self, conn_id: Uuid, topic: impl Into<String>, session: Session) {
        self.topics
            .lock()
            .await
            .entry(topic.into())
            .or_default()
            .insert(conn_id, session);
    }

    /// Detach a connection from one topic.
    pub async fn unsubscribe(&self, conn_id: Uuid, topic: &str) {
        let mut topics = self.topics.lock().await;
        if let Some(subscribers) = topics.get_mut(topic) {
            subscribers.remove(&conn_id);
            if subscribers.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// Detach a connection from every topic; called on disconnect.
    pub async fn drop_connection(&self, conn_id: Uuid) {
        let mut topics = self.topics.lock().await;
        topics.retain(|_, subscribers| {
            subscribers.remove(&conn_id);
            !subscribers.is_empty()
        });
    }

    /// Number of live subscribers on a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RealtimePublisher for BroadcastHub {
    async fn broadcast(
        &self,
        topic: String,
        payload: Value,
    ) -> Result<(), RealtimePublisherError> {
        let frame = serde_json::to_string(&ServerFrame {
            topic: &topic,
            payload: &payload,
        })
        .map_err(|e| RealtimePublisherError::Serialization {
            message: e.to_string(),
        })?;

        // Snapshot subscribers, then send without holding the lock so a slow
        // client cannot block subscription changes.
        let subscribers: Vec<(Uuid, Session)> = {
            let topics = self.topics.lock().await;
            let Some(subscribers) = topics.get(&topic) else {
                return Ok(());
            };
            subscribers
                .iter()
                .map(|(conn_id, session)| (*conn_id, session.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        for (conn_id, mut session) in subscribers {
            if session.text(frame.clone()).await.is_err() {
                dead.push(conn_id);
            }
        }
        for conn_id in dead {
            debug!(%conn_id, "pruning dead WebSocket subscriber");
            self.drop_connection(conn_id).await;
        }
        Ok(())
    }
}
