//! Wire-level message definitions for the WebSocket adapter.
//!
//! Clients drive the connection with small action frames; everything the
//! server pushes is a topic-tagged envelope around the domain payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::BoardId;

/// Inbound control frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Subscribe this connection to a broadcast topic.
    Subscribe { topic: String },
    /// Drop a previous subscription.
    Unsubscribe { topic: String },
    /// Announce the client is viewing a board.
    #[serde(rename_all = "camelCase")]
    EnterBoard { board_id: BoardId },
    /// Announce the client stopped viewing a board.
    #[serde(rename_all = "camelCase")]
    LeaveBoard { board_id: BoardId },
}

/// Outbound envelope delivered to subscribers of a topic.
#[derive(Debug, Serialize)]
pub struct ServerFrame<'a> {
    pub topic: &'a str,
    pub payload: &'a Value,
}

/// Outbound error frame; the connection stays open.
#[derive(Debug, Serialize)]
pub struct ErrorFrame<'a> {
    pub error: &'a str,
}

/// Clients may only subscribe to broadcast topics; per-user queues are
/// attached by the server from the verified identity.
pub fn is_subscribable(topic: &str) -> bool {
    topic.starts_with("/topic/")
}
