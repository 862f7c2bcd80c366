//! Shared WebSocket adapter state.
//!
//! WebSocket entry points depend on domain ports instead of constructing
//! domain services directly, keeping the session loop testable with
//! deterministic doubles.

use std::sync::Arc;

use crate::domain::ports::PresenceCommand;
use crate::inbound::ws::hub::BroadcastHub;

/// Dependency bundle for WebSocket handlers and sessions.
#[derive(Clone)]
pub struct WsState {
    pub hub: Arc<BroadcastHub>,
    pub presence: Arc<dyn PresenceCommand>,
}

impl WsState {
    /// Construct state from explicit implementations.
    pub fn new(hub: Arc<BroadcastHub>, presence: Arc<dyn PresenceCommand>) -> Self {
        Self { hub, presence }
    }
}
