//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{CardCommand, NotificationCommand, NotificationQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub notifications: Arc<dyn NotificationQuery>,
    pub notification_commands: Arc<dyn NotificationCommand>,
    pub cards: Arc<dyn CardCommand>,
}

impl HttpState {
    /// Construct state from explicit port implementations.
    pub fn new(
        notifications: Arc<dyn NotificationQuery>,
        notification_commands: Arc<dyn NotificationCommand>,
        cards: Arc<dyn CardCommand>,
    ) -> Self {
        Self {
            notifications,
            notification_commands,
            cards,
        }
    }
}
