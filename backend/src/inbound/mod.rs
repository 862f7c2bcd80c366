//! Inbound adapters: HTTP handlers and the WebSocket edge.

pub mod http;
pub mod ws;
