//! Collaboration backend: mutation pipeline, notification fan-out and
//! realtime delivery for boards, lists and cards.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;
