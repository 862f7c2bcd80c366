//! Outbound adapters implementing domain ports against real stores.

pub mod redis;
