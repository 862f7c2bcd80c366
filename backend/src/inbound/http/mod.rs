//! HTTP inbound adapter.
//!
//! Handlers depend on domain ports through [`state::HttpState`] and map
//! domain errors to JSON responses in [`error`].

pub mod cards;
pub mod error;
pub mod health;
pub mod identity;
pub mod notifications;
pub mod state;

pub use error::ApiResult;
pub use health::HealthState;
pub use state::HttpState;
