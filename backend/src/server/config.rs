//! Server configuration from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::deadlines::SCAN_INTERVAL;

/// Runtime configuration for the server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// When absent the process runs entirely on in-memory fixtures, which
    /// keeps local development and integration tests Redis-free.
    pub redis_url: Option<String>,
    pub scan_interval: Duration,
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to local
    /// defaults.
    pub fn from_env() -> std::io::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".into())
            .parse()
            .map_err(|e| std::io::Error::other(format!("invalid BIND_ADDR: {e}")))?;
        let redis_url = std::env::var("REDIS_URL").ok();
        let scan_interval = match std::env::var("DEADLINE_SCAN_INTERVAL_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|e| {
                    std::io::Error::other(format!("invalid DEADLINE_SCAN_INTERVAL_SECS: {e}"))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => SCAN_INTERVAL,
        };
        Ok(Self {
            bind_addr,
            redis_url,
            scan_interval,
        })
    }
}
