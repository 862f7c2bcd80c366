//! Backend entry-point: wires the event pipeline, REST endpoints and the
//! WebSocket entry.

use actix_web::web;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = ServerConfig::from_env()?;
    let health_state = web::Data::new(HealthState::new());

    let server = create_server(config, health_state.clone()).await?;
    health_state.mark_ready();
    server.await
}
