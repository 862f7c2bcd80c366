//! WebSocket inbound adapter bridging the event pipeline to clients.
//!
//! Responsibilities:
//! - upgrade `/ws` requests and spawn the per-connection session loop
//! - maintain the topic registry in [`hub::BroadcastHub`]
//! - route domain events onto topics via [`broadcast::RealtimeBroadcaster`]

use actix_web::web::{self, Payload};
use actix_web::{HttpRequest, HttpResponse, get};
use serde::Deserialize;
use tracing::error;

use crate::domain::UserId;

pub mod broadcast;
pub mod hub;
pub mod messages;
mod session;
pub mod state;

pub use broadcast::RealtimeBroadcaster;
pub use hub::BroadcastHub;
pub use state::WsState;

/// Identity for the connection. Authentication happens upstream; the
/// gateway rewrites the query string with the verified caller id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub user_id: UserId,
}

/// Handle WebSocket upgrade for the `/ws` endpoint.
#[get("/ws")]
pub async fn ws_entry(
    state: web::Data<WsState>,
    query: web::Query<WsQuery>,
    req: HttpRequest,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let (response, session, message_stream) = actix_ws::handle(&req, stream).map_err(|e| {
        error!(error = %e, "WebSocket upgrade failed");
        actix_web::error::ErrorInternalServerError("WebSocket upgrade failed")
    })?;

    let state = state.into_inner();
    actix_web::rt::spawn(session::handle_ws_session(
        state.hub.clone(),
        state.presence.clone(),
        query.into_inner().user_id,
        session,
        message_stream,
    ));

    Ok(response)
}
