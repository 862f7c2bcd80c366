//! Per-connection WebSocket handler.
//!
//! Keeps WebSocket framing and heartbeats at the edge while deferring
//! application behaviour to the injected ports. The public contract pings
//! every 5s and considers a connection idle after 10s without client
//! traffic. Tests shorten these intervals to speed up feedback.
//!
//! On connect the session is attached to the caller's personal notification
//! queue; board and team topics are joined through explicit `subscribe` and
//! `enterBoard` frames. On disconnect the connection is dropped from every
//! topic, but the presence registry is left to its sliding expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::time;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{PresenceCommand, board_presence_topic, board_topic, user_queue};
use crate::domain::{BoardId, UserId};
use crate::inbound::ws::hub::BroadcastHub;
use crate::inbound::ws::messages::{ClientFrame, ErrorFrame, is_subscribable};

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) async fn handle_ws_session(
    hub: Arc<BroadcastHub>,
    presence: Arc<dyn PresenceCommand>,
    user_id: UserId,
    session: Session,
    stream: MessageStream,
) {
    WsSession::new(hub, presence, user_id)
        .run(session, stream)
        .await;
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    Network(Closed),
}

struct WsSession {
    hub: Arc<BroadcastHub>,
    presence: Arc<dyn PresenceCommand>,
    user_id: UserId,
    conn_id: Uuid,
}

impl WsSession {
    fn new(hub: Arc<BroadcastHub>, presence: Arc<dyn PresenceCommand>, user_id: UserId) -> Self {
        Self {
            hub,
            presence,
            user_id,
            conn_id: Uuid::new_v4(),
        }
    }

    async fn run(&self, mut session: Session, mut stream: MessageStream) {
        self.hub
            .subscribe(self.conn_id, user_queue(self.user_id), session.clone())
            .await;

        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    self.handle_heartbeat_tick(&mut session, &last_heartbeat).await
                }
                message = stream.recv() => {
                    self.handle_stream_message(&mut session, &mut last_heartbeat, message)
                        .await
                }
            };

            if let Err(error) = result {
                self.log_shutdown_reason(&error);
                self.hub.drop_connection(self.conn_id).await;
                if let Some(reason) = close_reason_for(&error) {
                    let _ = session.close(Some(reason)).await;
                }
                return;
            }
        }
    }

    async fn handle_heartbeat_tick(
        &self,
        session: &mut Session,
        last_heartbeat: &Instant,
    ) -> Result<(), SessionError> {
        if Instant::now().duration_since(*last_heartbeat) > CLIENT_TIMEOUT {
            return Err(SessionError::HeartbeatTimeout);
        }

        session.ping(b"").await.map_err(SessionError::Network)
    }

    async fn handle_stream_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), SessionError> {
        let Some(message) = message else {
            return Err(SessionError::StreamClosed);
        };

        match message {
            Ok(message) => self.handle_message(session, last_heartbeat, message).await,
            Err(error) => Err(SessionError::Protocol(error)),
        }
    }

    async fn handle_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Message,
    ) -> Result<(), SessionError> {
        match message {
            Message::Ping(payload) => {
                *last_heartbeat = Instant::now();
                session
                    .pong(&payload)
                    .await
                    .map_err(SessionError::Network)?;
                Ok(())
            }
            Message::Text(text) => {
                *last_heartbeat = Instant::now();
                self.handle_text_message(session, text.as_ref()).await
            }
            Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => {
                *last_heartbeat = Instant::now();
                Ok(())
            }
            Message::Close(reason) => Err(SessionError::ClientClosed(reason)),
        }
    }

    async fn handle_text_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<(), SessionError> {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(error = %error, "rejected malformed WebSocket frame");
                return self.send_error(session, "malformed frame").await;
            }
        };

        match frame {
            ClientFrame::Subscribe { topic } => {
                if is_subscribable(&topic) {
                    self.hub
                        .subscribe(self.conn_id, topic, session.clone())
                        .await;
                    Ok(())
                } else {
                    self.send_error(session, "topic not subscribable").await
                }
            }
            ClientFrame::Unsubscribe { topic } => {
                self.hub.unsubscribe(self.conn_id, &topic).await;
                Ok(())
            }
            ClientFrame::EnterBoard { board_id } => self.enter_board(session, board_id).await,
            ClientFrame::LeaveBoard { board_id } => self.leave_board(session, board_id).await,
        }
    }

    async fn enter_board(
        &self,
        session: &mut Session,
        board_id: BoardId,
    ) -> Result<(), SessionError> {
        // Attach the topics before mutating presence so the snapshot
        // triggered by our own entry reaches this connection too.
        self.hub
            .subscribe(self.conn_id, board_topic(board_id), session.clone())
            .await;
        self.hub
            .subscribe(self.conn_id, board_presence_topic(board_id), session.clone())
            .await;
        if let Err(error) = self.presence.enter(board_id, self.user_id).await {
            warn!(%board_id, %error, "presence enter failed");
            return self.send_error(session, "presence update failed").await;
        }
        Ok(())
    }

    async fn leave_board(
        &self,
        session: &mut Session,
        board_id: BoardId,
    ) -> Result<(), SessionError> {
        if let Err(error) = self.presence.leave(board_id, self.user_id).await {
            warn!(%board_id, %error, "presence leave failed");
            return self.send_error(session, "presence update failed").await;
        }
        self.hub
            .unsubscribe(self.conn_id, &board_topic(board_id))
            .await;
        self.hub
            .unsubscribe(self.conn_id, &board_presence_topic(board_id))
            .await;
        Ok(())
    }

    async fn send_error(&self, session: &mut Session, message: &str) -> Result<(), SessionError> {
        let frame = ErrorFrame { error: message };
        match serde_json::to_string(&frame) {
            Ok(body) => session.text(body).await.map_err(SessionError::Network),
            Err(error) => {
                warn!(error = %error, "failed to serialise WebSocket error frame");
                Ok(())
            }
        }
    }

    fn log_shutdown_reason(&self, error: &SessionError) {
        match error {
            SessionError::HeartbeatTimeout => {
                warn!("WebSocket heartbeat timeout; closing connection");
            }
            SessionError::Protocol(error) => {
                warn!(error = %error, "WebSocket protocol error");
            }
            SessionError::Network(error) => {
                warn!(error = %error, "WebSocket send failed; closing connection");
            }
            SessionError::ClientClosed(_) | SessionError::StreamClosed => {}
        }
    }
}

fn close_reason_for(error: &SessionError) -> Option<CloseReason> {
    match error {
        SessionError::HeartbeatTimeout => Some(CloseReason {
            code: CloseCode::Normal,
            description: Some("heartbeat timeout".to_owned()),
        }),
        SessionError::Protocol(_) => Some(CloseReason {
            code: CloseCode::Protocol,
            description: Some("protocol error".to_owned()),
        }),
        SessionError::ClientClosed(reason) => reason.clone(),
        SessionError::StreamClosed | SessionError::Network(_) => None,
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
