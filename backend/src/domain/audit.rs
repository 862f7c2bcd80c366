//! Audit trail projection of the event stream.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::event_bus::EventHandler;
use crate::domain::ports::{AuditEntry, AuditLog, AuditLogError};
use crate::domain::{DomainEvent, Error};

fn map_audit_error(error: AuditLogError) -> Error {
    match error {
        AuditLogError::Connection { message } => {
            Error::service_unavailable(format!("audit log unavailable: {message}"))
        }
        AuditLogError::Write { message } => {
            Error::internal(format!("audit log error: {message}"))
        }
    }
}

/// Event-bus subscriber that flattens every event into an audit row.
pub struct AuditTrailWriter<L> {
    log: Arc<L>,
}

impl<L> AuditTrailWriter<L> {
    /// Create a writer over the given sink.
    pub fn new(log: Arc<L>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl<L: AuditLog + 'static> EventHandler for AuditTrailWriter<L> {
    fn name(&self) -> &'static str {
        "audit-trail"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), Error> {
        let entry = AuditEntry {
            action: event.kind.label().into(),
            actor_id: event.actor_id,
            board_id: event.subjects.board_id,
            team_id: event.subjects.team_id,
            card_id: event.subjects.card_id,
            detail: json!({ "changes": event.changes }),
            occurred_at: event.occurred_at,
        };
        self.log.record(entry).await.map_err(map_audit_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FixtureAuditLog;
    use crate::domain::{BoardId, CardId, EventKind, EventSubjects, UserId};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn events_flatten_into_audit_rows() {
        let log = Arc::new(FixtureAuditLog::new());
        let writer = AuditTrailWriter::new(Arc::clone(&log));
        let actor = UserId::random();
        let board_id = BoardId::random();
        let card_id = CardId::random();

        let event = DomainEvent::new(
            EventKind::CardMoved,
            actor,
            EventSubjects {
                board_id: Some(board_id),
                card_id: Some(card_id),
                ..EventSubjects::default()
            },
            Utc::now(),
        )
        .with_change("orderIndex", Some(json!(3)), Some(json!(0)));

        writer.handle(&event).await.expect("record entry");

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "card.moved");
        assert_eq!(entries[0].actor_id, actor);
        assert_eq!(entries[0].board_id, Some(board_id));
        assert_eq!(entries[0].card_id, Some(card_id));
        assert_eq!(entries[0].detail["changes"][0]["field"], json!("orderIndex"));
    }
}
