//! Port for the audit trail written by the event pipeline.
//!
//! Relational persistence of audit rows is out of scope; the fixture keeps
//! entries in memory for tests and Redis-less runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;

use crate::domain::{BoardId, CardId, TeamId, UserId};

/// Errors raised by audit log adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditLogError {
    /// Store connection could not be established.
    #[error("audit log connection failed: {message}")]
    Connection { message: String },
    /// Write failed during execution.
    #[error("audit log write failed: {message}")]
    Write { message: String },
}

/// One audit row: a flattened projection of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Dotted event label, e.g. `card.moved`.
    pub action: String,
    pub actor_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<BoardId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<CardId>,
    /// Field-level before/after snapshots.
    pub detail: Value,
    pub occurred_at: DateTime<Utc>,
}

/// Append-only audit sink.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record one audit entry.
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditLogError>;
}

/// In-memory audit log for tests and Redis-less runs.
#[derive(Debug, Default)]
pub struct FixtureAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl FixtureAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditLog for FixtureAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditLogError> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(entry);
        Ok(())
    }
}
