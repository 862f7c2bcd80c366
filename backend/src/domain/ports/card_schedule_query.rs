//! Port for the deadline scanner's read path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Card, CardId};

/// Errors raised by schedule query adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardScheduleQueryError {
    /// Store connection could not be established.
    #[error("card schedule connection failed: {message}")]
    Connection { message: String },
    /// Query failed during execution.
    #[error("card schedule query failed: {message}")]
    Query { message: String },
}

/// Read contract for cards approaching their due time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardScheduleQuery: Send + Sync {
    /// Cards whose due time falls within `[start, end]`, soft-deleted
    /// boards and lists excluded by the adapter.
    async fn find_cards_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Card>, CardScheduleQueryError>;
}

/// In-memory schedule for tests.
#[derive(Debug, Default)]
pub struct FixtureCardScheduleQuery {
    cards: Mutex<HashMap<CardId, Card>>,
}

impl FixtureCardScheduleQuery {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a card.
    pub fn put_card(&self, card: Card) {
        self.lock_cards().insert(card.id, card);
    }

    fn lock_cards(&self) -> std::sync::MutexGuard<'_, HashMap<CardId, Card>> {
        self.cards
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CardScheduleQuery for FixtureCardScheduleQuery {
    async fn find_cards_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Card>, CardScheduleQueryError> {
        let mut due: Vec<Card> = self
            .lock_cards()
            .values()
            .filter(|card| {
                card.due_at
                    .is_some_and(|due_at| due_at >= start && due_at <= end)
            })
            .cloned()
            .collect();
        due.sort_by_key(|card| card.due_at);
        Ok(due)
    }
}
