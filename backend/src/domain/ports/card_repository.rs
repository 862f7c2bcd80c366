//! Port over the card and list tables used by the order manager and card
//! mutations.
//!
//! The range-shift operations mirror the bulk `UPDATE ... SET order_index =
//! order_index + delta WHERE ...` statements the relational store executes;
//! adapters are expected to serialise concurrent shifts on the same
//! list's rows.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{BoardId, BoardList, Card, CardId, ListId, UserId};

/// Errors raised by card repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardRepositoryError {
    /// Store connection could not be established.
    #[error("card repository connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("card repository query failed: {message}")]
    Query { message: String },
}

/// Mapper contract over cards and lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Load a card by id.
    async fn find_card(&self, card_id: CardId) -> Result<Option<Card>, CardRepositoryError>;

    /// All cards in a list, ordered by `order_index` ascending.
    async fn list_cards(&self, list_id: ListId) -> Result<Vec<Card>, CardRepositoryError>;

    /// Shift every card in `list_id` whose index lies in
    /// `[from_idx, to_idx]` by `delta`. An empty range shifts nothing.
    async fn shift_order_indexes(
        &self,
        list_id: ListId,
        from_idx: i32,
        to_idx: i32,
        delta: i32,
    ) -> Result<(), CardRepositoryError>;

    /// Write a card's list and order index in one statement.
    async fn update_card_location(
        &self,
        card_id: CardId,
        list_id: ListId,
        order_index: i32,
    ) -> Result<(), CardRepositoryError>;

    /// Overwrite `(id, order_index)` pairs in bulk. Callers validate list
    /// membership before invoking this.
    async fn bulk_update_order_indexes(
        &self,
        pairs: Vec<(CardId, i32)>,
    ) -> Result<(), CardRepositoryError>;

    /// Set or clear a card's assignee.
    async fn update_card_assignee(
        &self,
        card_id: CardId,
        assignee: Option<UserId>,
    ) -> Result<(), CardRepositoryError>;

    /// Load a list by id.
    async fn find_list(&self, list_id: ListId) -> Result<Option<BoardList>, CardRepositoryError>;

    /// Shift every list on `board_id` whose index lies in
    /// `[from_idx, to_idx]` by `delta`.
    async fn shift_list_indexes(
        &self,
        board_id: BoardId,
        from_idx: i32,
        to_idx: i32,
        delta: i32,
    ) -> Result<(), CardRepositoryError>;

    /// Write a list's order index.
    async fn update_list_position(
        &self,
        list_id: ListId,
        order_index: i32,
    ) -> Result<(), CardRepositoryError>;
}

/// In-memory repository for tests and Redis-less runs.
///
/// Shift semantics match the relational adapter: range updates apply to the
/// snapshot of rows matching the predicate, so interleaved shifts within one
/// call cannot observe each other.
#[derive(Debug, Default)]
pub struct FixtureCardRepository {
    cards: Mutex<HashMap<CardId, Card>>,
    lists: Mutex<HashMap<ListId, BoardList>>,
}

impl FixtureCardRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a card.
    pub fn put_card(&self, card: Card) {
        self.lock_cards().insert(card.id, card);
    }

    /// Insert or replace a list.
    pub fn put_list(&self, list: BoardList) {
        self.lock_lists().insert(list.id, list);
    }

    fn lock_cards(&self) -> std::sync::MutexGuard<'_, HashMap<CardId, Card>> {
        self.cards
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_lists(&self) -> std::sync::MutexGuard<'_, HashMap<ListId, BoardList>> {
        self.lists
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CardRepository for FixtureCardRepository {
    async fn find_card(&self, card_id: CardId) -> Result<Option<Card>, CardRepositoryError> {
        Ok(self.lock_cards().get(&card_id).cloned())
    }

    async fn list_cards(&self, list_id: ListId) -> Result<Vec<Card>, CardRepositoryError> {
        let mut cards: Vec<Card> = self
            .lock_cards()
            .values()
            .filter(|card| card.list_id == list_id)
            .cloned()
            .collect();
        cards.sort_by_key(|card| card.order_index);
        Ok(cards)
    }

    async fn shift_order_indexes(
        &self,
        list_id: ListId,
        from_idx: i32,
        to_idx: i32,
        delta: i32,
    ) -> Result<(), CardRepositoryError> {
        let mut cards = self.lock_cards();
        for card in cards.values_mut() {
            if card.list_id == list_id
                && card.order_index >= from_idx
                && card.order_index <= to_idx
            {
                card.order_index += delta;
            }
        }
        Ok(())
    }

    async fn update_card_location(
        &self,
        card_id: CardId,
        list_id: ListId,
        order_index: i32,
    ) -> Result<(), CardRepositoryError> {
        if let Some(card) = self.lock_cards().get_mut(&card_id) {
            card.list_id = list_id;
            card.order_index = order_index;
        }
        Ok(())
    }

    async fn bulk_update_order_indexes(
        &self,
        pairs: Vec<(CardId, i32)>,
    ) -> Result<(), CardRepositoryError> {
        let mut cards = self.lock_cards();
        for (card_id, order_index) in pairs {
            if let Some(card) = cards.get_mut(&card_id) {
                card.order_index = order_index;
            }
        }
        Ok(())
    }

    async fn update_card_assignee(
        &self,
        card_id: CardId,
        assignee: Option<UserId>,
    ) -> Result<(), CardRepositoryError> {
        if let Some(card) = self.lock_cards().get_mut(&card_id) {
            card.assignee_id = assignee;
        }
        Ok(())
    }

    async fn find_list(&self, list_id: ListId) -> Result<Option<BoardList>, CardRepositoryError> {
        Ok(self.lock_lists().get(&list_id).cloned())
    }

    async fn shift_list_indexes(
        &self,
        board_id: BoardId,
        from_idx: i32,
        to_idx: i32,
        delta: i32,
    ) -> Result<(), CardRepositoryError> {
        let mut lists = self.lock_lists();
        for list in lists.values_mut() {
            if list.board_id == board_id
                && list.order_index >= from_idx
                && list.order_index <= to_idx
            {
                list.order_index += delta;
            }
        }
        Ok(())
    }

    async fn update_list_position(
        &self,
        list_id: ListId,
        order_index: i32,
    ) -> Result<(), CardRepositoryError> {
        if let Some(list) = self.lock_lists().get_mut(&list_id) {
            list.order_index = order_index;
        }
        Ok(())
    }
}
