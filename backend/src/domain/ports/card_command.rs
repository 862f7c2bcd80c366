//! Driving port for card and list mutations, consumed by the HTTP adapter.

use async_trait::async_trait;

use crate::domain::ordering::CardMove;
use crate::domain::{BoardId, CardId, Error, ListId, UserId};

/// Permission-checked mutations that feed the event pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardCommand: Send + Sync {
    /// Move a card within its list or to another list on the same board.
    async fn move_card(
        &self,
        actor_id: UserId,
        card_id: CardId,
        target_list: ListId,
        target_index: i32,
    ) -> Result<CardMove, Error>;

    /// Set or clear a card's assignee.
    async fn assign_card(
        &self,
        actor_id: UserId,
        card_id: CardId,
        assignee_id: Option<UserId>,
    ) -> Result<(), Error>;

    /// Move a list to a new position on its board.
    async fn move_list(
        &self,
        actor_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        target_index: i32,
    ) -> Result<(), Error>;

    /// Overwrite a list's card ordering with a caller-supplied permutation.
    async fn reorder_cards(
        &self,
        actor_id: UserId,
        list_id: ListId,
        pairs: Vec<(CardId, i32)>,
    ) -> Result<(), Error>;
}
