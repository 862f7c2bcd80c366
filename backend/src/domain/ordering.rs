//! Sparse order index maintenance for cards and lists.
//!
//! Indices are sparse integers unique within their list (or board, for
//! lists). Repositioning closes the gap the moved item leaves behind and
//! opens one at the destination with ranged shift updates, so untouched
//! items keep their relative order and no collisions remain. Moving an item
//! onto its own position shifts an empty range and is naturally a no-op.
//!
//! There is no renumbering or compaction routine; under sustained
//! reordering index magnitude grows without bound. That open question is
//! carried over deliberately, see DESIGN.md.

use std::sync::Arc;

use crate::domain::ports::{CardRepository, CardRepositoryError};
use crate::domain::{BoardId, Card, CardId, Error, ListId};

/// Order index given to freshly inserted cards and lists so they sort last
/// until explicitly placed.
pub const NEW_ITEM_ORDER_INDEX: i32 = 9999;

/// Outcome of a card reposition, used to build the `card.moved` event and
/// echoed back to the HTTP caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMove {
    pub card_id: CardId,
    pub from_list: ListId,
    pub from_index: i32,
    pub to_list: ListId,
    pub to_index: i32,
}

/// Recomputes sparse positions when cards or lists move.
#[derive(Clone)]
pub struct OrderManager<R> {
    repo: Arc<R>,
}

impl<R> OrderManager<R> {
    /// Create a manager over the given repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

pub(crate) fn map_repository_error(error: CardRepositoryError) -> Error {
    match error {
        CardRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("card repository unavailable: {message}"))
        }
        CardRepositoryError::Query { message } => {
            Error::internal(format!("card repository error: {message}"))
        }
    }
}

impl<R: CardRepository> OrderManager<R> {
    /// Move a card to `target_index` in `target_list`, shifting neighbours
    /// so every other card keeps its relative order.
    pub async fn reposition_card(
        &self,
        card_id: CardId,
        target_list: ListId,
        target_index: i32,
    ) -> Result<CardMove, Error> {
        if target_index < 0 {
            return Err(Error::invalid_request("orderIndex must not be negative"));
        }
        let card = self
            .repo
            .find_card(card_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("card not found"))?;

        let old_list = card.list_id;
        let old = card.order_index;
        let new = target_index;

        if old_list == target_list {
            // Items between the two positions slide towards the vacated slot.
            if old < new {
                self.repo
                    .shift_order_indexes(old_list, old + 1, new, -1)
                    .await
                    .map_err(map_repository_error)?;
            } else if old > new {
                self.repo
                    .shift_order_indexes(old_list, new, old - 1, 1)
                    .await
                    .map_err(map_repository_error)?;
            }
        } else {
            // Close the gap in the source list, open one in the destination.
            self.repo
                .shift_order_indexes(old_list, old + 1, i32::MAX, -1)
                .await
                .map_err(map_repository_error)?;
            self.repo
                .shift_order_indexes(target_list, new, i32::MAX, 1)
                .await
                .map_err(map_repository_error)?;
        }

        self.repo
            .update_card_location(card_id, target_list, new)
            .await
            .map_err(map_repository_error)?;

        Ok(CardMove {
            card_id,
            from_list: old_list,
            from_index: old,
            to_list: target_list,
            to_index: new,
        })
    }

    /// Move a list to `target_index` on its board.
    pub async fn reposition_list(
        &self,
        board_id: BoardId,
        list_id: ListId,
        target_index: i32,
    ) -> Result<(), Error> {
        if target_index < 0 {
            return Err(Error::invalid_request("orderIndex must not be negative"));
        }
        let list = self
            .repo
            .find_list(list_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("list not found"))?;
        if list.board_id != board_id {
            return Err(Error::conflict("list does not belong to this board"));
        }

        let old = list.order_index;
        let new = target_index;
        if old < new {
            self.repo
                .shift_list_indexes(board_id, old + 1, new, -1)
                .await
                .map_err(map_repository_error)?;
        } else if old > new {
            self.repo
                .shift_list_indexes(board_id, new, old - 1, 1)
                .await
                .map_err(map_repository_error)?;
        }
        self.repo
            .update_list_position(list_id, new)
            .await
            .map_err(map_repository_error)
    }

    /// Overwrite `(id, order_index)` pairs for an entire list, trusted as a
    /// permutation supplied by the caller. Pairs referencing cards outside
    /// the list are rejected rather than silently corrected.
    pub async fn bulk_reorder(
        &self,
        list_id: ListId,
        pairs: Vec<(CardId, i32)>,
    ) -> Result<(), Error> {
        let members: Vec<Card> = self
            .repo
            .list_cards(list_id)
            .await
            .map_err(map_repository_error)?;
        for (card_id, _) in &pairs {
            if !members.iter().any(|card| card.id == *card_id) {
                return Err(Error::conflict(format!(
                    "card {card_id} is not in the reordered list"
                )));
            }
        }
        self.repo
            .bulk_update_order_indexes(pairs)
            .await
            .map_err(map_repository_error)
    }
}
