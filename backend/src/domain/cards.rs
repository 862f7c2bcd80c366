//! Card and list mutations: permission check, write, then event.
//!
//! Each operation resolves the caller's effective role first, applies the
//! store writes, and only then hands an event to the bus. An event is never
//! published for a write that failed, and a bus failure never rolls back a
//! write.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;

use async_trait::async_trait;

use crate::domain::access::AccessResolver;
use crate::domain::event_bus::EventBus;
use crate::domain::ordering::{CardMove, OrderManager, map_repository_error};
use crate::domain::ports::{BoardDirectory, CardCommand, CardRepository};
use crate::domain::{
    BoardId, BoardList, Card, CardId, DomainEvent, Error, EventKind, EventSubjects, ListId, UserId,
};

/// Application service for card and list mutations.
#[derive(Clone)]
pub struct CardCommandService<D, R> {
    access: AccessResolver<D>,
    orders: OrderManager<R>,
    repo: Arc<R>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl<D, R> CardCommandService<D, R> {
    /// Create a service over the given collaborators.
    pub fn new(
        access: AccessResolver<D>,
        orders: OrderManager<R>,
        repo: Arc<R>,
        bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            access,
            orders,
            repo,
            bus,
            clock,
        }
    }
}

impl<D, R> CardCommandService<D, R>
where
    D: BoardDirectory,
    R: CardRepository,
{
    async fn card_and_list(&self, card_id: CardId) -> Result<(Card, BoardList), Error> {
        let card = self
            .repo
            .find_card(card_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("card not found"))?;
        let list = self
            .repo
            .find_list(card.list_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("list not found"))?;
        Ok((card, list))
    }

    /// Move a card within its list or to another list on the same board.
    pub async fn move_card(
        &self,
        actor_id: UserId,
        card_id: CardId,
        target_list: ListId,
        target_index: i32,
    ) -> Result<CardMove, Error> {
        let (card, list) = self.card_and_list(card_id).await?;
        let board_id = list.board_id;
        self.access.require_editor(board_id, actor_id).await?;

        if target_list != card.list_id {
            let destination = self
                .repo
                .find_list(target_list)
                .await
                .map_err(map_repository_error)?
                .ok_or_else(|| Error::not_found("target list not found"))?;
            if destination.board_id != board_id {
                return Err(Error::conflict("cards cannot move across boards"));
            }
        }

        let mv = self
            .orders
            .reposition_card(card_id, target_list, target_index)
            .await?;

        let event = DomainEvent::new(
            EventKind::CardMoved,
            actor_id,
            EventSubjects {
                board_id: Some(board_id),
                list_id: Some(mv.to_list),
                card_id: Some(card_id),
                user_id: card.assignee_id,
                ..EventSubjects::default()
            },
            self.clock.utc(),
        )
        .with_change(
            "listId",
            Some(json!(mv.from_list.to_string())),
            Some(json!(mv.to_list.to_string())),
        )
        .with_change(
            "orderIndex",
            Some(json!(mv.from_index)),
            Some(json!(mv.to_index)),
        );
        self.bus.publish(event);
        Ok(mv)
    }

    /// Set or clear a card's assignee.
    pub async fn assign_card(
        &self,
        actor_id: UserId,
        card_id: CardId,
        assignee_id: Option<UserId>,
    ) -> Result<(), Error> {
        let (card, list) = self.card_and_list(card_id).await?;
        let board_id = list.board_id;
        self.access.require_editor(board_id, actor_id).await?;

        self.repo
            .update_card_assignee(card_id, assignee_id)
            .await
            .map_err(map_repository_error)?;

        let event = DomainEvent::new(
            EventKind::CardAssigned,
            actor_id,
            EventSubjects {
                board_id: Some(board_id),
                list_id: Some(card.list_id),
                card_id: Some(card_id),
                // Recipient is the new assignee; clearing notifies nobody.
                user_id: assignee_id,
                ..EventSubjects::default()
            },
            self.clock.utc(),
        )
        .with_change(
            "assigneeId",
            card.assignee_id.map(|id| json!(id.to_string())),
            assignee_id.map(|id| json!(id.to_string())),
        );
        self.bus.publish(event);
        Ok(())
    }

    /// Move a list to a new position on its board.
    pub async fn move_list(
        &self,
        actor_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        target_index: i32,
    ) -> Result<(), Error> {
        self.access.require_editor(board_id, actor_id).await?;
        let list = self
            .repo
            .find_list(list_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("list not found"))?;
        let from_index = list.order_index;

        self.orders
            .reposition_list(board_id, list_id, target_index)
            .await?;

        let event = DomainEvent::new(
            EventKind::ListUpdated,
            actor_id,
            EventSubjects {
                board_id: Some(board_id),
                list_id: Some(list_id),
                ..EventSubjects::default()
            },
            self.clock.utc(),
        )
        .with_change(
            "orderIndex",
            Some(json!(from_index)),
            Some(json!(target_index)),
        );
        self.bus.publish(event);
        Ok(())
    }

    /// Overwrite a list's card ordering with a caller-supplied permutation.
    pub async fn reorder_cards(
        &self,
        actor_id: UserId,
        list_id: ListId,
        pairs: Vec<(CardId, i32)>,
    ) -> Result<(), Error> {
        let list = self
            .repo
            .find_list(list_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("list not found"))?;
        let board_id = list.board_id;
        self.access.require_editor(board_id, actor_id).await?;

        self.orders.bulk_reorder(list_id, pairs).await?;

        let event = DomainEvent::new(
            EventKind::ListUpdated,
            actor_id,
            EventSubjects {
                board_id: Some(board_id),
                list_id: Some(list_id),
                ..EventSubjects::default()
            },
            self.clock.utc(),
        );
        self.bus.publish(event);
        Ok(())
    }
}

#[async_trait]
impl<D, R> CardCommand for CardCommandService<D, R>
where
    D: BoardDirectory + 'static,
    R: CardRepository + 'static,
{
    async fn move_card(
        &self,
        actor_id: UserId,
        card_id: CardId,
        target_list: ListId,
        target_index: i32,
    ) -> Result<CardMove, Error> {
        Self::move_card(self, actor_id, card_id, target_list, target_index).await
    }

    async fn assign_card(
        &self,
        actor_id: UserId,
        card_id: CardId,
        assignee_id: Option<UserId>,
    ) -> Result<(), Error> {
        Self::assign_card(self, actor_id, card_id, assignee_id).await
    }

    async fn move_list(
        &self,
        actor_id: UserId,
        board_id: BoardId,
        list_id: ListId,
        target_index: i32,
    ) -> Result<(), Error> {
        Self::move_list(self, actor_id, board_id, list_id, target_index).await
    }

    async fn reorder_cards(
        &self,
        actor_id: UserId,
        list_id: ListId,
        pairs: Vec<(CardId, i32)>,
    ) -> Result<(), Error> {
        Self::reorder_cards(self, actor_id, list_id, pairs).await
    }
}
