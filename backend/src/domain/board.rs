//! Board, list and card aggregates plus membership roles.
//!
//! Soft deletion is modelled as an explicit `deleted_at` timestamp checked
//! through [`Board::is_deleted`]; every access-control and display path
//! excludes deleted boards before doing anything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BoardId, CardId, ListId, TeamId, UserId};

/// Membership role on a board or a team.
///
/// The same three-valued role is used for both membership tables; the
/// access resolver maps a *team* role onto an effective *board* role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full control, including membership and deletion.
    Owner,
    /// May mutate content (cards, lists, comments).
    Member,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Whether this role may mutate board content.
    pub const fn can_edit(self) -> bool {
        matches!(self, Self::Owner | Self::Member)
    }

    /// Whether this role may administer the board.
    pub const fn can_manage(self) -> bool {
        matches!(self, Self::Owner)
    }
}

/// Who can see a board without an explicit membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardVisibility {
    /// Only explicit board members.
    Private,
    /// Any member of the owning team.
    Team,
}

/// A board owned by exactly one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub team_id: TeamId,
    pub title: String,
    pub visibility: BoardVisibility,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Board {
    /// Whether the board has been soft-deleted and must be excluded from
    /// every access and display query.
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A list (column) of cards within a board, itself positioned by a sparse
/// order index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardList {
    pub id: ListId,
    pub board_id: BoardId,
    pub title: String,
    pub order_index: i32,
}

/// A card within a list.
///
/// `order_index` is sparse and unique within a list; fresh cards default to
/// the sentinel in [`crate::domain::ordering`] so they sort last until
/// explicitly placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub list_id: ListId,
    pub title: String,
    pub order_index: i32,
    pub assignee_id: Option<UserId>,
    pub due_at: Option<DateTime<Utc>>,
}
