//! Layered, visibility-dependent access resolution.
//!
//! A caller's effective role on a board is computed from two independent
//! membership tables and the board's visibility. Precedence is strict and
//! load-bearing for every mutation in the system:
//!
//! 1. an explicit board membership row always wins, even over a stronger
//!    team role, because it represents a deliberate per-board grant;
//! 2. without an explicit row, a `PRIVATE` board grants nothing;
//! 3. on a `TEAM` board, team `VIEWER` maps to board `VIEWER` and any other
//!    team role maps to board `MEMBER` — team ownership does not imply
//!    board ownership.

use std::sync::Arc;

use crate::domain::ports::{BoardDirectory, BoardDirectoryError};
use crate::domain::{Board, BoardId, BoardVisibility, Error, Role, UserId};

/// Computes effective roles and enforces the three permission tiers.
#[derive(Clone)]
pub struct AccessResolver<D> {
    directory: Arc<D>,
}

impl<D> AccessResolver<D> {
    /// Create a resolver over the given directory.
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }
}

fn map_directory_error(error: BoardDirectoryError) -> Error {
    match error {
        BoardDirectoryError::Connection { message } => {
            Error::service_unavailable(format!("board directory unavailable: {message}"))
        }
        BoardDirectoryError::Query { message } => {
            Error::internal(format!("board directory error: {message}"))
        }
    }
}

impl<D: BoardDirectory> AccessResolver<D> {
    /// Load a board, treating soft-deleted boards as missing.
    pub async fn live_board(&self, board_id: BoardId) -> Result<Board, Error> {
        let board = self
            .directory
            .find_board(board_id)
            .await
            .map_err(map_directory_error)?;
        match board {
            Some(board) if !board.is_deleted() => Ok(board),
            _ => Err(Error::not_found("board not found")),
        }
    }

    /// The caller's effective role on the board, or `None` when the board
    /// grants them nothing.
    pub async fn effective_role(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Option<Role>, Error> {
        let board = self.live_board(board_id).await?;

        if let Some(role) = self
            .directory
            .find_board_role(board_id, user_id)
            .await
            .map_err(map_directory_error)?
        {
            return Ok(Some(role));
        }

        if board.visibility == BoardVisibility::Private {
            return Ok(None);
        }

        let team_role = self
            .directory
            .find_team_role(board.team_id, user_id)
            .await
            .map_err(map_directory_error)?;
        Ok(match team_role {
            Some(Role::Viewer) => Some(Role::Viewer),
            Some(_) => Some(Role::Member),
            None => None,
        })
    }

    /// Require any role at all (read access).
    pub async fn require_viewer(&self, board_id: BoardId, user_id: UserId) -> Result<Role, Error> {
        match self.effective_role(board_id, user_id).await? {
            Some(role) => Ok(role),
            None => Err(Error::forbidden("no access to this board")),
        }
    }

    /// Require a role that may mutate board content.
    pub async fn require_editor(&self, board_id: BoardId, user_id: UserId) -> Result<Role, Error> {
        let role = self.require_viewer(board_id, user_id).await?;
        if role.can_edit() {
            Ok(role)
        } else {
            Err(Error::forbidden("viewers cannot modify this board"))
        }
    }

    /// Require board ownership.
    pub async fn require_manager(&self, board_id: BoardId, user_id: UserId) -> Result<Role, Error> {
        let role = self.require_viewer(board_id, user_id).await?;
        if role.can_manage() {
            Ok(role)
        } else {
            Err(Error::forbidden("only the board owner may do this"))
        }
    }
}
