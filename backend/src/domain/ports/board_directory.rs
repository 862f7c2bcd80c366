//! Port for board and membership lookups used by the access resolver.
//!
//! The relational persistence behind this port is out of scope; the
//! resolver only needs three reads, all of which must already exclude
//! soft-deleted membership rows.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Board, BoardId, Role, TeamId, UserId};

/// Errors raised by board directory adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardDirectoryError {
    /// Store connection could not be established.
    #[error("board directory connection failed: {message}")]
    Connection { message: String },
    /// Query failed during execution.
    #[error("board directory query failed: {message}")]
    Query { message: String },
}

/// Read-side contract over the board and membership tables.
///
/// `find_board` returns soft-deleted boards as-is; callers decide how a
/// deleted board surfaces (the resolver maps it to `not_found`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardDirectory: Send + Sync {
    /// Load a board by id.
    async fn find_board(&self, board_id: BoardId) -> Result<Option<Board>, BoardDirectoryError>;

    /// Look up the explicit board membership row for `(board_id, user_id)`.
    async fn find_board_role(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Option<Role>, BoardDirectoryError>;

    /// Look up the team membership row for `(team_id, user_id)`.
    async fn find_team_role(
        &self,
        team_id: TeamId,
        user_id: UserId,
    ) -> Result<Option<Role>, BoardDirectoryError>;
}

/// In-memory directory for tests and Redis-less runs.
#[derive(Debug, Default)]
pub struct FixtureBoardDirectory {
    boards: Mutex<HashMap<BoardId, Board>>,
    board_roles: Mutex<HashMap<(BoardId, UserId), Role>>,
    team_roles: Mutex<HashMap<(TeamId, UserId), Role>>,
}

impl FixtureBoardDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a board.
    pub fn put_board(&self, board: Board) {
        self.lock_boards().insert(board.id, board);
    }

    /// Grant an explicit board role.
    pub fn put_board_role(&self, board_id: BoardId, user_id: UserId, role: Role) {
        self.lock_board_roles().insert((board_id, user_id), role);
    }

    /// Grant a team role.
    pub fn put_team_role(&self, team_id: TeamId, user_id: UserId, role: Role) {
        self.lock_team_roles().insert((team_id, user_id), role);
    }

    fn lock_boards(&self) -> std::sync::MutexGuard<'_, HashMap<BoardId, Board>> {
        self.boards
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_board_roles(&self) -> std::sync::MutexGuard<'_, HashMap<(BoardId, UserId), Role>> {
        self.board_roles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_team_roles(&self) -> std::sync::MutexGuard<'_, HashMap<(TeamId, UserId), Role>> {
        self.team_roles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl BoardDirectory for FixtureBoardDirectory {
    async fn find_board(&self, board_id: BoardId) -> Result<Option<Board>, BoardDirectoryError> {
        Ok(self.lock_boards().get(&board_id).cloned())
    }

    async fn find_board_role(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> Result<Option<Role>, BoardDirectoryError> {
        Ok(self.lock_board_roles().get(&(board_id, user_id)).copied())
    }

    async fn find_team_role(
        &self,
        team_id: TeamId,
        user_id: UserId,
    ) -> Result<Option<Role>, BoardDirectoryError> {
        Ok(self.lock_team_roles().get(&(team_id, user_id)).copied())
    }
}
