use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Game, MoveHistoryItem, MoveRecord};
use crate::repositories::errors::game_repository_errors::GameRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Storage contract shared by the Postgres and in-memory backends.
///
/// Every method is atomic on its own. `claim_next_game` and `persist_move`
/// are compound operations whose steps commit or abort together.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Game, GameRepositoryError>;

    /// Ongoing games, oldest first.
    async fn list_ongoing(&self) -> Result<Vec<Game>, GameRepositoryError>;

    /// Overwrite the stored game only if its `state_version` still equals
    /// `expected_version`.
    async fn save_if_version(
        &self,
        game: &Game,
        expected_version: i64,
    ) -> Result<(), GameRepositoryError>;

    /// Store a new game. Inserting an id that already exists is a no-op.
    async fn insert(&self, game: &Game) -> Result<(), GameRepositoryError>;

    /// True if any game is waiting or ongoing.
    async fn has_active_games(&self) -> Result<bool, GameRepositoryError>;

    /// Add `count` waiting games at the initial position.
    async fn create_waiting_batch(&self, count: usize) -> Result<(), GameRepositoryError>;

    /// Claim the oldest non-terminal game `client_id` has never been
    /// assigned to, moving it from waiting to ongoing if needed.
    ///
    /// Fails with `NoGamesAvailable` when nothing is eligible or the chosen
    /// game was raced away; callers restart the whole search.
    async fn claim_next_game(
        &self,
        client_id: Uuid,
    ) -> Result<(Game, Vec<MoveHistoryItem>), GameRepositoryError>;

    async fn get_game_with_history(
        &self,
        id: Uuid,
    ) -> Result<(Game, Vec<MoveHistoryItem>), GameRepositoryError>;

    /// Commit one client's move: check the assignment and its `has_moved`
    /// flag, append the history row, compare-and-swap the game on
    /// `successor.state_version - 1`, and mark the client as moved.
    ///
    /// Returns the full history, ordered by ply.
    async fn persist_move(
        &self,
        game_id: Uuid,
        client_id: Uuid,
        successor: &Game,
        record: &MoveRecord,
        ply: i32,
    ) -> Result<Vec<MoveHistoryItem>, GameRepositoryError>;
}
