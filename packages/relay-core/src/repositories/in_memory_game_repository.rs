use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Assignment, Game, GameStatus, MoveHistoryItem, MoveRecord};
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::game_repository::GameRepository;

#[derive(Default)]
struct State {
    games: HashMap<Uuid, Game>,
    // Insertion order, so ties on created_at resolve first-in first-out.
    order: Vec<Uuid>,
    history: HashMap<Uuid, Vec<MoveHistoryItem>>,
    assignments: HashMap<(Uuid, Uuid), Assignment>,
}

impl State {
    fn insert(&mut self, game: Game) {
        if self.games.contains_key(&game.id) {
            return;
        }
        self.order.push(game.id);
        self.history.insert(game.id, Vec::new());
        self.games.insert(game.id, game);
    }

    fn history_of(&self, game_id: Uuid) -> Vec<MoveHistoryItem> {
        self.history.get(&game_id).cloned().unwrap_or_default()
    }
}

/// Single-process store. Each operation holds one lock for its whole
/// duration, which gives the same atomicity as a database transaction.
#[derive(Default)]
pub struct InMemoryGameRepository {
    state: Mutex<State>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with `count` ongoing games.
    pub fn with_seed(count: usize) -> Self {
        let now = Utc::now();
        let mut state = State::default();
        for _ in 0..count {
            state.insert(Game::new(Uuid::new_v4(), now));
        }
        Self {
            state: Mutex::new(state),
        }
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Game, GameRepositoryError> {
        let state = self.state.lock().await;
        state
            .games
            .get(&id)
            .cloned()
            .ok_or(GameRepositoryError::NotFound)
    }

    async fn list_ongoing(&self) -> Result<Vec<Game>, GameRepositoryError> {
        let state = self.state.lock().await;
        let mut games: Vec<Game> = state
            .order
            .iter()
            .filter_map(|id| state.games.get(id))
            .filter(|game| game.status == GameStatus::Ongoing)
            .cloned()
            .collect();
        games.sort_by_key(|game| game.created_at);
        Ok(games)
    }

    async fn save_if_version(
        &self,
        game: &Game,
        expected_version: i64,
    ) -> Result<(), GameRepositoryError> {
        let mut state = self.state.lock().await;
        let current = state
            .games
            .get_mut(&game.id)
            .ok_or(GameRepositoryError::NotFound)?;
        if current.state_version != expected_version {
            return Err(GameRepositoryError::VersionConflict);
        }
        *current = game.clone();
        Ok(())
    }

    async fn insert(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let mut state = self.state.lock().await;
        state.insert(game.clone());
        Ok(())
    }

    async fn has_active_games(&self) -> Result<bool, GameRepositoryError> {
        let state = self.state.lock().await;
        Ok(state.games.values().any(|game| !game.is_terminal()))
    }

    async fn create_waiting_batch(&self, count: usize) -> Result<(), GameRepositoryError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        for _ in 0..count {
            state.insert(Game::new_waiting(Uuid::new_v4(), now));
        }
        info!("Created {} waiting games", count);
        Ok(())
    }

    async fn claim_next_game(
        &self,
        client_id: Uuid,
    ) -> Result<(Game, Vec<MoveHistoryItem>), GameRepositoryError> {
        let mut state = self.state.lock().await;

        let selected = state
            .order
            .iter()
            .filter_map(|id| state.games.get(id))
            .filter(|game| !game.is_terminal())
            .filter(|game| !state.assignments.contains_key(&(game.id, client_id)))
            .min_by_key(|game| game.created_at)
            .map(|game| game.id)
            .ok_or(GameRepositoryError::NoGamesAvailable)?;

        let now = Utc::now();
        state
            .assignments
            .insert((selected, client_id), Assignment::new(selected, client_id, now));

        let game = state
            .games
            .get_mut(&selected)
            .ok_or(GameRepositoryError::NotFound)?;
        if game.status == GameStatus::Waiting {
            game.status = GameStatus::Ongoing;
            game.updated_at = now;
        }
        let game = game.clone();

        debug!("Client {} claimed game {}", client_id, selected);
        let history = state.history_of(selected);
        Ok((game, history))
    }

    async fn get_game_with_history(
        &self,
        id: Uuid,
    ) -> Result<(Game, Vec<MoveHistoryItem>), GameRepositoryError> {
        let state = self.state.lock().await;
        let game = state
            .games
            .get(&id)
            .cloned()
            .ok_or(GameRepositoryError::NotFound)?;
        Ok((game, state.history_of(id)))
    }

    async fn persist_move(
        &self,
        game_id: Uuid,
        client_id: Uuid,
        successor: &Game,
        record: &MoveRecord,
        ply: i32,
    ) -> Result<Vec<MoveHistoryItem>, GameRepositoryError> {
        let mut state = self.state.lock().await;

        // All checks happen before the first write.
        match state.assignments.get(&(game_id, client_id)) {
            None => return Err(GameRepositoryError::NotAssigned),
            Some(assignment) if assignment.has_moved => {
                return Err(GameRepositoryError::AlreadyMoved)
            }
            Some(_) => {}
        }
        let current = state
            .games
            .get(&game_id)
            .ok_or(GameRepositoryError::NotFound)?;
        if current.state_version != successor.state_version - 1 {
            return Err(GameRepositoryError::VersionConflict);
        }
        let item = record
            .to_history_item(ply, client_id)
            .ok_or_else(|| GameRepositoryError::InvalidMoveRecord(record.uci.clone()))?;

        state.history.entry(game_id).or_default().push(item);
        state.games.insert(game_id, successor.clone());
        if let Some(assignment) = state.assignments.get_mut(&(game_id, client_id)) {
            assignment.has_moved = true;
        }

        Ok(state.history_of(game_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chess_service::ChessService;
    use std::sync::Arc;

    async fn commit(
        repository: &InMemoryGameRepository,
        game: &Game,
        client_id: Uuid,
        uci: &str,
    ) -> Result<Vec<MoveHistoryItem>, GameRepositoryError> {
        let (next, record) = ChessService::new()
            .apply_move(game, uci, Utc::now())
            .unwrap();
        repository
            .persist_move(game.id, client_id, &next, &record, next.ply_count - 1)
            .await
    }

    #[tokio::test]
    async fn test_with_seed_creates_ongoing_games() {
        let repository = InMemoryGameRepository::with_seed(3);

        let games = repository.list_ongoing().await.unwrap();

        assert_eq!(games.len(), 3);
        assert!(repository.has_active_games().await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_store_has_no_active_games() {
        let repository = InMemoryGameRepository::new();

        assert!(!repository.has_active_games().await.unwrap());
        assert_eq!(
            repository.claim_next_game(Uuid::new_v4()).await.unwrap_err(),
            GameRepositoryError::NoGamesAvailable
        );
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let repository = InMemoryGameRepository::new();

        let result = repository.get_by_id(Uuid::new_v4()).await;

        assert_eq!(result.unwrap_err(), GameRepositoryError::NotFound);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let repository = InMemoryGameRepository::new();
        let game = Game::new(Uuid::new_v4(), Utc::now());

        repository.insert(&game).await.unwrap();
        let mut changed = game.clone();
        changed.ply_count = 7;
        repository.insert(&changed).await.unwrap();

        assert_eq!(repository.get_by_id(game.id).await.unwrap(), game);
        assert_eq!(repository.list_ongoing().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_activates_waiting_game() {
        let repository = InMemoryGameRepository::new();
        repository.create_waiting_batch(1).await.unwrap();

        let (game, history) = repository.claim_next_game(Uuid::new_v4()).await.unwrap();

        assert_eq!(game.status, GameStatus::Ongoing);
        assert!(history.is_empty());
        assert_eq!(repository.get_by_id(game.id).await.unwrap().status, GameStatus::Ongoing);
    }

    #[tokio::test]
    async fn test_claim_prefers_oldest_game() {
        let repository = InMemoryGameRepository::new();
        let now = Utc::now();
        let newer = Game::new(Uuid::new_v4(), now);
        let older = Game::new(Uuid::new_v4(), now - chrono::Duration::minutes(5));
        repository.insert(&newer).await.unwrap();
        repository.insert(&older).await.unwrap();

        let (claimed, _) = repository.claim_next_game(Uuid::new_v4()).await.unwrap();

        assert_eq!(claimed.id, older.id);
    }

    #[tokio::test]
    async fn test_claim_skips_terminal_games() {
        let repository = InMemoryGameRepository::new();
        let mut finished = Game::new(Uuid::new_v4(), Utc::now() - chrono::Duration::hours(1));
        finished.status = GameStatus::Stalemate;
        repository.insert(&finished).await.unwrap();
        let open = Game::new(Uuid::new_v4(), Utc::now());
        repository.insert(&open).await.unwrap();

        let (claimed, _) = repository.claim_next_game(Uuid::new_v4()).await.unwrap();

        assert_eq!(claimed.id, open.id);
    }

    #[tokio::test]
    async fn test_save_if_version() {
        let repository = InMemoryGameRepository::with_seed(1);
        let game = repository.list_ongoing().await.unwrap().remove(0);
        let mut updated = game.clone();
        updated.state_version = 1;

        repository.save_if_version(&updated, 0).await.unwrap();
        let stale = repository.save_if_version(&updated, 0).await;

        assert_eq!(stale.unwrap_err(), GameRepositoryError::VersionConflict);
        assert_eq!(repository.get_by_id(game.id).await.unwrap().state_version, 1);
    }

    #[tokio::test]
    async fn test_persist_move_failure_leaves_no_trace() {
        let repository = InMemoryGameRepository::with_seed(1);
        let mover = Uuid::new_v4();
        let (game, _) = repository.claim_next_game(mover).await.unwrap();
        let other = Uuid::new_v4();
        repository.claim_next_game(other).await.unwrap();
        commit(&repository, &game, other, "e2e4").await.unwrap();

        // Computed from the stale version 0.
        let result = commit(&repository, &game, mover, "d2d4").await;

        assert_eq!(result.unwrap_err(), GameRepositoryError::VersionConflict);
        let (stored, history) = repository.get_game_with_history(game.id).await.unwrap();
        assert_eq!(stored.state_version, 1);
        assert_eq!(history.len(), 1);

        // The conflict did not consume the client's move.
        let history = commit(&repository, &stored, mover, "e7e5").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].client_id, mover);
        assert_eq!(history[1].ply, 1);
    }

    #[tokio::test]
    async fn test_persist_move_rejects_malformed_record() {
        let repository = InMemoryGameRepository::with_seed(1);
        let client_id = Uuid::new_v4();
        let (game, _) = repository.claim_next_game(client_id).await.unwrap();
        let (next, mut record) = ChessService::new()
            .apply_move(&game, "e2e4", Utc::now())
            .unwrap();
        record.uci = "e2".to_string();

        let result = repository
            .persist_move(game.id, client_id, &next, &record, 0)
            .await;

        assert_eq!(
            result.unwrap_err(),
            GameRepositoryError::InvalidMoveRecord("e2".to_string())
        );
        let (stored, history) = repository.get_game_with_history(game.id).await.unwrap();
        assert_eq!(stored.state_version, 0);
        assert!(history.is_empty());
        // The client keeps its move.
        assert!(commit(&repository, &game, client_id, "e2e4").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_on_same_version() {
        let repository = Arc::new(InMemoryGameRepository::with_seed(1));
        let chess = ChessService::new();
        let mut game = None;
        let mut commits = Vec::new();
        for uci in ["e2e4", "d2d4", "c2c4", "g1f3", "b1c3", "f2f4"] {
            let client_id = Uuid::new_v4();
            let (claimed, _) = repository.claim_next_game(client_id).await.unwrap();
            let (next, record) = chess.apply_move(&claimed, uci, Utc::now()).unwrap();
            game = Some(claimed);
            commits.push((client_id, next, record));
        }
        let game_id = game.unwrap().id;

        let handles: Vec<_> = commits
            .into_iter()
            .map(|(client_id, next, record)| {
                let repository = repository.clone();
                tokio::spawn(async move {
                    repository
                        .persist_move(game_id, client_id, &next, &record, 0)
                        .await
                })
            })
            .collect();
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter(|r| r.is_err())
            .all(|r| *r == Err(GameRepositoryError::VersionConflict)));
        let (stored, history) = repository.get_game_with_history(game_id).await.unwrap();
        assert_eq!(stored.state_version, 1);
        assert_eq!(history.len(), 1);
    }
}
