use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{Game, MoveHistoryItem},
    repositories::{
        errors::game_repository_errors::GameRepositoryError, game_repository::GameRepository,
    },
    services::{errors::game_service_errors::GameServiceError, rate_limiter::RateLimiter},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignResult {
    pub game: Game,
    pub assignment_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

/// Read paths that do not go through matchmaking.
#[derive(Clone)]
pub struct GameService {
    repository: Arc<dyn GameRepository + Send + Sync>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl GameService {
    pub fn new(
        repository: Arc<dyn GameRepository + Send + Sync>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        GameService {
            repository,
            rate_limiter,
        }
    }

    /// Point the caller at the oldest ongoing game. No assignment row is
    /// written, so this grants no right to move.
    pub async fn assign(&self, ip: &str, token: &str) -> Result<AssignResult, GameServiceError> {
        self.check_rate(ip, token)?;

        let game = self
            .repository
            .list_ongoing()
            .await?
            .into_iter()
            .next()
            .ok_or(GameRepositoryError::NoGamesAvailable)?;

        Ok(AssignResult {
            game,
            assignment_id: Uuid::new_v4(),
            assigned_at: Utc::now(),
        })
    }

    pub async fn get_game(&self, ip: &str, token: &str, id: Uuid) -> Result<Game, GameServiceError> {
        self.check_rate(ip, token)?;
        self.repository
            .get_by_id(id)
            .await
            .map_err(GameServiceError::from)
    }

    pub async fn get_game_with_history(
        &self,
        ip: &str,
        token: &str,
        id: Uuid,
    ) -> Result<(Game, Vec<MoveHistoryItem>), GameServiceError> {
        self.check_rate(ip, token)?;
        self.repository
            .get_game_with_history(id)
            .await
            .map_err(GameServiceError::from)
    }

    fn check_rate(&self, ip: &str, token: &str) -> Result<(), GameServiceError> {
        if self.rate_limiter.allow(ip, token) {
            Ok(())
        } else {
            Err(GameServiceError::RateLimited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::game_repository::MockGameRepository;
    use crate::repositories::in_memory_game_repository::InMemoryGameRepository;
    use crate::services::errors::ErrorKind;
    use crate::services::rate_limiter::{tests::AlwaysDeny, AlwaysAllow};

    #[tokio::test]
    async fn test_assign_returns_oldest_ongoing_game() {
        let repository = Arc::new(InMemoryGameRepository::new());
        let now = Utc::now();
        let older = Game::new(Uuid::new_v4(), now - chrono::Duration::minutes(1));
        repository.insert(&Game::new(Uuid::new_v4(), now)).await.unwrap();
        repository.insert(&older).await.unwrap();
        let service = GameService::new(repository, Arc::new(AlwaysAllow));

        let first = service.assign("ip", "").await.unwrap();
        let second = service.assign("ip", "").await.unwrap();

        assert_eq!(first.game.id, older.id);
        assert_eq!(second.game.id, older.id);
        assert_ne!(first.assignment_id, second.assignment_id);
    }

    #[tokio::test]
    async fn test_assign_ignores_waiting_games() {
        let repository = Arc::new(InMemoryGameRepository::new());
        repository.create_waiting_batch(2).await.unwrap();
        let service = GameService::new(repository, Arc::new(AlwaysAllow));

        let err = service.assign("ip", "").await.unwrap_err();

        assert_eq!(
            err,
            GameServiceError::RepositoryError(GameRepositoryError::NoGamesAvailable)
        );
    }

    #[tokio::test]
    async fn test_get_game_not_found() {
        let mut mock_repo = MockGameRepository::new();
        mock_repo
            .expect_get_by_id()
            .times(1)
            .returning(|_| Err(GameRepositoryError::NotFound));
        let service = GameService::new(Arc::new(mock_repo), Arc::new(AlwaysAllow));

        let err = service.get_game("ip", "", Uuid::new_v4()).await.unwrap_err();

        assert_eq!(err, GameServiceError::RepositoryError(GameRepositoryError::NotFound));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_get_game_with_history() {
        let repository = Arc::new(InMemoryGameRepository::with_seed(1));
        let game = repository.list_ongoing().await.unwrap().remove(0);
        let service = GameService::new(repository, Arc::new(AlwaysAllow));

        let fetched = service.get_game("ip", "", game.id).await.unwrap();
        let (with_history, history) = service
            .get_game_with_history("ip", "", game.id)
            .await
            .unwrap();

        assert_eq!(fetched, game);
        assert_eq!(with_history, game);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_reads_are_rate_limited() {
        let mut mock_repo = MockGameRepository::new();
        mock_repo.expect_list_ongoing().never();
        mock_repo.expect_get_by_id().never();
        let service = GameService::new(Arc::new(mock_repo), Arc::new(AlwaysDeny));

        assert_eq!(
            service.assign("ip", "").await.unwrap_err(),
            GameServiceError::RateLimited
        );
        assert_eq!(
            service.get_game("ip", "", Uuid::new_v4()).await.unwrap_err(),
            GameServiceError::RateLimited
        );
    }
}
