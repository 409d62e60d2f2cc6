use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    models::{Game, MoveHistoryItem},
    repositories::{
        errors::game_repository_errors::GameRepositoryError, game_repository::GameRepository,
    },
    services::{errors::matchmaking_service_errors::MatchmakingServiceError, rate_limiter::RateLimiter},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextGame {
    pub game: Game,
    pub history: Vec<MoveHistoryItem>,
}

#[derive(Clone)]
pub struct MatchmakingService {
    repository: Arc<dyn GameRepository + Send + Sync>,
    rate_limiter: Arc<dyn RateLimiter>,
    batch_size: usize,
}

impl MatchmakingService {
    pub fn new(
        repository: Arc<dyn GameRepository + Send + Sync>,
        rate_limiter: Arc<dyn RateLimiter>,
        batch_size: usize,
    ) -> Self {
        MatchmakingService {
            repository,
            rate_limiter,
            batch_size,
        }
    }

    /// Hand `client_id` a game it has never been assigned to.
    ///
    /// When the pool is exhausted a fresh batch of waiting games is created
    /// and the claim is retried once.
    pub async fn get_next(
        &self,
        ip: &str,
        token: &str,
        client_id: Uuid,
    ) -> Result<NextGame, MatchmakingServiceError> {
        if !self.rate_limiter.allow(ip, token) {
            return Err(MatchmakingServiceError::RateLimited);
        }

        match self.repository.claim_next_game(client_id).await {
            Ok((game, history)) => {
                debug!("Client {} assigned to game {}", client_id, game.id);
                return Ok(NextGame { game, history });
            }
            Err(GameRepositoryError::NoGamesAvailable) => {}
            Err(e) => return Err(e.into()),
        }

        info!(
            "No game available for client {}, creating {} more",
            client_id, self.batch_size
        );
        self.repository
            .create_waiting_batch(self.batch_size)
            .await?;

        let (game, history) = self.repository.claim_next_game(client_id).await?;
        debug!("Client {} assigned to game {}", client_id, game.id);
        Ok(NextGame { game, history })
    }
}
