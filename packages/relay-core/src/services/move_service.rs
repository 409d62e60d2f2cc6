use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    models::{Game, MoveHistoryItem, MoveRecord},
    repositories::{
        errors::game_repository_errors::GameRepositoryError, game_repository::GameRepository,
    },
    services::{
        chess_service::ChessService, errors::move_service_errors::MoveServiceError,
        rate_limiter::RateLimiter,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitMoveRequest {
    pub uci: String,
    pub expected_version: i64,
    /// Opaque client tag, echoed into logs only.
    pub client_nonce: Option<String>,
}

impl SubmitMoveRequest {
    pub fn new(uci: &str, expected_version: i64) -> Self {
        SubmitMoveRequest {
            uci: uci.to_string(),
            expected_version,
            client_nonce: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitMoveResult {
    pub move_record: MoveRecord,
    pub game: Game,
    pub history: Vec<MoveHistoryItem>,
    /// The game ended with this move; the client should ask for another.
    pub should_fetch_next: bool,
}

#[derive(Clone)]
pub struct MoveService {
    repository: Arc<dyn GameRepository + Send + Sync>,
    rate_limiter: Arc<dyn RateLimiter>,
    chess: ChessService,
}

impl MoveService {
    pub fn new(
        repository: Arc<dyn GameRepository + Send + Sync>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        MoveService {
            repository,
            rate_limiter,
            chess: ChessService::new(),
        }
    }

    /// Validate and commit one move by `client_id`.
    ///
    /// Nothing is retried here. A `VersionConflict` means another move landed
    /// first and the client has to reload the game before trying again.
    pub async fn submit_move(
        &self,
        ip: &str,
        token: &str,
        game_id: Uuid,
        client_id: Uuid,
        request: SubmitMoveRequest,
    ) -> Result<SubmitMoveResult, MoveServiceError> {
        if !self.rate_limiter.allow(ip, token) {
            return Err(MoveServiceError::RateLimited);
        }

        let game = self.repository.get_by_id(game_id).await?;

        // Cheap rejection of stale requests; persist_move is authoritative.
        if game.state_version != request.expected_version {
            warn!(
                "Stale move for game {}: expected version {}, current {}",
                game_id, request.expected_version, game.state_version
            );
            return Err(GameRepositoryError::VersionConflict.into());
        }

        let (successor, move_record) = self.chess.apply_move(&game, &request.uci, Utc::now())?;
        let ply = successor.ply_count - 1;

        let history = self
            .repository
            .persist_move(game_id, client_id, &successor, &move_record, ply)
            .await
            .inspect_err(|e| {
                warn!(
                    "Move {} by client {} on game {} rejected: {}",
                    request.uci, client_id, game_id, e
                )
            })?;

        info!(
            "Client {} played {} on game {} (version {}, nonce {:?})",
            client_id,
            move_record.uci,
            game_id,
            successor.state_version,
            request.client_nonce
        );

        let should_fetch_next = successor.is_terminal();
        if should_fetch_next {
            info!("Game {} finished: {}", game_id, successor.status);
        }

        Ok(SubmitMoveResult {
            move_record,
            game: successor,
            history,
            should_fetch_next,
        })
    }
}
