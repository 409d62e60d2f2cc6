pub mod config;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::{Config, ConfigError};
pub use repositories::{
    errors::game_repository_errors::GameRepositoryError, game_repository::GameRepository,
    in_memory_game_repository::InMemoryGameRepository,
    postgres_game_repository::PostgresGameRepository,
};
pub use services::{
    chess_service::ChessService,
    errors::ErrorKind,
    game_service::{AssignResult, GameService},
    matchmaking_service::{MatchmakingService, NextGame},
    move_service::{MoveService, SubmitMoveRequest, SubmitMoveResult},
    rate_limiter::{AlwaysAllow, RateLimiter},
};
