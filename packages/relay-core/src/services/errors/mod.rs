pub mod chess_service_errors;
pub mod game_service_errors;
pub mod matchmaking_service_errors;
pub mod move_service_errors;

use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use chess_service_errors::ChessServiceError;

/// Error classes a transport maps to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client-caused; never retried by the server.
    Validation,
    /// An expected race. The client re-fetches state and tries again.
    Coordination,
    RateLimited,
    Infrastructure,
}

impl ChessServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChessServiceError::GameNotOngoing
            | ChessServiceError::InvalidUci
            | ChessServiceError::IllegalMove(_) => ErrorKind::Validation,
            ChessServiceError::InvalidPosition(_) => ErrorKind::Infrastructure,
        }
    }
}

impl GameRepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameRepositoryError::NotFound | GameRepositoryError::InvalidMoveRecord(_) => {
                ErrorKind::Validation
            }
            GameRepositoryError::VersionConflict
            | GameRepositoryError::NoGamesAvailable
            | GameRepositoryError::AlreadyMoved
            | GameRepositoryError::NotAssigned => ErrorKind::Coordination,
            GameRepositoryError::Database(_) => ErrorKind::Infrastructure,
        }
    }
}
