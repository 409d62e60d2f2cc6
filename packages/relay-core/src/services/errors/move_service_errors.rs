use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::services::errors::chess_service_errors::ChessServiceError;
use crate::services::errors::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveServiceError {
    RateLimited,
    ChessError(ChessServiceError),
    RepositoryError(GameRepositoryError),
}

impl MoveServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MoveServiceError::RateLimited => ErrorKind::RateLimited,
            MoveServiceError::ChessError(err) => err.kind(),
            MoveServiceError::RepositoryError(err) => err.kind(),
        }
    }
}

impl std::fmt::Display for MoveServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveServiceError::RateLimited => write!(f, "Rate limit exceeded"),
            MoveServiceError::ChessError(err) => write!(f, "Chess error: {}", err),
            MoveServiceError::RepositoryError(err) => write!(f, "Repository error: {}", err),
        }
    }
}

impl std::error::Error for MoveServiceError {}

impl From<ChessServiceError> for MoveServiceError {
    fn from(err: ChessServiceError) -> Self {
        MoveServiceError::ChessError(err)
    }
}

impl From<GameRepositoryError> for MoveServiceError {
    fn from(err: GameRepositoryError) -> Self {
        MoveServiceError::RepositoryError(err)
    }
}
