use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::services::errors::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameServiceError {
    RateLimited,
    RepositoryError(GameRepositoryError),
}

impl GameServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameServiceError::RateLimited => ErrorKind::RateLimited,
            GameServiceError::RepositoryError(err) => err.kind(),
        }
    }
}

impl std::fmt::Display for GameServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameServiceError::RateLimited => write!(f, "Rate limit exceeded"),
            GameServiceError::RepositoryError(err) => write!(f, "Repository error: {}", err),
        }
    }
}

impl std::error::Error for GameServiceError {}

impl From<GameRepositoryError> for GameServiceError {
    fn from(err: GameRepositoryError) -> Self {
        GameServiceError::RepositoryError(err)
    }
}
