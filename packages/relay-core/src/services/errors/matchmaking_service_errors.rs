use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::services::errors::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchmakingServiceError {
    RateLimited,
    RepositoryError(GameRepositoryError),
}

impl MatchmakingServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchmakingServiceError::RateLimited => ErrorKind::RateLimited,
            MatchmakingServiceError::RepositoryError(err) => err.kind(),
        }
    }
}

impl std::fmt::Display for MatchmakingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchmakingServiceError::RateLimited => write!(f, "Rate limit exceeded"),
            MatchmakingServiceError::RepositoryError(err) => {
                write!(f, "Repository error: {}", err)
            }
        }
    }
}

impl std::error::Error for MatchmakingServiceError {}

impl From<GameRepositoryError> for MatchmakingServiceError {
    fn from(err: GameRepositoryError) -> Self {
        MatchmakingServiceError::RepositoryError(err)
    }
}
