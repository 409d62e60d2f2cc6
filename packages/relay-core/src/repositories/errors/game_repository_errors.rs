#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRepositoryError {
    NotFound,
    VersionConflict,
    NoGamesAvailable,
    AlreadyMoved,
    NotAssigned,
    /// The move record's notation cannot be split into squares.
    InvalidMoveRecord(String),
    Database(String),
}

impl std::fmt::Display for GameRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameRepositoryError::NotFound => write!(f, "Game not found"),
            GameRepositoryError::VersionConflict => write!(f, "Game state version conflict"),
            GameRepositoryError::NoGamesAvailable => write!(f, "No games available"),
            GameRepositoryError::AlreadyMoved => write!(f, "Client already moved in this game"),
            GameRepositoryError::NotAssigned => write!(f, "Client is not assigned to this game"),
            GameRepositoryError::InvalidMoveRecord(uci) => {
                write!(f, "Move record has malformed notation: {:?}", uci)
            }
            GameRepositoryError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for GameRepositoryError {}

impl From<sqlx::Error> for GameRepositoryError {
    fn from(err: sqlx::Error) -> Self {
        GameRepositoryError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for GameRepositoryError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        GameRepositoryError::Database(err.to_string())
    }
}
