#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChessServiceError {
    GameNotOngoing,
    InvalidUci,
    IllegalMove(String),
    InvalidPosition(String),
}

impl std::fmt::Display for ChessServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChessServiceError::GameNotOngoing => write!(f, "Game is not ongoing"),
            ChessServiceError::InvalidUci => {
                write!(f, "Move string is not valid UCI notation")
            }
            ChessServiceError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
            ChessServiceError::InvalidPosition(msg) => write!(f, "Invalid position: {}", msg),
        }
    }
}

impl std::error::Error for ChessServiceError {}
