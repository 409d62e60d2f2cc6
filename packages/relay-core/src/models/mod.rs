pub mod assignment;
pub mod game;
pub mod move_history;

pub use assignment::Assignment;
pub use game::{Game, GameResult, GameStatus, Side, INITIAL_FEN};
pub use move_history::{MoveHistoryItem, MoveRecord};
