use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Ongoing,
    Checkmate,
    Stalemate,
    Draw,
    Resigned,
}

impl GameStatus {
    /// Terminal games accept no further moves.
    pub fn is_terminal(&self) -> bool {
        match self {
            GameStatus::Waiting | GameStatus::Ongoing => false,
            GameStatus::Checkmate
            | GameStatus::Stalemate
            | GameStatus::Draw
            | GameStatus::Resigned => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Ongoing => "ongoing",
            GameStatus::Checkmate => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Draw => "draw",
            GameStatus::Resigned => "resigned",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(GameStatus::Waiting),
            "ongoing" => Ok(GameStatus::Ongoing),
            "checkmate" => Ok(GameStatus::Checkmate),
            "stalemate" => Ok(GameStatus::Stalemate),
            "draw" => Ok(GameStatus::Draw),
            "resigned" => Ok(GameStatus::Resigned),
            other => Err(format!("unknown game status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "1-0")]
    WhiteWins,
    #[serde(rename = "0-1")]
    BlackWins,
    #[serde(rename = "1/2-1/2")]
    Draw,
}

impl GameResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
        }
    }

    pub fn winner(side: Side) -> Self {
        match side {
            Side::White => GameResult::WhiteWins,
            Side::Black => GameResult::BlackWins,
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1-0" => Ok(GameResult::WhiteWins),
            "0-1" => Ok(GameResult::BlackWins),
            "1/2-1/2" => Ok(GameResult::Draw),
            other => Err(format!("unknown game result: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(&self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(Side::White),
            "black" => Ok(Side::Black),
            other => Err(format!("unknown side: {}", other)),
        }
    }
}

/// A game shared by anonymous clients, one move per client.
///
/// `state_version` is the optimistic-concurrency token: it starts at 0 and
/// grows by exactly one per accepted move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub fen: String,
    pub side_to_move: Side,
    pub ply_count: i32,
    pub last_move_uci: Option<String>,
    pub last_move_at: Option<DateTime<Utc>>,
    pub state_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// An ongoing game at the standard initial position.
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Game {
            id,
            status: GameStatus::Ongoing,
            result: None,
            fen: INITIAL_FEN.to_string(),
            side_to_move: Side::White,
            ply_count: 0,
            last_move_uci: None,
            last_move_at: None,
            state_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// A pool game nobody has claimed yet.
    pub fn new_waiting(id: Uuid, now: DateTime<Utc>) -> Self {
        Game {
            status: GameStatus::Waiting,
            ..Game::new(id, now)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_game_fields() {
        let now = Utc::now();
        let game = Game::new(Uuid::new_v4(), now);

        assert_eq!(game.fen, INITIAL_FEN);
        assert_eq!(game.status, GameStatus::Ongoing);
        assert_eq!(game.side_to_move, Side::White);
        assert_eq!(game.ply_count, 0);
        assert_eq!(game.state_version, 0);
        assert!(game.result.is_none());
        assert!(game.last_move_uci.is_none());
        assert_eq!(game.created_at, now);
    }

    #[test]
    fn test_new_waiting_game() {
        let game = Game::new_waiting(Uuid::new_v4(), Utc::now());

        assert_eq!(game.status, GameStatus::Waiting);
        assert!(!game.is_terminal());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!GameStatus::Waiting.is_terminal());
        assert!(!GameStatus::Ongoing.is_terminal());
        assert!(GameStatus::Checkmate.is_terminal());
        assert!(GameStatus::Stalemate.is_terminal());
        assert!(GameStatus::Draw.is_terminal());
        assert!(GameStatus::Resigned.is_terminal());
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            GameStatus::Waiting,
            GameStatus::Ongoing,
            GameStatus::Checkmate,
            GameStatus::Stalemate,
            GameStatus::Draw,
            GameStatus::Resigned,
        ] {
            assert_eq!(status.as_str().parse::<GameStatus>().unwrap(), status);
        }
        assert!("finished".parse::<GameStatus>().is_err());
    }

    #[test]
    fn test_result_text() {
        assert_eq!(GameResult::winner(Side::White).as_str(), "1-0");
        assert_eq!(GameResult::winner(Side::Black).as_str(), "0-1");
        assert_eq!("1/2-1/2".parse::<GameResult>().unwrap(), GameResult::Draw);
    }

    #[test]
    fn test_enum_serialization() {
        let serialized = serde_json::to_string(&GameStatus::Checkmate).unwrap();
        assert_eq!(serialized, "\"checkmate\"");

        let result = serde_json::to_string(&GameResult::BlackWins).unwrap();
        assert_eq!(result, "\"0-1\"");

        let side: Side = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(side, Side::Black);
    }

    #[test]
    fn test_game_serialization() {
        let game = Game::new(Uuid::new_v4(), Utc::now());

        let serialized = serde_json::to_string(&game).unwrap();
        assert!(serialized.contains("\"fen\""));
        assert!(serialized.contains("\"state_version\""));
        assert!(serialized.contains("\"ongoing\""));

        let deserialized: Game = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, game);
    }
}
