pub mod chess_service;
pub mod errors;
pub mod game_service;
pub mod matchmaking_service;
pub mod move_service;
pub mod rate_limiter;
