pub mod errors;
pub mod game_repository;
pub mod in_memory_game_repository;
pub mod postgres_game_repository;
