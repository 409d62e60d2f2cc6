use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ties one client to one game. At most one exists per (game, client) pair,
/// and `has_moved` only ever flips from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub game_id: Uuid,
    pub client_id: Uuid,
    pub has_moved: bool,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(game_id: Uuid, client_id: Uuid, now: DateTime<Utc>) -> Self {
        Assignment {
            game_id,
            client_id,
            has_moved: false,
            created_at: now,
        }
    }
}
