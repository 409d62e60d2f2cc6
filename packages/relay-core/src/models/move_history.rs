use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The accepted-move detail produced by the rule engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub id: Uuid,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    pub created_at: DateTime<Utc>,
}

impl MoveRecord {
    pub fn from_square(&self) -> Option<&str> {
        self.uci.get(..2)
    }

    pub fn to_square(&self) -> Option<&str> {
        self.uci.get(2..4)
    }

    pub fn promotion(&self) -> Option<&str> {
        self.uci.get(4..5)
    }

    /// The history row this record becomes once committed at `ply` by `client_id`.
    ///
    /// `None` when `uci` is too short to split into squares.
    pub fn to_history_item(&self, ply: i32, client_id: Uuid) -> Option<MoveHistoryItem> {
        Some(MoveHistoryItem {
            ply,
            uci: self.uci.clone(),
            from_sq: self.from_square()?.to_string(),
            to_sq: self.to_square()?.to_string(),
            promotion: self.promotion().map(str::to_string),
            client_id,
            fen_before: self.fen_before.clone(),
            fen_after: self.fen_after.clone(),
            created_at: self.created_at,
        })
    }
}

/// One persisted, append-only history entry. `ply` is 0-indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MoveHistoryItem {
    pub ply: i32,
    pub uci: String,
    pub from_sq: String,
    pub to_sq: String,
    pub promotion: Option<String>,
    pub client_id: Uuid,
    pub fen_before: String,
    pub fen_after: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uci: &str) -> MoveRecord {
        MoveRecord {
            id: Uuid::new_v4(),
            uci: uci.to_string(),
            fen_before: "before".to_string(),
            fen_after: "after".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_squares_split() {
        let rec = record("e2e4");

        assert_eq!(rec.from_square(), Some("e2"));
        assert_eq!(rec.to_square(), Some("e4"));
        assert_eq!(rec.promotion(), None);
    }

    #[test]
    fn test_promotion_piece() {
        let rec = record("a7a8q");

        assert_eq!(rec.promotion(), Some("q"));
    }

    #[test]
    fn test_to_history_item() {
        let client_id = Uuid::new_v4();
        let rec = record("g7g8n");

        let item = rec.to_history_item(3, client_id).unwrap();

        assert_eq!(item.ply, 3);
        assert_eq!(item.from_sq, "g7");
        assert_eq!(item.to_sq, "g8");
        assert_eq!(item.promotion.as_deref(), Some("n"));
        assert_eq!(item.client_id, client_id);
        assert_eq!(item.fen_before, "before");
        assert_eq!(item.fen_after, "after");
    }

    #[test]
    fn test_malformed_uci_has_no_squares() {
        let short = record("e2");
        let split_char = record("eé24");

        assert_eq!(short.from_square(), Some("e2"));
        assert_eq!(short.to_square(), None);
        assert!(short.to_history_item(0, Uuid::new_v4()).is_none());
        assert_eq!(split_char.from_square(), None);
        assert!(split_char.to_history_item(0, Uuid::new_v4()).is_none());
        assert!(record("").to_history_item(0, Uuid::new_v4()).is_none());
    }
}
