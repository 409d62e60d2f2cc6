use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Game, GameResult, GameStatus, MoveHistoryItem, MoveRecord, Side, INITIAL_FEN};
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::game_repository::GameRepository;

const QUERY_GET_BY_ID: &str = "
SELECT id, status, result, fen, side_to_move, ply_count,
       last_move_uci, last_move_at, state_version, created_at, updated_at
FROM games
WHERE id = $1";

const QUERY_LIST_ONGOING: &str = "
SELECT id, status, result, fen, side_to_move, ply_count,
       last_move_uci, last_move_at, state_version, created_at, updated_at
FROM games
WHERE status = 'ongoing'
ORDER BY created_at ASC";

const QUERY_UPDATE_IF_VERSION: &str = "
UPDATE games SET
    status        = $1,
    result        = $2,
    fen           = $3,
    side_to_move  = $4,
    ply_count     = $5,
    last_move_uci = $6,
    last_move_at  = $7,
    state_version = $8,
    updated_at    = $9
WHERE id = $10 AND state_version = $11";

const QUERY_INSERT: &str = "
INSERT INTO games
    (id, status, result, fen, side_to_move, ply_count,
     last_move_uci, last_move_at, state_version, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT (id) DO NOTHING";

const QUERY_HAS_ACTIVE: &str =
    "SELECT EXISTS(SELECT 1 FROM games WHERE status IN ('waiting', 'ongoing'))";

// SKIP LOCKED: a row another claim holds is passed over, never waited on.
const QUERY_CLAIM_NEXT_GAME: &str = "
SELECT id, status, result, fen, side_to_move, ply_count,
       last_move_uci, last_move_at, state_version, created_at, updated_at
FROM games
WHERE status IN ('waiting', 'ongoing')
  AND NOT EXISTS (
      SELECT 1 FROM game_players
      WHERE game_id = games.id AND client_id = $1
  )
ORDER BY created_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED";

const QUERY_INSERT_GAME_PLAYER: &str = "
INSERT INTO game_players (game_id, client_id, has_moved, created_at)
VALUES ($1, $2, false, NOW())
ON CONFLICT (game_id, client_id) DO NOTHING";

const QUERY_ACTIVATE_GAME: &str = "
UPDATE games SET status = 'ongoing', updated_at = NOW()
WHERE id = $1 AND status = 'waiting'
RETURNING updated_at";

const QUERY_MOVE_HISTORY: &str = "
SELECT ply, uci, from_sq, to_sq, promotion, client_id, fen_before, fen_after, created_at
FROM moves
WHERE game_id = $1
ORDER BY ply ASC";

const QUERY_GET_GAME_PLAYER: &str = "
SELECT has_moved FROM game_players
WHERE game_id = $1 AND client_id = $2
FOR UPDATE";

const QUERY_INSERT_MOVE: &str = "
INSERT INTO moves
    (id, game_id, ply, uci, from_sq, to_sq, promotion, client_id, fen_before, fen_after, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

const QUERY_MARK_MOVED: &str = "
UPDATE game_players SET has_moved = true
WHERE game_id = $1 AND client_id = $2";

#[derive(sqlx::FromRow)]
struct GameRow {
    id: Uuid,
    status: String,
    result: Option<String>,
    fen: String,
    side_to_move: String,
    ply_count: i32,
    last_move_uci: Option<String>,
    last_move_at: Option<DateTime<Utc>>,
    state_version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GameRow> for Game {
    type Error = GameRepositoryError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let result = row
            .result
            .as_deref()
            .map(str::parse::<GameResult>)
            .transpose()
            .map_err(GameRepositoryError::Database)?;

        Ok(Game {
            id: row.id,
            status: row.status.parse().map_err(GameRepositoryError::Database)?,
            result,
            fen: row.fen,
            side_to_move: row
                .side_to_move
                .parse()
                .map_err(GameRepositoryError::Database)?,
            ply_count: row.ply_count,
            last_move_uci: row.last_move_uci,
            last_move_at: row.last_move_at,
            state_version: row.state_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Transactional store on PostgreSQL.
#[derive(Clone)]
pub struct PostgresGameRepository {
    pool: PgPool,
}

impl PostgresGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url` sized from `config`.
    pub async fn connect(url: &str, config: &Config) -> Result<Self, GameRepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(url)
            .await?;
        info!("Connected to database");
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), GameRepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn fetch_history<'e, E>(
    executor: E,
    game_id: Uuid,
) -> Result<Vec<MoveHistoryItem>, GameRepositoryError>
where
    E: PgExecutor<'e>,
{
    let history = sqlx::query_as::<_, MoveHistoryItem>(QUERY_MOVE_HISTORY)
        .bind(game_id)
        .fetch_all(executor)
        .await?;
    Ok(history)
}

/// A concurrent commit for the same ply trips the `(game_id, ply)` unique
/// index before the version predicate is reached.
fn conflict_on_duplicate_ply(err: sqlx::Error) -> GameRepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            GameRepositoryError::VersionConflict
        }
        _ => GameRepositoryError::from(err),
    }
}

#[async_trait]
impl GameRepository for PostgresGameRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Game, GameRepositoryError> {
        let row = sqlx::query_as::<_, GameRow>(QUERY_GET_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Game::try_from(row),
            None => Err(GameRepositoryError::NotFound),
        }
    }

    async fn list_ongoing(&self) -> Result<Vec<Game>, GameRepositoryError> {
        let rows = sqlx::query_as::<_, GameRow>(QUERY_LIST_ONGOING)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Game::try_from).collect()
    }

    async fn save_if_version(
        &self,
        game: &Game,
        expected_version: i64,
    ) -> Result<(), GameRepositoryError> {
        let updated = sqlx::query(QUERY_UPDATE_IF_VERSION)
            .bind(game.status.as_str())
            .bind(game.result.map(|r| r.as_str()))
            .bind(&game.fen)
            .bind(game.side_to_move.as_str())
            .bind(game.ply_count)
            .bind(&game.last_move_uci)
            .bind(game.last_move_at)
            .bind(game.state_version)
            .bind(game.updated_at)
            .bind(game.id)
            .bind(expected_version)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(GameRepositoryError::VersionConflict);
        }
        Ok(())
    }

    async fn insert(&self, game: &Game) -> Result<(), GameRepositoryError> {
        sqlx::query(QUERY_INSERT)
            .bind(game.id)
            .bind(game.status.as_str())
            .bind(game.result.map(|r| r.as_str()))
            .bind(&game.fen)
            .bind(game.side_to_move.as_str())
            .bind(game.ply_count)
            .bind(&game.last_move_uci)
            .bind(game.last_move_at)
            .bind(game.state_version)
            .bind(game.created_at)
            .bind(game.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn has_active_games(&self) -> Result<bool, GameRepositoryError> {
        let exists: bool = sqlx::query_scalar(QUERY_HAS_ACTIVE)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create_waiting_batch(&self, count: usize) -> Result<(), GameRepositoryError> {
        if count == 0 {
            return Ok(());
        }

        let now = Utc::now();
        let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO games
    (id, status, result, fen, side_to_move, ply_count,
     last_move_uci, last_move_at, state_version, created_at, updated_at) ",
        );
        builder.push_values(ids, |mut row, id| {
            row.push_bind(id)
                .push_bind(GameStatus::Waiting.as_str())
                .push_bind(None::<String>)
                .push_bind(INITIAL_FEN)
                .push_bind(Side::White.as_str())
                .push_bind(0_i32)
                .push_bind(None::<String>)
                .push_bind(None::<DateTime<Utc>>)
                .push_bind(0_i64)
                .push_bind(now)
                .push_bind(now);
        });
        builder.push(" ON CONFLICT (id) DO NOTHING");

        builder.build().execute(&self.pool).await?;
        info!("Created {} waiting games", count);
        Ok(())
    }

    async fn claim_next_game(
        &self,
        client_id: Uuid,
    ) -> Result<(Game, Vec<MoveHistoryItem>), GameRepositoryError> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, GameRow>(QUERY_CLAIM_NEXT_GAME)
            .bind(client_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut game = match row {
            Some(row) => Game::try_from(row)?,
            None => return Err(GameRepositoryError::NoGamesAvailable),
        };

        let inserted = sqlx::query(QUERY_INSERT_GAME_PLAYER)
            .bind(game.id)
            .bind(client_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if inserted == 0 {
            warn!(
                "Assignment for client {} on game {} raced away",
                client_id, game.id
            );
            return Err(GameRepositoryError::NoGamesAvailable);
        }

        let activated: Option<DateTime<Utc>> = sqlx::query_scalar(QUERY_ACTIVATE_GAME)
            .bind(game.id)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(updated_at) = activated {
            game.status = GameStatus::Ongoing;
            game.updated_at = updated_at;
        }

        let history = fetch_history(&mut *tx, game.id).await?;

        tx.commit().await?;
        debug!("Client {} claimed game {}", client_id, game.id);
        Ok((game, history))
    }

    async fn get_game_with_history(
        &self,
        id: Uuid,
    ) -> Result<(Game, Vec<MoveHistoryItem>), GameRepositoryError> {
        let game = self.get_by_id(id).await?;
        let history = fetch_history(&self.pool, id).await?;
        Ok((game, history))
    }

    async fn persist_move(
        &self,
        game_id: Uuid,
        client_id: Uuid,
        successor: &Game,
        record: &MoveRecord,
        ply: i32,
    ) -> Result<Vec<MoveHistoryItem>, GameRepositoryError> {
        let item = record
            .to_history_item(ply, client_id)
            .ok_or_else(|| GameRepositoryError::InvalidMoveRecord(record.uci.clone()))?;

        let mut tx = self.pool.begin().await?;

        let has_moved: Option<bool> = sqlx::query_scalar(QUERY_GET_GAME_PLAYER)
            .bind(game_id)
            .bind(client_id)
            .fetch_optional(&mut *tx)
            .await?;
        match has_moved {
            None => return Err(GameRepositoryError::NotAssigned),
            Some(true) => return Err(GameRepositoryError::AlreadyMoved),
            Some(false) => {}
        }

        sqlx::query(QUERY_INSERT_MOVE)
            .bind(record.id)
            .bind(game_id)
            .bind(item.ply)
            .bind(&item.uci)
            .bind(&item.from_sq)
            .bind(&item.to_sq)
            .bind(&item.promotion)
            .bind(item.client_id)
            .bind(&item.fen_before)
            .bind(&item.fen_after)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await
            .map_err(conflict_on_duplicate_ply)?;

        let updated = sqlx::query(QUERY_UPDATE_IF_VERSION)
            .bind(successor.status.as_str())
            .bind(successor.result.map(|r| r.as_str()))
            .bind(&successor.fen)
            .bind(successor.side_to_move.as_str())
            .bind(successor.ply_count)
            .bind(&successor.last_move_uci)
            .bind(successor.last_move_at)
            .bind(successor.state_version)
            .bind(successor.updated_at)
            .bind(game_id)
            .bind(successor.state_version - 1)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(GameRepositoryError::VersionConflict);
        }

        sqlx::query(QUERY_MARK_MOVED)
            .bind(game_id)
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        let history = fetch_history(&mut *tx, game_id).await?;

        tx.commit().await?;
        Ok(history)
    }
}
