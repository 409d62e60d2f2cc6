use std::ops::AddAssign;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use relay_core::config::parse_or;
use relay_core::models::Game;
use relay_core::{
    AlwaysAllow, ChessService, Config, ErrorKind, GameRepository, InMemoryGameRepository,
    MatchmakingService, MoveService, PostgresGameRepository, SubmitMoveRequest,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_SIM_CLIENTS: usize = 8;
const DEFAULT_SIM_ROUNDS: usize = 20;
const SIM_IP: &str = "127.0.0.1";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Default, Clone, Copy)]
struct Stats {
    accepted: usize,
    finished: usize,
    conflicts: usize,
    rejected: usize,
    failures: usize,
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.finished += other.finished;
        self.conflicts += other.conflicts;
        self.rejected += other.rejected;
        self.failures += other.failures;
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    let lookup = |key: &str| std::env::var(key).ok();
    let clients: usize = parse_or(&lookup, "SIM_CLIENTS", DEFAULT_SIM_CLIENTS)?;
    let rounds: usize = parse_or(&lookup, "SIM_ROUNDS", DEFAULT_SIM_ROUNDS)?;

    let repository = open_store(&config).await?;
    let matchmaking = MatchmakingService::new(
        repository.clone(),
        Arc::new(AlwaysAllow),
        config.batch_size,
    );
    let moves = MoveService::new(repository.clone(), Arc::new(AlwaysAllow));

    info!("Starting {} clients for {} rounds each", clients, rounds);
    let handles: Vec<_> = (0..clients)
        .map(|_| {
            let matchmaking = matchmaking.clone();
            let moves = moves.clone();
            tokio::spawn(async move { run_client(matchmaking, moves, rounds).await })
        })
        .collect();

    let mut total = Stats::default();
    for handle in handles {
        match handle.await {
            Ok(stats) => total += stats,
            Err(e) => error!("Client task failed: {}", e),
        }
    }

    let ongoing = repository.list_ongoing().await?.len();
    info!(
        "Done: {} accepted, {} games finished, {} conflicts, {} rejected, {} failures, {} ongoing",
        total.accepted, total.finished, total.conflicts, total.rejected, total.failures, ongoing
    );
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn GameRepository + Send + Sync>, BoxError> {
    match &config.database_url {
        Some(url) => {
            let repository = PostgresGameRepository::connect(url, config).await?;
            repository.migrate().await?;
            seed_if_empty(&repository, config.seed_count).await?;
            Ok(Arc::new(repository))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(InMemoryGameRepository::with_seed(config.seed_count)))
        }
    }
}

async fn seed_if_empty(repository: &PostgresGameRepository, count: usize) -> Result<(), BoxError> {
    if repository.has_active_games().await? {
        return Ok(());
    }
    let now = Utc::now();
    for _ in 0..count {
        repository.insert(&Game::new(Uuid::new_v4(), now)).await?;
    }
    info!("Seeded {} games", count);
    Ok(())
}

async fn run_client(matchmaking: MatchmakingService, moves: MoveService, rounds: usize) -> Stats {
    let client_id = Uuid::new_v4();
    let token = client_id.to_string();
    let mut stats = Stats::default();

    for round in 0..rounds {
        let next = match matchmaking.get_next(SIM_IP, &token, client_id).await {
            Ok(next) => next,
            Err(e) => {
                warn!("Client {} found no game: {}", client_id, e);
                stats.failures += 1;
                continue;
            }
        };

        let Some(uci) = pick_move(&next.game) else {
            debug!("Game {} has no legal moves", next.game.id);
            continue;
        };
        let request = SubmitMoveRequest {
            uci,
            expected_version: next.game.state_version,
            client_nonce: Some(format!("{}-{}", client_id, round)),
        };

        match moves
            .submit_move(SIM_IP, &token, next.game.id, client_id, request)
            .await
        {
            Ok(result) => {
                stats.accepted += 1;
                if result.should_fetch_next {
                    stats.finished += 1;
                }
            }
            Err(e) => match e.kind() {
                ErrorKind::Coordination => stats.conflicts += 1,
                ErrorKind::Validation => {
                    warn!("Client {} move rejected: {}", client_id, e);
                    stats.rejected += 1;
                }
                ErrorKind::RateLimited | ErrorKind::Infrastructure => {
                    error!("Client {} move failed: {}", client_id, e);
                    stats.failures += 1;
                }
            },
        }
    }

    stats
}

fn pick_move(game: &Game) -> Option<String> {
    let legal = ChessService::legal_moves(game).ok()?;
    legal.choose(&mut rand::thread_rng()).cloned()
}
