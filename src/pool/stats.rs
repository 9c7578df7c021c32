use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Aggregate pool statistics.
///
/// The games counter is bumped only inside the coordinator's serialized
/// outcome handling; the move counter is shared with every worker and
/// incremented concurrently. Used purely for reporting, never for control
/// decisions.
pub struct AggregateStats {
    games_played: Arc<AtomicU64>,
    moves_made: Arc<AtomicU64>,
    started_at: Instant,
}

impl AggregateStats {
    pub fn new(games_played: Arc<AtomicU64>, moves_made: Arc<AtomicU64>) -> Self {
        Self {
            games_played,
            moves_made,
            started_at: Instant::now(),
        }
    }

    pub fn record_game(&self) {
        self.games_played.fetch_add(1, Ordering::SeqCst);
    }

    pub fn games_played(&self) -> u64 {
        self.games_played.load(Ordering::SeqCst)
    }

    pub fn moves_made(&self) -> u64 {
        self.moves_made.load(Ordering::Relaxed)
    }

    /// Log throughput after a completed game. Skipped while either counter is
    /// still zero.
    pub fn report(&self, last_game: Duration) {
        let games = self.games_played();
        let moves = self.moves_made();
        if games == 0 || moves == 0 {
            return;
        }
        let elapsed = self.started_at.elapsed();
        info!(
            "{} game(s) played in {} minutes = {} seconds/game, {} ms/move, last game took {} seconds",
            games,
            elapsed.as_secs() / 60,
            elapsed.as_secs() / games,
            elapsed.as_millis() as u64 / moves,
            last_game.as_secs()
        );
    }
}
