use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};

use crate::engine::{Engine, EngineOptions, GameSession, ResignPolicy};
use crate::error::{PlaygenError, Result};
use crate::pool::{ControlCell, WorkerControl};
use crate::sync::ArtifactRef;

/// Result of one completed game, consumed exactly once by the coordinator.
///
/// `result_id` is `None` for games that ended without a scoreable result
/// (nothing was persisted, so there is nothing to upload); the outcome is
/// still reported so the coordinator re-checks the artifact.
#[derive(Debug)]
pub struct GameOutcome {
    pub result_id: Option<String>,
    pub elapsed: Duration,
}

enum Step {
    Continue,
    Stop,
}

/// One self-play worker: plays an unbounded sequence of games against the
/// artifact it last observed, cooperating with the control cell at game
/// boundaries.
pub struct SelfPlayWorker {
    id: usize,
    engine: Arc<dyn Engine>,
    artifact: Arc<RwLock<ArtifactRef>>,
    options: EngineOptions,
    resign: ResignPolicy,
    control: ControlCell,
    moves_made: Arc<AtomicU64>,
    outcome_tx: mpsc::Sender<GameOutcome>,
}

impl SelfPlayWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        engine: Arc<dyn Engine>,
        artifact: Arc<RwLock<ArtifactRef>>,
        options: EngineOptions,
        resign: ResignPolicy,
        control: ControlCell,
        moves_made: Arc<AtomicU64>,
        outcome_tx: mpsc::Sender<GameOutcome>,
    ) -> Self {
        Self {
            id,
            engine,
            artifact,
            options,
            resign,
            control,
            moves_made,
            outcome_tx,
        }
    }

    /// Run until shutdown is signaled or the engine fails. An engine failure
    /// terminates this worker only; the rest of the pool keeps playing.
    pub async fn run(mut self) {
        info!(worker = self.id, "worker started");
        loop {
            match self.play_one_game().await {
                Ok(Step::Continue) => {}
                Ok(Step::Stop) => {
                    info!(worker = self.id, "program ends: exiting");
                    return;
                }
                Err(e) => {
                    error!(worker = self.id, "worker terminated: {e}");
                    return;
                }
            }
        }
    }

    async fn play_one_game(&mut self) -> Result<Step> {
        // Snapshot the shared artifact exactly once per game attempt; a
        // change lands at the next game boundary, never mid-game.
        let artifact = { self.artifact.read().await.clone() };
        let pct = self.resign.pick(&mut rand::thread_rng());
        let options = self.options.clone().with_resign_pct(pct);

        let start = Instant::now();
        let mut session = self.engine.start(&artifact, &options).await?;

        while self.control.load() == WorkerControl::Running {
            if let Err(e) = session.request_move().await {
                let _ = session.shutdown().await;
                return Err(e);
            }
            self.moves_made.fetch_add(1, Ordering::Relaxed);
            if session.game_concluded() {
                break;
            }
        }

        match self.control.load() {
            WorkerControl::Running => {
                info!(worker = self.id, "game has ended");
                let reported = self.report_game(session.as_mut(), start.elapsed()).await;
                info!(worker = self.id, "stopping engine");
                let _ = session.shutdown().await;
                reported?;
                Ok(Step::Continue)
            }
            WorkerControl::ArtifactChanged => {
                info!(worker = self.id, "best network has changed: restarting");
                let _ = session.shutdown().await;
                self.control.acknowledge_artifact_change();
                Ok(Step::Continue)
            }
            WorkerControl::ShuttingDown => {
                let _ = session.shutdown().await;
                Ok(Step::Stop)
            }
        }
    }

    async fn report_game(&self, session: &mut dyn GameSession, elapsed: Duration) -> Result<()> {
        let result_id = if session.is_scoreable().await? {
            let id = session.persist_result().await?;
            session.dump_training_data().await?;
            Some(id)
        } else {
            None
        };
        self.outcome_tx
            .send(GameOutcome { result_id, elapsed })
            .await
            .map_err(|_| PlaygenError::ChannelClosed)
    }
}
