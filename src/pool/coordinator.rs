//! Pool coordinator: owns the fixed worker set, the single current artifact,
//! and the reactive upload/update cycle.
//!
//! Workers report `GameOutcome`s over an mpsc channel; the coordinator's
//! `run` loop is the sole consumer, so outcome handling (stats, upload,
//! artifact re-resolution, restart broadcast) is fully serialized even though
//! the games themselves run in parallel.

use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::engine::{Engine, EngineOptions, ResignPolicy};
use crate::error::Result;
use crate::pool::{AggregateStats, ControlCell, GameOutcome, SelfPlayWorker};
use crate::sync::{ArtifactRef, ArtifactSynchronizer};
use crate::transport::{ArtifactTransport, Uploader};

/// Outcome channel capacity; ample for any realistic pool size
const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// One worker slot: which device it plays on.
#[derive(Debug, Clone)]
pub struct SlotAssignment {
    pub gpu: Option<String>,
}

impl SlotAssignment {
    /// Expand pool settings into slots: devices × games-per-device.
    pub fn from_settings(gpus: &[String], games_per_device: usize) -> Vec<SlotAssignment> {
        let devices: Vec<Option<String>> = if gpus.is_empty() {
            vec![None]
        } else {
            gpus.iter().cloned().map(Some).collect()
        };
        let mut slots = Vec::with_capacity(devices.len() * games_per_device);
        for gpu in devices {
            for _ in 0..games_per_device {
                slots.push(SlotAssignment { gpu: gpu.clone() });
            }
        }
        slots
    }
}

struct WorkerHandle {
    control: ControlCell,
    task: tokio::task::JoinHandle<()>,
}

/// Central owner of the worker pool and the shared current artifact.
pub struct PoolCoordinator<T: ArtifactTransport> {
    synchronizer: ArtifactSynchronizer<T>,
    engine: Arc<dyn Engine>,
    uploader: Arc<dyn Uploader>,
    slots: Vec<SlotAssignment>,
    base_options: EngineOptions,
    resign: ResignPolicy,
    client_version: u32,
    keep_dir: Option<PathBuf>,
    debug_dir: Option<PathBuf>,
    games_played: Arc<AtomicU64>,
    moves_made: Arc<AtomicU64>,
}

impl<T: ArtifactTransport> PoolCoordinator<T> {
    pub fn new(
        cfg: &AppConfig,
        synchronizer: ArtifactSynchronizer<T>,
        engine: Arc<dyn Engine>,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        Self {
            synchronizer,
            engine,
            uploader,
            slots: SlotAssignment::from_settings(&cfg.pool.gpus, cfg.pool.games_per_device),
            base_options: EngineOptions::new(cfg.engine.args.clone()),
            resign: ResignPolicy::default(),
            client_version: cfg.server.client_version,
            keep_dir: cfg.paths.keep_dir.clone(),
            debug_dir: cfg.paths.debug_dir.clone(),
            games_played: Arc::new(AtomicU64::new(0)),
            moves_made: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override the resign threshold policy.
    pub fn with_resign_policy(mut self, resign: ResignPolicy) -> Self {
        self.resign = resign;
        self
    }

    /// Shared games-completed counter, for observation only.
    pub fn games_played_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.games_played)
    }

    /// Shared moves-completed counter, for observation only.
    pub fn moves_made_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.moves_made)
    }

    /// Resolve the initial artifact, start the pool, and react to outcomes
    /// until `shutdown_rx` flips or a fatal condition surfaces.
    ///
    /// On graceful shutdown every worker is signaled and allowed to finish
    /// its in-flight game. A fatal error aborts the workers outright, since
    /// the process is about to exit anyway.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let resolved = self.synchronizer.resolve(None).await?;
        info!(
            "starting {} worker(s) with network {}",
            self.slots.len(),
            resolved.artifact
        );

        let artifact = Arc::new(RwLock::new(resolved.artifact));
        let (outcome_tx, mut outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
        let stats = AggregateStats::new(
            Arc::clone(&self.games_played),
            Arc::clone(&self.moves_made),
        );

        let mut workers = Vec::with_capacity(self.slots.len());
        for (id, slot) in self.slots.iter().enumerate() {
            let control = ControlCell::new();
            let worker = SelfPlayWorker::new(
                id,
                Arc::clone(&self.engine),
                Arc::clone(&artifact),
                self.base_options.clone().for_device(slot.gpu.clone()),
                self.resign.clone(),
                control.clone(),
                Arc::clone(&self.moves_made),
                outcome_tx.clone(),
            );
            workers.push(WorkerHandle {
                control,
                task: tokio::spawn(worker.run()),
            });
        }
        // The coordinator holds no sender; the channel closes when the last
        // worker exits.
        drop(outcome_tx);

        let outcome = loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    match changed {
                        Ok(()) if *shutdown_rx.borrow() => {
                            info!("shutdown requested, draining the pool");
                            break Ok(());
                        }
                        Ok(()) => {}
                        Err(_) => {
                            warn!("shutdown channel closed, draining the pool");
                            break Ok(());
                        }
                    }
                }
                received = outcome_rx.recv() => match received {
                    Some(outcome) => {
                        if let Err(e) = self.handle_outcome(outcome, &artifact, &workers, &stats).await {
                            break Err(e);
                        }
                    }
                    None => {
                        warn!("all workers have exited");
                        break Ok(());
                    }
                },
            }
        };

        match outcome {
            Ok(()) => {
                for w in &workers {
                    w.control.signal_shutdown();
                }
                info!("waiting for in-flight games to finish");
                for w in workers {
                    let _ = w.task.await;
                }
                Ok(())
            }
            Err(e) => {
                error!("fatal pool error: {e}");
                for w in &workers {
                    w.task.abort();
                }
                Err(e)
            }
        }
    }

    /// The serialized outcome-handling section: stats, upload, re-resolve,
    /// and (if changed) restart broadcast.
    async fn handle_outcome(
        &self,
        outcome: GameOutcome,
        artifact: &Arc<RwLock<ArtifactRef>>,
        workers: &[WorkerHandle],
        stats: &AggregateStats,
    ) -> Result<()> {
        stats.record_game();
        stats.report(outcome.elapsed);

        if let Some(result_id) = &outcome.result_id {
            self.archive_result(result_id).await;
            let current_id = { artifact.read().await.identifier.clone() };
            if let Err(e) = self
                .uploader
                .upload(result_id, &current_id, self.client_version)
                .await
            {
                warn!("upload of {result_id} failed: {e}; continuing");
            }
        }

        let current = { artifact.read().await.clone() };
        let resolved = self.synchronizer.resolve(Some(&current)).await?;
        if resolved.changed {
            info!(
                "best network has changed to {}; signaling workers",
                resolved.artifact
            );
            // Publish the new artifact before signaling so every restarting
            // worker snapshots the updated value.
            *artifact.write().await = resolved.artifact;
            for w in workers {
                w.control.signal_artifact_changed();
            }
        }
        Ok(())
    }

    /// Copy result/training files into the retention directories, if
    /// configured. Failures are logged and ignored.
    async fn archive_result(&self, result_id: &str) {
        if let Some(dir) = &self.keep_dir {
            let name = format!("{result_id}.sgf");
            if let Err(e) = tokio::fs::copy(&name, dir.join(&name)).await {
                warn!("failed to keep {name}: {e}");
            }
        }
        if let Some(dir) = &self.debug_dir {
            let name = format!("{result_id}.txt");
            if let Err(e) = tokio::fs::copy(&name, dir.join(&name)).await {
                warn!("failed to keep {name}: {e}");
            }
        }
    }
}
