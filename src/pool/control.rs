use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Cooperative control signal for one worker, observed at game boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerControl {
    /// Keep playing games against the current artifact
    Running,
    /// Abandon the current game and restart on the updated artifact
    ArtifactChanged,
    /// Finish up and terminate (terminal)
    ShuttingDown,
}

const RUNNING: u8 = 0;
const ARTIFACT_CHANGED: u8 = 1;
const SHUTTING_DOWN: u8 = 2;

/// Shared atomic cell holding one worker's control state.
///
/// Written by the coordinator (`signal_*`) and by the owning worker
/// (`acknowledge_artifact_change`, only between games). Transitions are
/// monotonic toward `ShuttingDown`: a stale acknowledge can never overwrite a
/// shutdown signal because both sides use compare-and-swap.
#[derive(Debug, Clone)]
pub struct ControlCell(Arc<AtomicU8>);

impl Default for ControlCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(RUNNING)))
    }

    pub fn load(&self) -> WorkerControl {
        match self.0.load(Ordering::SeqCst) {
            RUNNING => WorkerControl::Running,
            ARTIFACT_CHANGED => WorkerControl::ArtifactChanged,
            _ => WorkerControl::ShuttingDown,
        }
    }

    pub fn is_running(&self) -> bool {
        self.load() == WorkerControl::Running
    }

    /// Coordinator: the artifact changed; restart at the next game boundary.
    pub fn signal_artifact_changed(&self) {
        let _ = self
            .0
            .compare_exchange(RUNNING, ARTIFACT_CHANGED, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Coordinator: stop after the current game. Terminal.
    pub fn signal_shutdown(&self) {
        self.0.store(SHUTTING_DOWN, Ordering::SeqCst);
    }

    /// Worker: the artifact change has been honored; resume playing.
    pub fn acknowledge_artifact_change(&self) {
        let _ = self.0.compare_exchange(
            ARTIFACT_CHANGED,
            RUNNING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}
