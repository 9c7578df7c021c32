use async_trait::async_trait;

use crate::engine::EngineOptions;
use crate::error::Result;
use crate::sync::ArtifactRef;

/// One running engine instance, bound to a fixed artifact for the whole game.
///
/// Any error from these methods is fatal to the worker driving the session:
/// the worker shuts the instance down and exits without reporting a result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameSession: Send {
    /// Request the next move, blocking until the engine produces it.
    async fn request_move(&mut self) -> Result<()>;

    /// Whether the game has concluded (two passes or a resignation).
    fn game_concluded(&self) -> bool;

    /// Whether the finished game produced a decisive, scoreable result.
    async fn is_scoreable(&mut self) -> Result<bool>;

    /// Persist the result record (SGF) and return its identifier.
    async fn persist_result(&mut self) -> Result<String>;

    /// Dump the accumulated training data for the finished game.
    async fn dump_training_data(&mut self) -> Result<()>;

    /// Shut the engine instance down cleanly.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Factory for game sessions. Shared by every worker in the pool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Engine: Send + Sync {
    /// Start a new game bound to `artifact`. An engine older than the
    /// required minimum version is reported as an error.
    async fn start(
        &self,
        artifact: &ArtifactRef,
        options: &EngineOptions,
    ) -> Result<Box<dyn GameSession>>;
}
