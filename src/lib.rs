//! playgen — self-play generation client.
//!
//! Runs a fixed pool of long-lived workers that continuously play games
//! against the current best network artifact, upload finished games to the
//! distribution server, and restart on a new artifact when the server
//! publishes one. The pool survives transient server outages with
//! exponential-backoff retries; version skew with the server is fatal.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod pool;
pub mod sync;
pub mod transport;

pub use config::AppConfig;
pub use engine::{Engine, EngineOptions, GameSession, GtpEngine, ResignPolicy};
pub use error::{PlaygenError, Result};
pub use pool::{
    AggregateStats, ControlCell, GameOutcome, PoolCoordinator, SelfPlayWorker, SlotAssignment,
    WorkerControl,
};
pub use sync::{ArtifactRef, ArtifactSynchronizer, Resolved, RetryBudget, RetryPolicy};
pub use transport::{ArtifactTransport, HttpTransport, LatestArtifact, Uploader};
