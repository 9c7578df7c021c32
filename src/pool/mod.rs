//! The worker pool: a fixed set of self-play workers, the shared current
//! artifact, and the coordinator that serializes outcome handling.

mod control;
mod coordinator;
mod stats;
mod worker;

pub use control::{ControlCell, WorkerControl};
pub use coordinator::{PoolCoordinator, SlotAssignment};
pub use stats::AggregateStats;
pub use worker::{GameOutcome, SelfPlayWorker};
