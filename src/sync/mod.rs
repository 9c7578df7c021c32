//! Artifact synchronization: resolving the currently required network
//! artifact, verifying local copies, and retrying transient server failures
//! with exponential backoff.

mod artifact;
mod retry;
mod synchronizer;

pub use artifact::ArtifactRef;
pub use retry::{RetryBudget, RetryPolicy};
pub use synchronizer::{ArtifactSynchronizer, Resolved};
