//! Transport collaborator boundaries: querying/fetching artifacts from the
//! distribution server and submitting finished game data back to it.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// What the server reports as the currently required artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestArtifact {
    /// Content hash identifying the artifact
    pub identifier: String,
    /// Minimum client version the server will accept submissions from
    pub min_client_version: u32,
}

/// Fetch side of the distribution server.
///
/// Implementations report failures through the usual error type; the
/// synchronizer decides what is retryable. Local existence and hash checks
/// are not this trait's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactTransport: Send + Sync {
    /// Ask the server which artifact is current.
    async fn query_latest(&self) -> Result<LatestArtifact>;

    /// Download the payload for `identifier` into `dest`, returning the local
    /// path it was stored at.
    async fn fetch(&self, identifier: &str, dest: &Path) -> Result<PathBuf>;
}

/// Upload side of the distribution server. Best-effort: callers log and
/// swallow failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Submit the result and training data files for `result_id`, attributed
    /// to `artifact_id`.
    async fn upload(&self, result_id: &str, artifact_id: &str, client_version: u32) -> Result<()>;
}
