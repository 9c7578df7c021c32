use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{PlaygenError, Result};
use crate::sync::{ArtifactRef, RetryBudget, RetryPolicy};
use crate::transport::ArtifactTransport;

/// Outcome of one artifact resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub artifact: ArtifactRef,
    /// True if the artifact differs from the one the caller passed in
    pub changed: bool,
}

/// Resolves the currently required artifact against the distribution server.
///
/// Transient failures (transport errors, hash mismatches on fetch) are
/// retried with exponential backoff up to the policy ceiling. Version skew
/// with the server and an exhausted retry budget are fatal: they propagate
/// out so the binary can exit non-zero.
pub struct ArtifactSynchronizer<T: ArtifactTransport> {
    transport: T,
    client_version: u32,
    data_dir: PathBuf,
    retry: RetryPolicy,
}

impl<T: ArtifactTransport> ArtifactSynchronizer<T> {
    pub fn new(transport: T, client_version: u32, data_dir: PathBuf, retry: RetryPolicy) -> Self {
        Self {
            transport,
            client_version,
            data_dir,
            retry,
        }
    }

    /// Resolve the currently required artifact, retrying transient failures.
    pub async fn resolve(&self, current: Option<&ArtifactRef>) -> Result<Resolved> {
        let mut budget = RetryBudget::new(&self.retry);
        loop {
            match self.try_resolve(current).await {
                Ok(resolved) => return Ok(resolved),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => match budget.next_delay() {
                    Some(delay) => {
                        warn!(
                            "network connection to server failed: {e}; retrying in {} s",
                            delay.as_secs()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!("maximum number of retries exceeded, giving up");
                        return Err(PlaygenError::RetriesExhausted {
                            attempts: budget.attempts(),
                        });
                    }
                },
            }
        }
    }

    async fn try_resolve(&self, current: Option<&ArtifactRef>) -> Result<Resolved> {
        let latest = self.transport.query_latest().await?;

        if latest.min_client_version > self.client_version {
            error!(
                "server requires client version {} but we are version {}",
                latest.min_client_version, self.client_version
            );
            return Err(PlaygenError::IncompatibleServer {
                required: latest.min_client_version,
                ours: self.client_version,
            });
        }

        if let Some(cur) = current {
            if cur.identifier == latest.identifier {
                return Ok(Resolved {
                    artifact: cur.clone(),
                    changed: false,
                });
            }
        }

        let path = self.ensure_local(&latest.identifier).await?;
        info!("best network hash: {}", latest.identifier);
        Ok(Resolved {
            artifact: ArtifactRef {
                identifier: latest.identifier,
                min_client_version: latest.min_client_version,
                path,
            },
            changed: true,
        })
    }

    /// Local short-circuit: a file whose hash matches the claimed identifier
    /// is used as-is; a mismatching file is deleted before fetching.
    async fn ensure_local(&self, identifier: &str) -> Result<PathBuf> {
        let local = self.data_dir.join(identifier);
        if tokio::fs::try_exists(&local).await? {
            if self.verify(&local, identifier).await? {
                info!("already downloaded network {identifier}");
                return Ok(local);
            }
            warn!("local network file hash doesn't match, deleting");
            tokio::fs::remove_file(&local).await?;
        }

        let fetched = self.transport.fetch(identifier, &self.data_dir).await?;
        if !self.verify(&fetched, identifier).await? {
            let computed = self.hash_file(&fetched).await?;
            let _ = tokio::fs::remove_file(&fetched).await;
            return Err(PlaygenError::IntegrityMismatch {
                claimed: identifier.to_string(),
                computed,
            });
        }
        Ok(fetched)
    }

    async fn verify(&self, path: &Path, identifier: &str) -> Result<bool> {
        Ok(self.hash_file(path).await? == identifier)
    }

    async fn hash_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
