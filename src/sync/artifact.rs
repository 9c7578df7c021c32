use std::path::PathBuf;

/// Identifies the artifact (network weights) the pool is currently playing
/// against.
///
/// At most one `ArtifactRef` is current at any instant from the coordinator's
/// point of view; workers snapshot it once per game attempt and may run a
/// whole game against a now-stale reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Content hash of the artifact payload; also its filename on disk
    pub identifier: String,
    /// Minimum client version the server demanded when this was resolved
    pub min_client_version: u32,
    /// Local path to the verified payload
    pub path: PathBuf,
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier)
    }
}
