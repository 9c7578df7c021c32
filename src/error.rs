use thiserror::Error;

/// Main error type for the self-play client
#[derive(Error, Debug)]
pub enum PlaygenError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected output from server: {0}")]
    MalformedResponse(String),

    // Artifact errors
    #[error("Artifact hash mismatch: claimed {claimed}, computed {computed}")]
    IntegrityMismatch { claimed: String, computed: String },

    #[error("Server requires client version {required} but this is version {ours}")]
    IncompatibleServer { required: u32, ours: u32 },

    #[error("Maximum number of retries exceeded after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    // Engine errors
    #[error("Engine version {reported} is below the required minimum {required}")]
    IncompatibleEngine { required: String, reported: String },

    #[error("Engine failure: {0}")]
    Engine(String),

    // Pool errors
    #[error("Coordinator outcome channel closed")]
    ChannelClosed,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PlaygenError {
    /// Fatal conditions terminate the whole process: no local retry can
    /// restore the pool-wide version invariant.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlaygenError::IncompatibleServer { .. } | PlaygenError::RetriesExhausted { .. }
        )
    }

    /// Transient conditions are retried by the synchronizer with backoff and
    /// stay invisible to the workers.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaygenError::Http(_)
                | PlaygenError::Transport(_)
                | PlaygenError::MalformedResponse(_)
                | PlaygenError::IntegrityMismatch { .. }
                | PlaygenError::Io(_)
        )
    }
}

/// Result type alias for PlaygenError
pub type Result<T> = std::result::Result<T, PlaygenError>;
