use media_sync_sources::{SourceError, SourceErrorKind};
use serde::Serialize;

/// Failure taxonomy of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SyncError {
    /// Collaborator I/O failure; not retried by the engine
    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    /// One malformed or unmatchable item; the key is skipped
    #[error("data error: {0}")]
    Data(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The run was stopped; no outbound writes were applied
    #[error("sync aborted")]
    Aborted,

    /// Unrecoverable; stops the run
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("a sync run is already in progress")]
    AlreadyRunning,
}

impl SyncError {
    /// Whether this error ends the run instead of one handler
    pub fn stops_run(&self) -> bool {
        matches!(self, SyncError::Aborted | SyncError::Fatal(_))
    }
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        match err.kind() {
            SourceErrorKind::Transient => SyncError::TransientIo(err.message().to_string()),
            SourceErrorKind::Data => SyncError::Data(err.message().to_string()),
            SourceErrorKind::Corrupt => SyncError::Fatal(err.message().to_string()),
        }
    }
}
