pub mod fast_pull;
pub mod registry;
pub mod state;

pub use fast_pull::{evaluate_table, ChangeTable, FastPullHandler};
pub use registry::HandlerRegistry;
pub use state::StateHandler;

use media_sync_models::{ChangeRecord, Domain, DomainState, ItemKey, MediaType};
use serde::Serialize;
use std::fmt;

/// Direction a handler evaluates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerMode {
    /// local <- remote, full snapshots
    Pull,
    /// remote <- local, full snapshots
    Push,
    /// local <- remote, only what the remote reports as touched
    FastPull,
}

impl HandlerMode {
    pub const ALL: [HandlerMode; 3] = [HandlerMode::Pull, HandlerMode::Push, HandlerMode::FastPull];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerMode::Pull => "pull",
            HandlerMode::Push => "push",
            HandlerMode::FastPull => "fast_pull",
        }
    }

    /// Whether results are written to the local library
    pub fn writes_local(&self) -> bool {
        !matches!(self, HandlerMode::Push)
    }
}

impl fmt::Display for HandlerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one handler is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandlerConfig {
    pub domain: Domain,
    pub mode: HandlerMode,
    pub media_type: MediaType,
}

impl HandlerConfig {
    pub fn new(domain: Domain, mode: HandlerMode, media_type: MediaType) -> Self {
        Self {
            domain,
            mode,
            media_type,
        }
    }

    /// `mode:domain:media_type`, used in logs and progress reports
    pub fn label(&self) -> String {
        format!("{}:{}:{}", self.mode, self.domain, self.media_type)
    }
}

/// Which keys a handler gets to see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every key of both full snapshots
    Snapshot,
    /// Only keys the remote reported as touched since the stored watermark
    Touched,
}

/// Per-(domain, mode, media type) change policy
pub trait Handler: Send + Sync {
    fn config(&self) -> &HandlerConfig;

    fn scope(&self) -> Scope {
        Scope::Snapshot
    }

    /// Compare one key; `None` on either side means the key is absent there
    fn evaluate(
        &self,
        key: &ItemKey,
        base: Option<&DomainState>,
        current: Option<&DomainState>,
    ) -> Option<ChangeRecord>;

    /// Orient local and remote values by mode, then evaluate
    ///
    /// Pull modes treat local as base and remote as current (what to write
    /// locally); push treats remote as base and local as current (what to
    /// send).
    fn get_action(
        &self,
        key: &ItemKey,
        local: Option<&DomainState>,
        remote: Option<&DomainState>,
    ) -> Option<ChangeRecord> {
        if self.config().mode.writes_local() {
            self.evaluate(key, local, remote)
        } else {
            self.evaluate(key, remote, local)
        }
    }
}
