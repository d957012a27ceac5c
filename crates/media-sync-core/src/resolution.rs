use chrono::{DateTime, Utc};
use media_sync_config::{ConflictPolicy, ResolutionConfig, Side};
use media_sync_models::{Domain, DomainState};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of arbitrating one bidirectional conflict
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Both sides already agree on the winner's value
    Unchanged,
    /// Remote won: write its value to the library
    WriteLocal(DomainState),
    /// Local won: send its value to the remote
    SendRemote(DomainState),
}

/// Decides the winner when both sides hold different values
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    policy: ConflictPolicy,
    tie_breaker: Side,
    tolerance_seconds: i64,
    bidirectional: HashSet<Domain>,
}

impl ConflictResolver {
    pub fn new(policy: ConflictPolicy, tie_breaker: Side, tolerance_seconds: i64) -> Self {
        Self {
            policy,
            tie_breaker,
            tolerance_seconds: tolerance_seconds.max(0),
            bidirectional: HashSet::from([Domain::Ratings]),
        }
    }

    pub fn from_config(config: &ResolutionConfig) -> Self {
        Self::new(config.policy(), config.tie_breaker(), config.tolerance_seconds())
            .with_bidirectional(config.bidirectional_domains())
    }

    pub fn with_bidirectional(mut self, domains: impl IntoIterator<Item = Domain>) -> Self {
        self.bidirectional = domains.into_iter().collect();
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Whether conflicts in this domain are arbitrated at all
    pub fn applies(&self, domain: Domain) -> bool {
        self.bidirectional.contains(&domain)
    }

    pub fn winner(&self, local_ts: Option<DateTime<Utc>>, remote_ts: Option<DateTime<Utc>>) -> Side {
        match self.policy {
            ConflictPolicy::RemoteAuthoritative => Side::Remote,
            ConflictPolicy::LocalAuthoritative => Side::Local,
            ConflictPolicy::Latest => match (local_ts, remote_ts) {
                (Some(local), Some(remote)) => {
                    let delta = (local - remote).num_seconds();
                    if delta.abs() <= self.tolerance_seconds {
                        self.tie_breaker
                    } else if delta > 0 {
                        Side::Local
                    } else {
                        Side::Remote
                    }
                }
                _ => self.tie_breaker,
            },
        }
    }

    pub fn resolve(&self, local: &DomainState, remote: &DomainState) -> Resolution {
        if local.tracked_fields() == remote.tracked_fields() {
            return Resolution::Unchanged;
        }

        let side = self.winner(local.timestamp(), remote.timestamp());
        debug!(
            domain = %local.domain(),
            policy = %self.policy,
            winner = %side,
            "Resolved conflict"
        );
        match side {
            Side::Remote => Resolution::WriteLocal(remote.clone()),
            Side::Local => Resolution::SendRemote(local.clone()),
        }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::from_config(&ResolutionConfig::default())
    }
}
