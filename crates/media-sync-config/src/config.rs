use media_sync_models::{Domain, MediaType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub full: FullModeConfig,
    #[serde(default)]
    pub sources: SourceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncOptions {
    #[serde(default = "default_true")]
    pub sync_watched: bool,
    #[serde(default = "default_true")]
    pub sync_ratings: bool,
    #[serde(default = "default_true")]
    pub sync_collection: bool,
    #[serde(default = "default_true")]
    pub sync_playback: bool,
    #[serde(default = "default_true")]
    pub sync_watchlist: bool,
    #[serde(default = "default_media_types")]
    pub media_types: Vec<String>,
    #[serde(default = "default_account_id")]
    pub account_id: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_watched: true,
            sync_ratings: true,
            sync_collection: true,
            sync_playback: true,
            sync_watchlist: true,
            media_types: default_media_types(),
            account_id: default_account_id(),
        }
    }
}

impl SyncOptions {
    pub fn enabled_domains(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|domain| match domain {
                Domain::Watched => self.sync_watched,
                Domain::Ratings => self.sync_ratings,
                Domain::Collection => self.sync_collection,
                Domain::Playback => self.sync_playback,
                Domain::Watchlist => self.sync_watchlist,
            })
            .collect()
    }

    /// Parsed media types; unknown names are skipped with a warning
    pub fn media_types(&self) -> Vec<MediaType> {
        let mut types = Vec::new();
        for name in &self.media_types {
            match MediaType::parse(name) {
                Some(media_type) if !types.contains(&media_type) => types.push(media_type),
                Some(_) => {}
                None => warn!(
                    option = "sync.media_types",
                    value = %name,
                    "Ignoring unknown media type"
                ),
            }
        }
        if types.is_empty() {
            warn!(
                option = "sync.media_types",
                "No valid media types configured, falling back to defaults"
            );
            types = vec![MediaType::Movie, MediaType::Show, MediaType::Episode];
        }
        types
    }
}

/// Who wins when both sides changed a bidirectional value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Newer timestamp wins
    Latest,
    RemoteAuthoritative,
    LocalAuthoritative,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictPolicy::Latest => "latest",
            ConflictPolicy::RemoteAuthoritative => "remote",
            ConflictPolicy::LocalAuthoritative => "local",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Local,
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Local => "local",
            Side::Remote => "remote",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolutionConfig {
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Domains where both sides may write (others follow the run direction)
    #[serde(default = "default_bidirectional")]
    pub bidirectional: Vec<String>,

    #[serde(default = "default_timestamp_tolerance_seconds")]
    pub timestamp_tolerance_seconds: i64,

    /// Winner under `latest` when timestamps are missing or within tolerance
    #[serde(default = "default_tie_breaker")]
    pub tie_breaker: String,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            bidirectional: default_bidirectional(),
            timestamp_tolerance_seconds: default_timestamp_tolerance_seconds(),
            tie_breaker: default_tie_breaker(),
        }
    }
}

impl ResolutionConfig {
    pub fn policy(&self) -> ConflictPolicy {
        parse_policy(&self.policy).unwrap_or_else(|| {
            warn!(
                option = "resolution.policy",
                value = %self.policy,
                fallback = %ConflictPolicy::Latest,
                "Invalid conflict policy, using default"
            );
            ConflictPolicy::Latest
        })
    }

    pub fn tie_breaker(&self) -> Side {
        parse_side(&self.tie_breaker).unwrap_or_else(|| {
            warn!(
                option = "resolution.tie_breaker",
                value = %self.tie_breaker,
                fallback = %Side::Remote,
                "Invalid tie breaker, using default"
            );
            Side::Remote
        })
    }

    pub fn bidirectional_domains(&self) -> Vec<Domain> {
        self.bidirectional
            .iter()
            .filter_map(|name| {
                let domain = Domain::parse(name);
                if domain.is_none() {
                    warn!(
                        option = "resolution.bidirectional",
                        value = %name,
                        "Ignoring unknown domain"
                    );
                }
                domain
            })
            .collect()
    }

    /// Tolerance as a non-negative number of seconds
    pub fn tolerance_seconds(&self) -> i64 {
        if self.timestamp_tolerance_seconds < 0 {
            warn!(
                option = "resolution.timestamp_tolerance_seconds",
                value = self.timestamp_tolerance_seconds,
                "Negative tolerance, using 0"
            );
            return 0;
        }
        self.timestamp_tolerance_seconds
    }
}

/// What a full run does when the remote refresh fails before the push phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshFailurePolicy {
    /// Skip the push phase and fail the run
    Abort,
    /// Push with the primed local snapshot anyway
    Continue,
}

impl fmt::Display for RefreshFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefreshFailurePolicy::Abort => "abort",
            RefreshFailurePolicy::Continue => "continue",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FullModeConfig {
    #[serde(default = "default_on_refresh_failure")]
    pub on_refresh_failure: String,
}

impl Default for FullModeConfig {
    fn default() -> Self {
        Self {
            on_refresh_failure: default_on_refresh_failure(),
        }
    }
}

impl FullModeConfig {
    pub fn on_refresh_failure(&self) -> RefreshFailurePolicy {
        match self.on_refresh_failure.trim().to_lowercase().as_str() {
            "abort" => RefreshFailurePolicy::Abort,
            "continue" => RefreshFailurePolicy::Continue,
            other => {
                warn!(
                    option = "full.on_refresh_failure",
                    value = %other,
                    fallback = %RefreshFailurePolicy::Abort,
                    "Invalid refresh failure policy, using default"
                );
                RefreshFailurePolicy::Abort
            }
        }
    }
}

/// Where the JSON-backed collaborators keep their documents
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub library_path: Option<PathBuf>,
    #[serde(default)]
    pub remote_path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json_logging(),
            file: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_media_types() -> Vec<String> {
    vec!["movies".to_string(), "shows".to_string(), "episodes".to_string()]
}

fn default_account_id() -> u32 {
    1
}

fn default_policy() -> String {
    "latest".to_string()
}

fn default_bidirectional() -> Vec<String> {
    vec!["ratings".to_string()]
}

fn default_timestamp_tolerance_seconds() -> i64 {
    60
}

fn default_tie_breaker() -> String {
    "remote".to_string()
}

fn default_on_refresh_failure() -> String {
    "abort".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

fn parse_policy(value: &str) -> Option<ConflictPolicy> {
    match value.trim().to_lowercase().replace('-', "_").as_str() {
        "latest" | "newest" => Some(ConflictPolicy::Latest),
        "remote" | "remote_authoritative" => Some(ConflictPolicy::RemoteAuthoritative),
        "local" | "local_authoritative" => Some(ConflictPolicy::LocalAuthoritative),
        _ => None,
    }
}

fn parse_side(value: &str) -> Option<Side> {
    match value.trim().to_lowercase().as_str() {
        "local" => Some(Side::Local),
        "remote" => Some(Side::Remote),
        _ => None,
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Hard errors only; soft option errors fall back to defaults at use sites
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sync.enabled_domains().is_empty() {
            return Err(anyhow::anyhow!("at least one sync domain must be enabled"));
        }

        if self.resolution.timestamp_tolerance_seconds < 0 {
            return Err(anyhow::anyhow!("timestamp_tolerance_seconds must be non-negative"));
        }

        if self.sync.account_id == 0 {
            return Err(anyhow::anyhow!("account_id must be positive"));
        }

        Ok(())
    }
}
