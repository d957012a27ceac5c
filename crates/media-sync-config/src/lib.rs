pub mod config;
pub mod paths;

pub use config::{
    Config, ConflictPolicy, FullModeConfig, LoggingConfig, RefreshFailurePolicy, ResolutionConfig,
    Side, SourceConfig, SyncOptions,
};
pub use paths::{container_base_path, PathManager};
