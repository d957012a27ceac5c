use anyhow::{Context, Result};
use media_sync_config::PathManager;
use media_sync_models::Activities;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Remote "last activities" persisted between runs
///
/// The only state the engine keeps across runs. A missing or unreadable
/// file means no watermark, so the next fast pull fetches everything.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_account(paths: &PathManager, account_id: u32) -> Self {
        Self::new(paths.watermark_file(account_id))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Activities> {
        if !self.path.exists() {
            debug!("No stored watermark at {}", self.path.display());
            return None;
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Activities>(&content) {
                Ok(activities) => {
                    debug!(
                        "Loaded watermark with {} buckets from {}",
                        activities.entries.len(),
                        self.path.display()
                    );
                    Some(activities)
                }
                Err(e) => {
                    warn!(
                        "Watermark corruption detected at {}: {}. Deleting corrupted file.",
                        self.path.display(),
                        e
                    );
                    if let Err(rm_err) = std::fs::remove_file(&self.path) {
                        warn!("Failed to delete corrupted watermark file: {}", rm_err);
                    }
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read watermark file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, activities: &Activities) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(activities)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write watermark {}", self.path.display()))?;
        debug!("Watermark saved to {}", self.path.display());
        Ok(())
    }

    /// Forget the watermark; returns whether one existed
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove watermark {}", self.path.display()))?;
        info!("Cleared watermark {}", self.path.display());
        Ok(true)
    }
}
