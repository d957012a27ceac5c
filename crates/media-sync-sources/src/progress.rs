use std::sync::Arc;
use tracing::{info, warn};

/// One progress report for a handler's item loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Handler label, e.g. `pull:ratings:movie`
    pub label: String,
    pub current: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Progress tracker for operations that process multiple items
///
/// Forwards every tick to the optional callback and logs periodic progress
/// plus a final summary to keep log noise down.
pub struct ProgressTracker {
    label: String,
    total: usize,
    added: usize,
    removed: usize,
    changed: usize,
    unchanged: usize,
    skipped: usize,
    start_time: std::time::Instant,
    progress_interval: usize, // Log every N items
    last_progress_log: usize,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `label` - Handler label passed to the callback
    /// * `total` - Total number of items to process
    /// * `progress_interval` - Log progress every N items
    pub fn new(label: impl Into<String>, total: usize, progress_interval: usize) -> Self {
        Self {
            label: label.into(),
            total,
            added: 0,
            removed: 0,
            changed: 0,
            unchanged: 0,
            skipped: 0,
            start_time: std::time::Instant::now(),
            progress_interval: progress_interval.max(1),
            last_progress_log: 0,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn record_added(&mut self) {
        self.added += 1;
    }

    pub fn record_removed(&mut self) {
        self.removed += 1;
    }

    pub fn record_changed(&mut self) {
        self.changed += 1;
    }

    /// Count keys that were evaluated and needed no action
    pub fn record_unchanged(&mut self, count: usize) {
        self.unchanged += count;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Report that `current` items (1-based) have been processed
    pub fn tick(&mut self, current: usize) {
        if let Some(ref callback) = self.callback {
            callback(&ProgressUpdate {
                label: self.label.clone(),
                current,
                total: self.total,
            });
        }

        if current.saturating_sub(self.last_progress_log) >= self.progress_interval || current == self.total {
            let elapsed = self.start_time.elapsed();
            // Cache-speed loops finish before a progress line is useful
            if elapsed.as_secs_f64() < 0.5 && current < self.total {
                return;
            }
            info!(
                handler = %self.label,
                "Progress: {}/{} | Added: {} | Removed: {} | Changed: {} | Skipped: {}",
                current, self.total, self.added, self.removed, self.changed, self.skipped
            );
            self.last_progress_log = current;
        }
    }

    /// Log final summary of the operation
    pub fn log_summary(&self) {
        let elapsed = self.start_time.elapsed();
        if self.skipped > 0 {
            warn!(
                handler = %self.label,
                "{} completed: {} total in {:.1}s | Added: {} | Removed: {} | Changed: {} | Unchanged: {} | Skipped: {}",
                self.label, self.total, elapsed.as_secs_f64(),
                self.added, self.removed, self.changed, self.unchanged, self.skipped
            );
        } else if elapsed.as_secs_f64() > 0.1 || self.added + self.removed + self.changed > 0 {
            info!(
                handler = %self.label,
                "{} completed: {} total in {:.1}s | Added: {} | Removed: {} | Changed: {} | Unchanged: {}",
                self.label, self.total, elapsed.as_secs_f64(),
                self.added, self.removed, self.changed, self.unchanged
            );
        }
    }
}
