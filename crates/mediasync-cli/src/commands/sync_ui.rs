use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use media_sync_sources::{ProgressCallback, ProgressUpdate};
use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

/// One progress bar per handler label, or structured log lines when not on
/// a terminal
pub struct SyncUI {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    style: Option<ProgressStyle>,
    interactive: bool,
}

impl SyncUI {
    pub fn new() -> Arc<Self> {
        let interactive = is_interactive();
        let style = ProgressStyle::default_bar()
            .template("  {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .ok()
            .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "));

        if !interactive {
            tracing::info!(
                operation = "ui_init",
                mode = "non_interactive",
                "Running in non-interactive mode - progress bars disabled, using structured logging"
            );
        }

        Arc::new(Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            style,
            interactive,
        })
    }

    /// Callback handed to the orchestrator
    pub fn callback(self: &Arc<Self>) -> ProgressCallback {
        let ui = Arc::clone(self);
        Arc::new(move |update: &ProgressUpdate| ui.update(update))
    }

    fn update(&self, update: &ProgressUpdate) {
        if !self.interactive {
            if update.current == update.total {
                tracing::info!(
                    operation = "progress",
                    handler = %update.label,
                    current = update.current,
                    total = update.total,
                    "Handler finished evaluating"
                );
            }
            return;
        }

        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        let bar = bars.entry(update.label.clone()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(update.total as u64));
            if let Some(style) = &self.style {
                bar.set_style(style.clone());
            }
            bar.set_message(update.label.clone());
            bar
        });
        bar.set_length(update.total as u64);
        bar.set_position(update.current as u64);
        if update.current >= update.total {
            bar.finish();
        }
    }

    pub fn finish(&self) {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        for bar in bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
