use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use media_sync_core::SyncResult;
use media_sync_models::ChangeAction;
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.message("success", msg.as_ref(), |m| println!("{} {}", "✓".green(), m));
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.message("info", msg.as_ref(), |m| println!("{}", m));
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.message("warning", msg.as_ref(), |m| println!("{} {}", "⚠".yellow(), m));
    }

    /// Errors are shown even in quiet mode
    pub fn error(&self, msg: impl AsRef<str>) {
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "✗".red(), msg.as_ref()),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "error", "message": msg.as_ref() }))
            }
        }
    }

    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet && !self.is_human() {
            return;
        }
        self.print_json(data);
    }

    fn message(&self, kind: &str, msg: &str, human: impl FnOnce(&str)) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => human(msg),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": kind, "message": msg }))
            }
        }
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(data).unwrap_or_default()),
            OutputFormat::JsonPretty => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default())
            }
            OutputFormat::Human => println!("{}", data),
        }
    }

    /// Print a run's outcome in the selected format
    pub fn sync_result(&self, result: &SyncResult) {
        if !self.is_human() {
            match serde_json::to_value(result) {
                Ok(value) => self.json(&value),
                Err(e) => self.error(format!("Failed to serialize sync result: {}", e)),
            }
            return;
        }
        if self.quiet {
            return;
        }

        if result.changes.is_empty() {
            self.info("No changes");
        } else {
            println!("{}", change_table(result));
        }
        for failure in &result.failures {
            self.warn(format!("{} failed: {}", failure.handler, failure.error));
        }
    }
}

/// Per-domain change counts of one run
pub fn change_table(result: &SyncResult) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Domain", "Added", "Removed", "Changed"]);

    for (domain, records) in &result.changes.domains {
        let count = |action: ChangeAction| records.iter().filter(|r| r.action == action).count();
        table.add_row(vec![
            Cell::new(domain),
            Cell::new(count(ChangeAction::Added)),
            Cell::new(count(ChangeAction::Removed)),
            Cell::new(count(ChangeAction::Changed)),
        ]);
    }
    table
}
