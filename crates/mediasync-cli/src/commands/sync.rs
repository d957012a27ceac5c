use super::build_orchestrator;
use super::sync_ui::SyncUI;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{Config, PathManager};
use media_sync_core::{SyncMode, SyncOrchestrator, SyncRequest, SyncResult, Trigger};
use media_sync_models::{Account, Domain, MediaType};
use tracing::{debug, warn};

pub struct SyncArgs {
    pub mode: SyncMode,
    pub domains: Vec<String>,
    pub media_types: Vec<String>,
    pub account: Option<u32>,
    pub dry_run: bool,
}

/// Flags win over config; empty flags mean "whatever the config enables"
pub fn build_request(args: &SyncArgs, config: &Config) -> Result<SyncRequest> {
    let domains = if args.domains.is_empty() {
        config.sync.enabled_domains()
    } else {
        args.domains
            .iter()
            .map(|d| Domain::parse(d).ok_or_else(|| eyre!("Unknown domain '{}'", d)))
            .collect::<Result<Vec<_>>>()?
    };
    let media_types = if args.media_types.is_empty() {
        config.sync.media_types()
    } else {
        args.media_types
            .iter()
            .map(|m| MediaType::parse(m).ok_or_else(|| eyre!("Unknown media type '{}'", m)))
            .collect::<Result<Vec<_>>>()?
    };
    let account = Account {
        id: args.account.unwrap_or(config.sync.account_id),
        ..Account::default()
    };

    Ok(SyncRequest::new(args.mode)
        .with_domains(domains)
        .with_media_types(media_types)
        .with_account(account)
        .with_trigger(Trigger::Manual)
        .dry_run(args.dry_run))
}

pub async fn run_sync(args: SyncArgs, config: &Config, paths: &PathManager, output: &Output) -> Result<()> {
    debug!("Sync command started");
    config
        .validate()
        .map_err(|e| eyre!("Configuration validation failed: {}", e))?;

    let request = build_request(&args, config)?;
    let ui = SyncUI::new();
    let orchestrator = build_orchestrator(config, paths, request.account.id).with_progress(ui.callback());
    stop_on_ctrl_c(&orchestrator);

    let result = orchestrator
        .run(request)
        .await
        .map_err(|e| eyre!("Sync operation failed: {}", e))?;
    ui.finish();

    report(&result, args.dry_run, output)
}

/// Ctrl-C stops the run at its next checkpoint
fn stop_on_ctrl_c(orchestrator: &SyncOrchestrator) {
    let handle = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(operation = "interrupt", "Interrupt received, stopping sync");
            handle.stop();
        }
    });
}

fn report(result: &SyncResult, dry_run: bool, output: &Output) -> Result<()> {
    output.sync_result(result);

    if output.is_human() {
        if dry_run {
            output.info("Dry run: nothing was written to the library or the remote account");
        }
        if result.success {
            output.success(format!(
                "{} sync completed: {} changes, {} local writes, {} sent in {:.1}s",
                result.mode,
                result.changes.len(),
                result.stats.local_writes,
                result.stats.artifacts_flushed,
                result.duration().as_secs_f64()
            ));
        }
    }

    match (&result.error, result.success) {
        (_, true) => Ok(()),
        (Some(error), false) => Err(eyre!("{} sync {}: {}", result.mode, result.state, error)),
        (None, false) => Err(eyre!("{} sync {}", result.mode, result.state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SyncArgs {
        SyncArgs {
            mode: SyncMode::Pull,
            domains: Vec::new(),
            media_types: Vec::new(),
            account: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_request_defaults_to_config() {
        let mut config = Config::default();
        config.sync.sync_playback = false;
        config.sync.account_id = 7;

        let request = build_request(&args(), &config).unwrap();

        assert_eq!(request.domains.len(), 4);
        assert!(!request.domains.contains(&Domain::Playback));
        assert_eq!(request.account.id, 7);
        assert_eq!(request.trigger, Trigger::Manual);
    }

    #[test]
    fn test_flags_override_config() {
        let args = SyncArgs {
            domains: vec!["ratings".to_string()],
            media_types: vec!["movies".to_string()],
            account: Some(3),
            dry_run: true,
            ..args()
        };

        let request = build_request(&args, &Config::default()).unwrap();

        assert_eq!(request.domains, vec![Domain::Ratings]);
        assert_eq!(request.media_types, vec![MediaType::Movie]);
        assert_eq!(request.account.id, 3);
        assert!(request.dry_run);
    }

    #[test]
    fn test_unknown_domain_is_rejected() {
        let args = SyncArgs {
            domains: vec!["reviews".to_string()],
            ..args()
        };
        assert!(build_request(&args, &Config::default()).is_err());
    }
}
