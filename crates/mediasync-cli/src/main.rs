use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::WrapErr;
use commands::{clear, config, sync};
use media_sync_core::SyncMode;
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "mediasync")]
#[command(about = "mediasync - Keep a media library and a watch-tracking account in step")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Config file (defaults to config.toml in the config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Pull,
    Push,
    FastPull,
    Full,
}

impl From<ModeArg> for SyncMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Pull => SyncMode::Pull,
            ModeArg::Push => SyncMode::Push,
            ModeArg::FastPull => SyncMode::FastPull,
            ModeArg::Full => SyncMode::Full,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync between the library and the remote account
    #[command(long_about = "Reconcile the local library with the remote account. Domains and media types default to the ones enabled in the configuration.")]
    Sync {
        /// Direction and scope of the run
        #[arg(long, value_enum, default_value = "full")]
        mode: ModeArg,

        /// Restrict to these domains (watched, ratings, collection, playback, watchlist for the watchlist and custom lists)
        #[arg(long = "domain", value_name = "DOMAIN")]
        domains: Vec<String>,

        /// Restrict to these media types (movie, show, season, episode)
        #[arg(long = "media-type", value_name = "TYPE")]
        media_types: Vec<String>,

        /// Library account to sync (defaults to sync.account_id)
        #[arg(long)]
        account: Option<u32>,

        /// Evaluate and report changes without writing anywhere
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Clear persisted sync state
    #[command(long_about = "Clear persisted sync state. --watermark forgets the stored remote activity watermark so the next fast pull fetches everything.")]
    Clear {
        /// Forget the stored remote watermark
        #[arg(long, action = ArgAction::SetTrue)]
        watermark: bool,

        /// Account whose watermark to clear (defaults to sync.account_id)
        #[arg(long)]
        account: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let paths = media_sync_config::PathManager::default();
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let loaded = config::load_config(&config_path).wrap_err("Failed to load configuration")?;

    logging::init_logging(cli.verbose, cli.quiet, &loaded.logging)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync {
            mode,
            domains,
            media_types,
            account,
            dry_run,
        } => {
            let options = sync::SyncArgs {
                mode: mode.into(),
                domains,
                media_types,
                account,
                dry_run,
            };
            sync::run_sync(options, &loaded, &paths, &output).await
        }
        Commands::Config { cmd } => config::run_config(cmd, &loaded, &config_path, &output),
        Commands::Clear { watermark, account } => clear::run_clear(watermark, account, &loaded, &paths, &output),
    }
}
