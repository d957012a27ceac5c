use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{Config, PathManager};
use media_sync_core::WatermarkStore;

pub fn run_clear(
    watermark: bool,
    account: Option<u32>,
    config: &Config,
    paths: &PathManager,
    output: &Output,
) -> Result<()> {
    if !watermark {
        output.warn("No clear option specified. Use --watermark");
        output.info("\nExample: mediasync clear --watermark");
        return Ok(());
    }

    let account_id = account.unwrap_or(config.sync.account_id);
    let store = WatermarkStore::for_account(paths, account_id);
    let cleared = store
        .clear()
        .map_err(|e| eyre!("Failed to clear watermark at {}: {}", store.path().display(), e))?;

    if cleared {
        output.success(format!(
            "Cleared watermark for account {}: next fast pull fetches everything",
            account_id
        ));
    } else {
        output.info(format!("No watermark stored for account {}", account_id));
    }
    Ok(())
}
