use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use media_sync_config::Config;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Missing file means defaults; a file that exists must parse
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    Config::load_from_file(&path.to_path_buf())
        .map_err(|e| eyre!("{}", e))
        .wrap_err_with(|| format!("Invalid config file {}", path.display()))
}

pub fn run_config(cmd: ConfigCommands, config: &Config, path: &Path, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config, path, output),
        ConfigCommands::Init { force } => init(&path.to_path_buf(), force, output),
    }
}

fn show(config: &Config, path: &Path, output: &Output) -> Result<()> {
    if !output.is_human() {
        output.json(&json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "domains": config.sync.enabled_domains(),
            "media_types": config.sync.media_types(),
            "account_id": config.sync.account_id,
            "policy": config.resolution.policy().to_string(),
            "bidirectional": config.resolution.bidirectional_domains(),
            "on_refresh_failure": config.full.on_refresh_failure().to_string(),
        }));
        return Ok(());
    }

    let rendered = toml::to_string_pretty(config).wrap_err("Failed to render configuration")?;
    if path.exists() {
        output.info(format!("# {}", path.display()));
    } else {
        output.info(format!("# {} (not found, showing defaults)", path.display()));
    }
    output.info(rendered);
    Ok(())
}

fn init(path: &PathBuf, force: bool, output: &Output) -> Result<()> {
    if path.exists() && !force {
        output.warn(format!("{} already exists, use --force to overwrite", path.display()));
        return Ok(());
    }
    Config::default()
        .save_to_file(path)
        .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
    output.success(format!("Wrote default configuration to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.sync.account_id, 1);
    }

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let output = Output::new(OutputFormat::Json, true);

        init(&path, false, &output).unwrap();
        assert!(path.exists());
        assert!(load_config(&path).is_ok());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
