//! Config file loading

use crate::domain::Config;
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "REDWING_";
const SECTION: &str = "redwing";

/// Load the effective configuration for `root`: defaults, then the config
/// file (explicit or discovered), then `REDWING_*` environment overrides.
pub fn load_config(root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let file_config = load_file_config(root, config_path)?;
    Figment::from(Serialized::defaults(file_config))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Invalid REDWING_* environment override")
}

fn load_file_config(root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let explicit = config_path.is_some();
    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(root),
    };

    let Some(config_file) = discovered else {
        return Ok(Config::default());
    };

    match parse_config_file(&config_file) {
        Ok(cfg) => {
            tracing::debug!(path = %config_file.display(), "loaded config");
            Ok(cfg)
        }
        Err(e) if explicit => Err(e),
        Err(e) => {
            tracing::warn!("Failed to parse auto-discovered config {}: {:#}", config_file.display(), e);
            Ok(Config::default())
        }
    }
}

fn parse_config_file(config_file: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;
    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => parse_toml_config(&content, config_file),
        "yaml" | "yml" => parse_yaml_config(&content, config_file),
        other => anyhow::bail!("Unsupported config extension '.{}' for file {}", other, config_file.display()),
    }
}

/// TOML config, optionally nested under `[redwing]`.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;
    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };
    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;
    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };
    serde_yaml::from_value(config_val).with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(root: &Path) -> Option<PathBuf> {
    ["redwing.toml", ".redwing.toml", "redwing.yml", ".redwing.yml", "redwing.yaml"]
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file())
}
