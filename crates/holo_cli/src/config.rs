//! Engine configuration file handling
//!
//! Tunables live in `holo.toml`. An explicit `--config` path wins; otherwise
//! the scenario's directory is searched, and the built-in defaults apply
//! when no file exists.

use anyhow::{Context, Result};
use holo_card::CardConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "holo.toml";

/// Where the effective configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Load a configuration file
pub fn load_file(path: &Path) -> Result<CardConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = CardConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Resolve the configuration for a run
pub fn resolve(explicit: Option<&Path>, search_dir: &Path) -> Result<(CardConfig, ConfigSource)> {
    if let Some(path) = explicit {
        return Ok((load_file(path)?, ConfigSource::File(path.to_path_buf())));
    }

    let candidate = search_dir.join(CONFIG_FILE);
    if candidate.exists() {
        return Ok((load_file(&candidate)?, ConfigSource::File(candidate)));
    }

    Ok((CardConfig::default(), ConfigSource::Defaults))
}

/// Render a configuration as TOML
pub fn to_toml(config: &CardConfig) -> Result<String> {
    config
        .to_toml_string()
        .context("Failed to serialize config")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("holo-cli-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = temp_dir("defaults");
        let (config, source) = resolve(None, &dir).unwrap();
        assert_eq!(config, CardConfig::default());
        assert!(matches!(source, ConfigSource::Defaults));
    }

    #[test]
    fn test_loads_from_search_dir() {
        let dir = temp_dir("search");
        fs::write(
            dir.join(CONFIG_FILE),
            "[showcase]\ninitial_delay_ms = 500.0\n",
        )
        .unwrap();

        let (config, source) = resolve(None, &dir).unwrap();
        assert_eq!(config.showcase.initial_delay_ms, 500.0);
        assert!(matches!(source, ConfigSource::File(_)));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_default_toml_round_trips() {
        let text = to_toml(&CardConfig::default()).unwrap();
        assert_eq!(CardConfig::from_toml_str(&text).unwrap(), CardConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = temp_dir("missing");
        let err = resolve(Some(&dir.join("nope.toml")), &dir).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
