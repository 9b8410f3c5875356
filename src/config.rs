//! Optional TOML configuration
//!
//! Looked up at `<config_home>/edavki/config.toml` unless a path is given with
//! `--config` or `EDAVKI_CONFIG`. Every key is optional; command line flags
//! take precedence over values read here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::rates::ecb::{RateFeed, CACHE_MAX_AGE_HOURS, ECB_USD_EUR_URL};
use crate::rates::DEFAULT_LOOKBACK_DAYS;

pub const CONFIG_ENV: &str = "EDAVKI_CONFIG";
pub const OFFLINE_ENV: &str = "EDAVKI_OFFLINE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Slovenian tax number of the taxpayer
    pub tax_number: Option<u32>,
    pub compact_dividends: bool,
    pub compact_positions: bool,
    pub treaty_relief: bool,
    pub rate_lookback_days: i64,
    pub rates_url: String,
    pub rates_cache_hours: u64,
    pub countries_file: Option<PathBuf>,
    pub addresses_file: Option<PathBuf>,
    pub treaties_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tax_number: None,
            compact_dividends: false,
            compact_positions: false,
            treaty_relief: false,
            rate_lookback_days: DEFAULT_LOOKBACK_DAYS,
            rates_url: ECB_USD_EUR_URL.to_string(),
            rates_cache_hours: CACHE_MAX_AGE_HOURS,
            countries_file: None,
            addresses_file: None,
            treaties_file: None,
            output_dir: None,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("edavki").join("config.toml"))
}

impl Config {
    /// Load from an explicit path, `EDAVKI_CONFIG`, or the default location.
    ///
    /// An explicitly named file must exist; a missing default file yields the
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match explicit {
            Some(path) => Self::from_file(&path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Rate feed settings, honouring `EDAVKI_OFFLINE`
    pub fn rate_feed(&self) -> RateFeed {
        RateFeed {
            url: self.rates_url.clone(),
            cache_max_age_hours: self.rates_cache_hours,
            offline: offline_from_env(),
        }
    }
}

pub fn offline_from_env() -> bool {
    std::env::var(OFFLINE_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rate_lookback_days, 14);
        assert_eq!(config.rates_cache_hours, 24);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = Config::parse(
            r#"
tax_number = 12345678
compact_dividends = true
rate_lookback_days = 7
treaties_file = "/etc/edavki/treaties.csv"
"#,
        )
        .unwrap();

        assert_eq!(config.tax_number, Some(12345678));
        assert!(config.compact_dividends);
        assert!(!config.compact_positions);
        assert_eq!(config.rate_lookback_days, 7);
        assert_eq!(config.treaties_file, Some(PathBuf::from("/etc/edavki/treaties.csv")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("tax_nubmer = 1").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "output_dir = \"out\"\ncompact_positions = true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert!(config.compact_positions);
    }
}
