//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the file named by `SHIFTYCOIN_CONFIG`) and
//! deserializes it into strongly-typed structs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "SHIFTYCOIN_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub casino: CasinoConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub loans: LoansConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CasinoConfig {
    pub name: String,
    pub currency: String,
    /// How long a payment request is kept after it was created or paid.
    #[serde(default = "default_request_ttl_secs")]
    pub request_ttl_secs: u64,
}

fn default_request_ttl_secs() -> u64 {
    86_400
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn balances_path(&self) -> PathBuf {
        self.data_dir.join("balances.json")
    }

    pub fn loans_path(&self) -> PathBuf {
        self.data_dir.join("loans.json")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoansConfig {
    /// Monthly rate for a single active loan.
    pub base_rate: f64,
    /// Added per additional active loan.
    pub rate_step: f64,
    /// How often the binary runs batch accrual.
    pub accrual_interval_secs: u64,
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.05,
            rate_step: 0.02,
            accrual_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `SHIFTYCOIN_CONFIG` if set, else `config.toml`.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(&path)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        anyhow::ensure!(
            config.loans.accrual_interval_secs > 0,
            "loans.accrual_interval_secs must be positive"
        );
        Ok(config)
    }
}
