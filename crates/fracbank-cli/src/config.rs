//! CLI Configuration
//!
//! Layered from config files and `FRACBANK__*` environment variables.

use anyhow::Context;
use fracbank_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ledger settings
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults for the `stress` command
    #[serde(default)]
    pub stress: StressConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Randomized stress run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    #[serde(default = "default_accounts")]
    pub accounts: usize,

    #[serde(default = "default_classes")]
    pub classes: usize,

    /// RNG seed; a run is reproducible from it
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Supply minted per class
    #[serde(default = "default_class_supply")]
    pub class_supply: u64,

    /// Shares handed to every account per class
    #[serde(default = "default_shares_per_account")]
    pub shares_per_account: u64,

    /// Payment-asset funds minted to every account
    #[serde(default = "default_funds_per_account")]
    pub funds_per_account: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            accounts: default_accounts(),
            classes: default_classes(),
            seed: default_seed(),
            class_supply: default_class_supply(),
            shares_per_account: default_shares_per_account(),
            funds_per_account: default_funds_per_account(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_iterations() -> usize {
    1000
}

fn default_accounts() -> usize {
    10
}

fn default_classes() -> usize {
    10
}

fn default_seed() -> u64 {
    42
}

fn default_class_supply() -> u64 {
    100_000
}

fn default_shares_per_account() -> u64 {
    100
}

fn default_funds_per_account() -> u64 {
    100_000
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        // An explicit file must exist and overrides the defaults
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FRACBANK")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Check values the ledger and stress run cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            matches!(self.logging.format.as_str(), "json" | "pretty"),
            "logging.format must be 'json' or 'pretty', got '{}'",
            self.logging.format
        );
        anyhow::ensure!(self.ledger.event_capacity > 0, "ledger.event_capacity must be positive");
        anyhow::ensure!(self.stress.accounts >= 2, "stress.accounts must be at least 2");
        anyhow::ensure!(self.stress.classes >= 1, "stress.classes must be at least 1");
        let handed_out = u128::from(self.stress.shares_per_account) * self.stress.accounts as u128;
        anyhow::ensure!(
            handed_out <= u128::from(self.stress.class_supply),
            "stress.class_supply {} cannot cover {} accounts x {} shares",
            self.stress.class_supply,
            self.stress.accounts,
            self.stress.shares_per_account
        );
        Ok(())
    }
}
