//! Bridge Configuration Module
//!
//! Loads the bridge configuration from a TOML file, an optional
//! environment-specific overlay and `FIXBRIDGE_` environment variables.

use crate::session::{ConfigError, SessionCredentials, SessionSettings};
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use types::PriceScale;

/// Environment variable prefix; `FIXBRIDGE_RELAY__URL` overrides `relay.url`
pub const ENV_PREFIX: &str = "FIXBRIDGE";

pub const DEFAULT_CONFIG_PATH: &str = "config/bridge.toml";

/// Top level configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    pub log_level: String,
    /// Bound on each shutdown step
    pub shutdown_timeout_ms: u64,
    pub session: SessionSettings,
    pub relay: RelaySettings,
    pub scheduler: SchedulerSettings,
    pub pricing: PricingSettings,
}

/// Pricing relay connection
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RelaySettings {
    pub url: String,
    pub queue_capacity: usize,
    pub connect_timeout_ms: u64,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Attempts per outage before the client reports failure
    pub max_reconnect_attempts: u32,
    pub close_timeout_ms: u64,
    /// Instrument symbol to relay price account
    pub accounts: BTreeMap<String, String>,
}

/// Market data re-subscription
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SchedulerSettings {
    pub interval_secs: u64,
    /// Empty means every known instrument
    pub watch_list: Vec<String>,
    pub subscription_request_type: String,
    pub market_depth: u32,
    pub entry_types: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PricingSettings {
    pub price_exponent: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            shutdown_timeout_ms: 5_000,
            session: SessionSettings::default(),
            relay: RelaySettings::default(),
            scheduler: SchedulerSettings::default(),
            pricing: PricingSettings::default(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8910/".to_string(),
            queue_capacity: 1_024,
            connect_timeout_ms: 10_000,
            base_backoff_ms: 100,
            max_backoff_ms: 30_000,
            max_reconnect_attempts: 10,
            close_timeout_ms: 1_000,
            accounts: BTreeMap::new(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            watch_list: Vec::new(),
            // snapshot + updates
            subscription_request_type: "1".to_string(),
            market_depth: 0,
            entry_types: vec!["0".to_string(), "1".to_string()],
        }
    }
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            price_exponent: PriceScale::default().exponent(),
        }
    }
}

impl RelaySettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Relay account an instrument is published under
    pub fn account_for<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.accounts
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(symbol)
    }
}

impl SchedulerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl PricingSettings {
    pub fn scale(&self) -> PriceScale {
        PriceScale::new(self.price_exponent)
    }
}

impl BridgeConfig {
    /// Load configuration from files with environment overrides
    ///
    /// `environment` selects `environments/<name>.toml` next to the base
    /// file; a missing overlay is logged and skipped.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        if let Some(env) = environment {
            let env_file = environment_overlay(base, env);

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Values stay strings: a password of "0012" must not become 12
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scheduler.watch_list")
                .with_list_parse_key("scheduler.entry_types")
                .try_parsing(false),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let loaded: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        debug!(path = ?base, "Configuration loaded");
        Ok(loaded)
    }

    /// Expand environment variables in string values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let expanded = shellexpand::env(&self.relay.url).context("Failed to expand relay URL")?;
        self.relay.url = expanded.to_string();

        for (name, value) in self.session.values_mut() {
            let expanded = shellexpand::env(value.as_str())
                .with_context(|| format!("Failed to expand session setting '{}'", name))?
                .to_string();
            *value = expanded;
        }

        Ok(())
    }

    /// Check everything the bridge relies on before a session is attempted
    pub fn validate(&self) -> std::result::Result<SessionCredentials, ConfigError> {
        let relay = &self.relay;
        if !(relay.url.starts_with("ws://") || relay.url.starts_with("wss://")) {
            return Err(ConfigError::invalid(
                "relay.url",
                format!("'{}' is not a ws:// or wss:// URL", relay.url),
            ));
        }
        if relay.queue_capacity == 0 {
            return Err(ConfigError::invalid("relay.queue_capacity", "must be non-zero"));
        }
        if relay.max_reconnect_attempts == 0 {
            return Err(ConfigError::invalid(
                "relay.max_reconnect_attempts",
                "must be non-zero",
            ));
        }
        if relay.base_backoff_ms == 0 || relay.base_backoff_ms > relay.max_backoff_ms {
            return Err(ConfigError::invalid(
                "relay.base_backoff_ms",
                format!(
                    "must be in 1..={} (relay.max_backoff_ms)",
                    relay.max_backoff_ms
                ),
            ));
        }
        if relay.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "relay.connect_timeout_ms",
                "must be non-zero",
            ));
        }

        let scheduler = &self.scheduler;
        if scheduler.interval_secs == 0 {
            return Err(ConfigError::invalid(
                "scheduler.interval_secs",
                "must be non-zero",
            ));
        }
        if scheduler.entry_types.is_empty() {
            return Err(ConfigError::invalid(
                "scheduler.entry_types",
                "at least one entry type is required",
            ));
        }
        if scheduler.subscription_request_type.trim().is_empty() {
            return Err(ConfigError::missing("scheduler.subscription_request_type"));
        }

        PriceScale::try_new(self.pricing.price_exponent)
            .map_err(|e| ConfigError::invalid("pricing.price_exponent", e.to_string()))?;

        SessionCredentials::from_settings(&self.session)
    }

    /// Effective configuration as TOML with credentials redacted
    pub fn render(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.session = self.session.redacted();
        toml::to_string(&shown).context("Failed to render configuration")
    }
}

/// Convenience function: load, expand and validate
pub fn load_config(
    base_path: Option<&Path>,
    environment: Option<&str>,
) -> Result<(BridgeConfig, SessionCredentials)> {
    let mut config = BridgeConfig::load(base_path, environment)?;
    config.expand_env_vars()?;
    let credentials = config.validate()?;
    Ok((config, credentials))
}

/// Default location of the environment overlay for `base`
pub fn environment_overlay(base: &Path, environment: &str) -> PathBuf {
    base.parent()
        .unwrap_or(Path::new("."))
        .join("environments")
        .join(format!("{}.toml", environment))
}
