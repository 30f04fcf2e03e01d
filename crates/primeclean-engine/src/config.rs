//! # Engine Configuration
//!
//! Store location, tax convention and invoicing terms.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PRIMECLEAN_DB_PATH=/var/lib/primeclean/primeclean.db               │
//! │     PRIMECLEAN_TAX_MODE=exclusive                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/primeclean/engine.toml (Linux)                           │
//! │     ~/Library/Application Support/com.primeclean.engine/engine.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     inclusive tax at 700 bps, net 30                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/primeclean/primeclean.db"
//! max_connections = 5
//!
//! [tax]
//! mode = "inclusive"   # inclusive | exclusive
//! rate_bps = 700       # 6% state + 1% discretionary surtax
//!
//! [invoicing]
//! net_days = 30
//! company_name = "Premier Prime Cleaning Services"
//! tax_id = "FL-TAX-ID-123456"
//! default_country = "United States"
//! # terms = "..."     # replaces the generated terms text
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use primeclean_core::invoicing::{
    default_terms, TaxPolicy, DEFAULT_COUNTRY, DEFAULT_NET_DAYS, DEFAULT_TAX_RATE,
};
use primeclean_core::validation::validate_net_days;
use primeclean_core::{TaxMode, TaxRate};
use primeclean_db::DbConfig;

const CONFIG_FILE: &str = "engine.toml";
const DB_FILE: &str = "primeclean.db";

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; created on first start.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "primeclean", "engine")
}

fn default_db_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DB_FILE))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// The one tax convention applied to every invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    #[serde(default)]
    pub mode: TaxMode,

    /// Combined rate in basis points.
    #[serde(default = "default_rate_bps")]
    pub rate_bps: u32,
}

fn default_rate_bps() -> u32 {
    DEFAULT_TAX_RATE.bps()
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            mode: TaxMode::default(),
            rate_bps: default_rate_bps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicingSettings {
    /// Days between issue and due date unless a request overrides it.
    #[serde(default = "default_net_days")]
    pub net_days: i64,

    #[serde(default = "default_company_name")]
    pub company_name: String,

    #[serde(default = "default_tax_id")]
    pub tax_id: String,

    /// Country written on billing snapshots that carry none.
    #[serde(default = "default_country")]
    pub default_country: String,

    /// Replaces the generated terms text when set.
    #[serde(default)]
    pub terms: Option<String>,
}

fn default_net_days() -> i64 {
    DEFAULT_NET_DAYS
}

fn default_company_name() -> String {
    "Premier Prime Cleaning Services".to_string()
}

fn default_tax_id() -> String {
    "FL-TAX-ID-123456".to_string()
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl Default for InvoicingSettings {
    fn default() -> Self {
        InvoicingSettings {
            net_days: default_net_days(),
            company_name: default_company_name(),
            tax_id: default_tax_id(),
            default_country: default_country(),
            terms: None,
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub invoicing: InvoicingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    EngineError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.tax.rate_bps > 10_000 {
            return Err(EngineError::Config(format!(
                "tax.rate_bps must be at most 10000, got {}",
                self.tax.rate_bps
            )));
        }

        validate_net_days(self.invoicing.net_days)
            .map_err(|e| EngineError::Config(e.to_string()))?;

        if self.invoicing.company_name.trim().is_empty() {
            return Err(EngineError::Config("invoicing.company_name is empty".into()));
        }
        if self.invoicing.default_country.trim().is_empty() {
            return Err(EngineError::Config("invoicing.default_country is empty".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `PRIMECLEAN_*` overrides from `lookup`; unparsable values are
    /// logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("PRIMECLEAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("PRIMECLEAN_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring PRIMECLEAN_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(mode) = lookup("PRIMECLEAN_TAX_MODE") {
            match mode.parse::<TaxMode>() {
                Ok(m) => {
                    debug!(mode = %m, "Overriding tax mode from environment");
                    self.tax.mode = m;
                }
                Err(_) => warn!(value = %mode, "Unknown tax mode in environment"),
            }
        }

        if let Some(rate) = lookup("PRIMECLEAN_TAX_RATE_BPS") {
            match rate.parse::<u32>() {
                Ok(r) => self.tax.rate_bps = r,
                Err(_) => warn!(value = %rate, "Ignoring PRIMECLEAN_TAX_RATE_BPS"),
            }
        }

        if let Some(days) = lookup("PRIMECLEAN_NET_DAYS") {
            match days.parse::<i64>() {
                Ok(d) => self.invoicing.net_days = d,
                Err(_) => warn!(value = %days, "Ignoring PRIMECLEAN_NET_DAYS"),
            }
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }

    pub fn tax_policy(&self) -> TaxPolicy {
        TaxPolicy {
            rate: TaxRate::from_bps(self.tax.rate_bps),
            mode: self.tax.mode,
        }
    }

    /// Terms text printed on invoices with the given net days.
    pub fn terms(&self, net_days: i64) -> String {
        match &self.invoicing.terms {
            Some(custom) if !custom.trim().is_empty() => custom.clone(),
            _ => default_terms(&self.invoicing.company_name, &self.invoicing.tax_id, net_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tax.mode, TaxMode::Inclusive);
        assert_eq!(config.tax.rate_bps, 700);
        assert_eq!(config.invoicing.net_days, 30);
        assert!(config.validate().is_ok());
        assert!(config.terms(30).contains("Tax ID: FL-TAX-ID-123456"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [tax]
            mode = "exclusive"

            [invoicing]
            net_days = 15
            terms = "Due on receipt"
            "#,
        )
        .unwrap();

        assert_eq!(config.tax.mode, TaxMode::Exclusive);
        assert_eq!(config.tax.rate_bps, 700);
        assert_eq!(config.invoicing.net_days, 15);
        assert_eq!(config.terms(15), "Due on receipt");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides_and_validation() {
        let vars: HashMap<&str, &str> = [
            ("PRIMECLEAN_DB_PATH", "/tmp/pc.db"),
            ("PRIMECLEAN_TAX_MODE", "exclusive"),
            ("PRIMECLEAN_TAX_RATE_BPS", "not-a-number"),
            ("PRIMECLEAN_NET_DAYS", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/pc.db"));
        assert_eq!(config.tax.mode, TaxMode::Exclusive);
        assert_eq!(config.tax.rate_bps, 700);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = EngineConfig::from_toml("[tax]\nmode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
