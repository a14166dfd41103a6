//! # Admin Configuration
//!
//! Store details, billing defaults and database settings.
//!
//! ## Configuration Priority
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  Highest ──────────────────────────────────────────────────► Lowest     │
//! │                                                                         │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐           │
//! │  │  Environment   │ > │  admin.toml    │ > │   Defaults     │           │
//! │  │  TILLBOOK_*    │   │  (file)        │   │  (this file)   │           │
//! │  └────────────────┘   └────────────────┘   └────────────────┘           │
//! │                                                                         │
//! │  Example:                                                               │
//! │  TILLBOOK_INVOICE_PREFIX=BLR- overrides [billing] invoice_prefix        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration is read-only once the app has started.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use tillbook_core::types::Percent;
use tillbook_core::validation::validate_percent_bps;
use tillbook_core::{
    InvoiceDraft, PaymentMethod, TaxType, DEFAULT_CUSTOMER_SEARCH_LIMIT, DEFAULT_TAX_PERCENT_BPS,
};
use tillbook_db::DbConfig;

/// Longest invoice number prefix accepted.
pub const MAX_INVOICE_PREFIX_LEN: usize = 12;

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "admin.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or written.
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`AdminConfig`].
    #[error("Config file is invalid: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config could not be written: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    ///
    /// ## When This Occurs
    /// - Empty invoice prefix
    /// - Tax percent above 100%
    /// - Zero search limit or pool size
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// No explicit path and no platform config directory.
    #[error("No config path available")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[store]` - printed on invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Seller's state. Customers in another state are billed IGST.
    #[serde(default)]
    pub state: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "Tillbook Store".to_string()
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            state: String::new(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

/// `[billing]` - what a fresh invoice draft starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingSettings {
    #[serde(default)]
    pub default_tax_type: TaxType,

    /// Basis points, 1800 = 18%.
    #[serde(default = "default_tax_percent_bps")]
    pub default_tax_percent_bps: u32,

    #[serde(default)]
    pub default_payment_method: PaymentMethod,

    /// Invoice numbers are `{prefix}{000001}`.
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,

    #[serde(default = "default_customer_search_limit")]
    pub customer_search_limit: usize,
}

fn default_tax_percent_bps() -> u32 {
    DEFAULT_TAX_PERCENT_BPS
}

fn default_invoice_prefix() -> String {
    "INV-".to_string()
}

fn default_customer_search_limit() -> usize {
    DEFAULT_CUSTOMER_SEARCH_LIMIT
}

impl Default for BillingSettings {
    fn default() -> Self {
        BillingSettings {
            default_tax_type: TaxType::default(),
            default_tax_percent_bps: default_tax_percent_bps(),
            default_payment_method: PaymentMethod::default(),
            invoice_prefix: default_invoice_prefix(),
            customer_search_limit: default_customer_search_limit(),
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. `None` uses the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete admin configuration.
///
/// ## Example Config File
/// ```toml
/// [store]
/// name = "Lakshmi Silks"
/// state = "Kerala"
///
/// [billing]
/// default_tax_type = "CGST_SGST"
/// default_tax_percent_bps = 1800
/// default_payment_method = "upi"
/// invoice_prefix = "LS-"
///
/// [database]
/// path = "/srv/tillbook/tillbook.db"
/// max_connections = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub billing: BillingSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl AdminConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (admin.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading admin config from file");
                config = Self::from_file(&path)?;
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
            warn!("Failed to load admin config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Reads one TOML file, without environment overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Admin config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(ConfigError::Invalid("store.name must not be empty".into()));
        }

        validate_percent_bps(self.billing.default_tax_percent_bps, "default_tax_percent_bps")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let prefix = &self.billing.invoice_prefix;
        if prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("billing.invoice_prefix must not be empty".into()));
        }
        if prefix.chars().count() > MAX_INVOICE_PREFIX_LEN {
            return Err(ConfigError::Invalid(format!(
                "billing.invoice_prefix must be at most {} characters",
                MAX_INVOICE_PREFIX_LEN
            )));
        }

        if self.billing.customer_search_limit == 0 {
            return Err(ConfigError::Invalid(
                "billing.customer_search_limit must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TILLBOOK_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any variable source.
    ///
    /// Unparseable values are logged and skipped.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(name) = var("TILLBOOK_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(state) = var("TILLBOOK_STORE_STATE") {
            self.store.state = state;
        }

        if let Some(tax_type) = var("TILLBOOK_TAX_TYPE") {
            match tax_type.parse() {
                Ok(parsed) => {
                    debug!(tax_type = %tax_type, "Overriding tax type from environment");
                    self.billing.default_tax_type = parsed;
                }
                Err(_) => warn!(tax_type = %tax_type, "Unknown tax type in environment"),
            }
        }

        if let Some(percent) = var("TILLBOOK_TAX_PERCENT") {
            match Percent::parse(&percent) {
                Some(p) => self.billing.default_tax_percent_bps = p.bps(),
                None => warn!(percent = %percent, "Unparseable tax percent in environment"),
            }
        }

        if let Some(method) = var("TILLBOOK_PAYMENT_METHOD") {
            match method.parse() {
                Ok(parsed) => self.billing.default_payment_method = parsed,
                Err(_) => warn!(method = %method, "Unknown payment method in environment"),
            }
        }

        if let Some(prefix) = var("TILLBOOK_INVOICE_PREFIX") {
            debug!(prefix = %prefix, "Overriding invoice prefix from environment");
            self.billing.invoice_prefix = prefix;
        }

        if let Some(path) = var("TILLBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "tillbook", "admin").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The SQLite file to open.
    ///
    /// ## Platform Paths
    /// - macOS: ~/Library/Application Support/com.tillbook.admin/tillbook.db
    /// - Windows: %APPDATA%/tillbook/admin/data/tillbook.db
    /// - Linux: ~/.local/share/admin/tillbook.db
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }

        match ProjectDirs::from("com", "tillbook", "admin") {
            Some(dirs) => dirs.data_dir().join("tillbook.db"),
            None => {
                warn!("Could not determine data directory, using current directory");
                PathBuf::from("./tillbook.db")
            }
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path()).max_connections(self.database.max_connections)
    }

    /// An empty draft carrying the billing defaults.
    pub fn new_draft(&self) -> InvoiceDraft {
        InvoiceDraft::new(
            self.billing.default_tax_type,
            Percent::from_bps(self.billing.default_tax_percent_bps),
            self.billing.default_payment_method,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("tillbook-config-{}", uuid::Uuid::new_v4()))
            .join(CONFIG_FILE_NAME)
    }

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert_eq!(config.billing.invoice_prefix, "INV-");
        assert_eq!(config.billing.default_tax_percent_bps, 1800);
        assert_eq!(config.billing.default_tax_type, TaxType::CgstSgst);
        assert_eq!(config.billing.customer_search_limit, 10);
        assert_eq!(config.store.currency_symbol, "₹");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AdminConfig = toml::from_str(
            r#"
            [store]
            name = "Lakshmi Silks"

            [billing]
            default_tax_type = "IGST"
            default_payment_method = "upi"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.name, "Lakshmi Silks");
        assert_eq!(config.billing.default_tax_type, TaxType::Igst);
        assert_eq!(config.billing.default_payment_method, PaymentMethod::Upi);
        assert_eq!(config.billing.invoice_prefix, "INV-");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides_apply_and_skip_garbage() {
        let vars: HashMap<&str, &str> = [
            ("TILLBOOK_INVOICE_PREFIX", "BLR-"),
            ("TILLBOOK_TAX_PERCENT", "12"),
            ("TILLBOOK_TAX_TYPE", "sales tax"),
            ("TILLBOOK_DB_PATH", "/tmp/shop.db"),
        ]
        .into_iter()
        .collect();

        let mut config = AdminConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.billing.invoice_prefix, "BLR-");
        assert_eq!(config.billing.default_tax_percent_bps, 1200);
        assert_eq!(config.billing.default_tax_type, TaxType::CgstSgst);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/shop.db"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AdminConfig::default();
        config.billing.invoice_prefix = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AdminConfig::default();
        config.billing.default_tax_percent_bps = 10_001;
        assert!(config.validate().is_err());

        let mut config = AdminConfig::default();
        config.billing.customer_search_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path();
        let mut config = AdminConfig::default();
        config.store.name = "Asha Textiles".into();
        config.billing.invoice_prefix = "AT-".into();

        config.save(Some(path.clone())).unwrap();
        let loaded = AdminConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_new_draft_uses_billing_defaults() {
        let mut config = AdminConfig::default();
        config.billing.default_tax_type = TaxType::Igst;
        config.billing.default_tax_percent_bps = 500;
        config.billing.default_payment_method = PaymentMethod::Card;

        let draft = config.new_draft();
        assert_eq!(draft.tax_type(), TaxType::Igst);
        assert_eq!(draft.tax_percent(), Percent::from_bps(500));
        assert_eq!(draft.payment_method, PaymentMethod::Card);
    }
}
