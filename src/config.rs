//! Process-wide Keel settings.
//!
//! [`KeelConfig::load`] reads `config/keel.toml` (optional) and then `KEEL__*`
//! environment variables, e.g. `KEEL__DIALECT=ansi` or `KEEL__SLOW_QUERY_MS=250`.
//! [`settings`] loads once on first use; [`install`] lets an application
//! provide its own configuration before any statement runs.

use config::{Config, ConfigError, Environment, File, FileFormat};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::query::Dialect;

const CONFIG_FILE: &str = "config/keel.toml";
const ENV_PREFIX: &str = "KEEL";

static SETTINGS: OnceCell<KeelConfig> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeelConfig {
    /// Quoting dialect used by builders unless overridden with `with_dialect`
    #[serde(default)]
    pub dialect: Dialect,
    /// Statements slower than this are logged at `warn`; 0 disables the check
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
    /// Log every statement at `debug`
    #[serde(default = "default_log_statements")]
    pub log_statements: bool,
}

fn default_slow_query_ms() -> u64 {
    500
}

fn default_log_statements() -> bool {
    true
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            slow_query_ms: default_slow_query_ms(),
            log_statements: default_log_statements(),
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

impl KeelConfig {
    /// Load settings from `config/keel.toml`, falling back to env vars.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if neither source yields a valid configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(env_source());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("failed to load {CONFIG_FILE}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(env_source())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        settings.try_deserialize::<KeelConfig>().map_err(|e| {
            ConfigError::Message(format!(
                "Keel configuration could not be loaded from file or environment: {e}"
            ))
        })
    }

    /// Parse settings from an in-memory TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on malformed TOML or invalid values.
    ///
    /// # Examples
    ///
    /// ```
    /// let cfg = keel::KeelConfig::from_toml("dialect = \"ansi\"\nslow_query_ms = 50").unwrap();
    /// assert_eq!(cfg.dialect, keel::Dialect::Ansi);
    /// assert!(cfg.log_statements);
    /// ```
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

/// Install process-wide settings.
///
/// # Errors
///
/// Returns the rejected configuration if settings were already installed or loaded.
pub fn install(config: KeelConfig) -> Result<(), KeelConfig> {
    SETTINGS.set(config)
}

/// Current process-wide settings, loading them on first use.
pub fn settings() -> &'static KeelConfig {
    SETTINGS.get_or_init(|| {
        KeelConfig::load().unwrap_or_else(|err| {
            log::warn!("using default Keel settings: {err}");
            KeelConfig::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = KeelConfig::default();
        assert_eq!(cfg.dialect, Dialect::MySql);
        assert_eq!(cfg.slow_query_ms, 500);
        assert!(cfg.log_statements);
    }

    #[test]
    fn test_from_toml_partial() {
        let cfg = KeelConfig::from_toml("slow_query_ms = 20").unwrap();
        assert_eq!(cfg.slow_query_ms, 20);
        assert_eq!(cfg.dialect, Dialect::MySql);
    }

    #[test]
    fn test_from_toml_full() {
        let cfg = KeelConfig::from_toml(
            "dialect = \"ansi\"\nslow_query_ms = 0\nlog_statements = false\n",
        )
        .unwrap();
        assert_eq!(
            cfg,
            KeelConfig {
                dialect: Dialect::Ansi,
                slow_query_ms: 0,
                log_statements: false,
            }
        );
    }

    #[test]
    fn test_from_toml_rejects_unknown_dialect() {
        assert!(KeelConfig::from_toml("dialect = \"oracle\"").is_err());
    }

    #[test]
    fn test_settings_is_stable() {
        let first: *const KeelConfig = settings();
        let second: *const KeelConfig = settings();
        assert_eq!(first, second);
    }
}
