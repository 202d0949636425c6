//! Render configuration
//!
//! Settings come from code or from the environment:
//!
//! - `STMTCRAFT_DIALECT`: `standard`, `mysql`, `mysql-5.7`, `mysql-8.0.32`
//! - `STMTCRAFT_PRETTY`: `1` / `true` for multi-line output
//! - `STMTCRAFT_LOG_LEVEL`: see [`crate::telemetry`]

use crate::dialect::Dialect;
use crate::telemetry::LogLevel;
use tracing::warn;

pub const DIALECT_VAR: &str = "STMTCRAFT_DIALECT";
pub const PRETTY_VAR: &str = "STMTCRAFT_PRETTY";

/// How a prepared statement is turned into SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderConfig {
    pub dialect: Dialect,
    pub pretty: bool,
    pub log_level: LogLevel,
}

impl RenderConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Read settings from the environment; unset or invalid values keep
    /// their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(DIALECT_VAR) {
            match Dialect::parse(&raw) {
                Some(dialect) => config.dialect = dialect,
                None => warn!(value = %raw, "ignoring unknown {}", DIALECT_VAR),
            }
        }
        if let Some(raw) = lookup(PRETTY_VAR) {
            config.pretty = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(raw) = lookup(crate::telemetry::LOG_LEVEL_VAR) {
            config.log_level = LogLevel::from_str(&raw);
        }
        config
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySqlVersion;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RenderConfig::from_lookup(|_| None);
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.dialect, Dialect::mysql8());
        assert!(!config.pretty);
        assert_eq!(config.log_level, LogLevel::Off);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = RenderConfig::from_lookup(lookup(&[
            ("STMTCRAFT_DIALECT", "mysql-5.7.40"),
            ("STMTCRAFT_PRETTY", "true"),
            ("STMTCRAFT_LOG_LEVEL", "detailed"),
        ]));
        assert_eq!(config.dialect, Dialect::MySql(MySqlVersion::new(5, 7, 40)));
        assert!(config.pretty);
        assert_eq!(config.log_level, LogLevel::Detailed);
    }

    #[test]
    fn test_unknown_dialect_keeps_default() {
        let config = RenderConfig::from_lookup(lookup(&[("STMTCRAFT_DIALECT", "oracle")]));
        assert_eq!(config.dialect, Dialect::default());
    }
}
