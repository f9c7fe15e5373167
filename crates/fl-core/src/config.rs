//! Configuration management for FL admin services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`FLC__` prefix, `__` separator)
//! 2. Config file (`fl-admin.toml` by default)
//! 3. Defaults

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{FlError, Result};

pub const ENV_PREFIX: &str = "FLC";
pub const DEFAULT_FILE_PREFIX: &str = "fl-admin";

/// Build the layered configuration source.
pub fn layered(file_prefix: &str) -> Result<config::Config> {
    config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| FlError::Config(e.to_string()))
}

/// Deserialize one section, falling back to defaults when it is absent.
pub fn section<T: DeserializeOwned + Default>(cfg: &config::Config, key: &str) -> Result<T> {
    match cfg.get::<T>(key) {
        Ok(v) => Ok(v),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section = key, "Config section absent, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(FlError::Config(format!("[{key}]: {e}"))),
    }
}

/// Business policy knobs.
///
/// Loaded from the `[policy]` section or `FLC__POLICY__` environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PolicyConfig {
    /// Gateway processing fee added to self-banked offerings, in percent.
    #[serde(default = "default_fee_percent")]
    pub self_banking_fee_percent: f64,

    /// Bacentas bussing fewer people than this get no vehicle top-up.
    #[serde(default = "default_min_bussing_attendance")]
    pub min_bussing_attendance: u32,

    /// Factor applied to the top-up of outbound (return) trips.
    #[serde(default = "default_outbound_multiplier")]
    pub outbound_multiplier: i64,

    /// Minimum number of treasurers who must sign off a service form.
    #[serde(default = "default_min_treasurers")]
    pub min_treasurers: usize,
}

fn default_fee_percent() -> f64 {
    1.95
}

fn default_min_bussing_attendance() -> u32 {
    8
}

fn default_outbound_multiplier() -> i64 {
    2
}

fn default_min_treasurers() -> usize {
    2
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            self_banking_fee_percent: default_fee_percent(),
            min_bussing_attendance: default_min_bussing_attendance(),
            outbound_multiplier: default_outbound_multiplier(),
            min_treasurers: default_min_treasurers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_policy() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.min_bussing_attendance, 8);
        assert_eq!(policy.outbound_multiplier, 2);
        assert_eq!(policy.min_treasurers, 2);
    }

    #[test]
    fn test_policy_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fl-test.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[policy]\nmin_bussing_attendance = 10").unwrap();

        let prefix = dir.path().join("fl-test");
        let cfg = layered(prefix.to_str().unwrap()).unwrap();
        let policy: PolicyConfig = section(&cfg, "policy").unwrap();
        assert_eq!(policy.min_bussing_attendance, 10);
        assert_eq!(policy.self_banking_fee_percent, 1.95);
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let cfg = layered(prefix.to_str().unwrap()).unwrap();
        let policy: PolicyConfig = section(&cfg, "policy").unwrap();
        assert_eq!(policy, PolicyConfig::default());
    }
}
