use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HORIZON_DAYS: u32 = 180;
pub const DEFAULT_MAX_DURATION_DAYS: u32 = 30;
/// Fixed sales tax applied on top of the daily-rate subtotal.
pub const TAX_RATE: f64 = 0.15;
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;

/// Booking limits and tax rate. These are the only recognized options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// How far ahead a reservation may start, in days from today.
    pub max_horizon_days: u32,
    /// Longest reservation accepted, as counted by `DateRange::length_in_days`.
    pub max_duration_days: u32,
    pub tax_rate: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_horizon_days: DEFAULT_MAX_HORIZON_DAYS,
            max_duration_days: DEFAULT_MAX_DURATION_DAYS,
            tax_rate: TAX_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// WAL appends between automatic compactions.
    pub compact_threshold: u64,
    pub policy: Policy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            policy: Policy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Read `RENTCAL_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(dir) = lookup("RENTCAL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse(&lookup, "RENTCAL_COMPACT_THRESHOLD")? {
            config.compact_threshold = v;
        }
        if let Some(v) = parse(&lookup, "RENTCAL_MAX_HORIZON_DAYS")? {
            config.policy.max_horizon_days = v;
        }
        if let Some(v) = parse(&lookup, "RENTCAL_MAX_DURATION_DAYS")? {
            config.policy.max_duration_days = v;
        }
        if let Some(v) = parse::<f64>(&lookup, "RENTCAL_TAX_RATE")? {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError {
                    var: "RENTCAL_TAX_RATE",
                    value: v.to_string(),
                });
            }
            config.policy.tax_rate = v;
        }
        Ok(config)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.policy.max_horizon_days, 180);
        assert_eq!(config.policy.max_duration_days, 30);
        assert_eq!(config.policy.tax_rate, 0.15);
    }

    #[test]
    fn overrides_from_env() {
        let config = Config::from_lookup(lookup(&[
            ("RENTCAL_DATA_DIR", "/tmp/rentcal"),
            ("RENTCAL_MAX_HORIZON_DAYS", "90"),
            ("RENTCAL_MAX_DURATION_DAYS", " 14 "),
            ("RENTCAL_TAX_RATE", "0.2"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/rentcal"));
        assert_eq!(config.wal_path(), PathBuf::from("/tmp/rentcal/reservations.wal"));
        assert_eq!(config.policy.max_horizon_days, 90);
        assert_eq!(config.policy.max_duration_days, 14);
        assert_eq!(config.policy.tax_rate, 0.2);
    }

    #[test]
    fn garbage_is_an_error() {
        let err = Config::from_lookup(lookup(&[("RENTCAL_MAX_DURATION_DAYS", "a week")])).unwrap_err();
        assert_eq!(err.var, "RENTCAL_MAX_DURATION_DAYS");

        let err = Config::from_lookup(lookup(&[("RENTCAL_TAX_RATE", "-1")])).unwrap_err();
        assert_eq!(err.var, "RENTCAL_TAX_RATE");
    }
}
