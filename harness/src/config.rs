//! Harness configuration module.
//!
//! This module loads the harness configuration from environment variables.
//!
//! # Environment Variables
//!
//! - `HARNESS_FIXTURE`: Path of the fixture file (default: a generated fixture)
//! - `HARNESS_DEVICE`: Device written to (default: `root.harness.d1`)
//! - `HARNESS_NULL_TOKEN`: Field value that denotes null (default: `null`)
//! - `HARNESS_TABLET_CAPACITY`: Rows per tablet for columnar batches (default: `64`)
//! - `HARNESS_SEED`: Seed for generated fixtures (default: `0`)
//! - `HARNESS_ROWS`: Rows in a generated fixture (default: `100`)
//!
//! # Invariants
//!
//! - `device` is always a valid device path with a parent namespace
//! - `tablet_capacity` is always at least 1

use std::path::PathBuf;

use crate::constants::{DEFAULT_NULL_TOKEN, DEFAULT_TABLET_CAPACITY};
use crate::types::{DeviceId, Namespace};

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Fixture file to read. A fixture is generated when unset.
    pub fixture: Option<PathBuf>,
    pub device: DeviceId,
    pub null_token: String,
    pub tablet_capacity: usize,
    pub seed: u64,
    /// Number of rows in a generated fixture.
    pub rows: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl HarnessConfig {
    /// Default device path.
    pub const DEFAULT_DEVICE: &'static str = "root.harness.d1";
    /// Default seed for generated fixtures.
    pub const DEFAULT_SEED: u64 = 0;
    /// Default number of generated rows.
    pub const DEFAULT_ROWS: usize = 100;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that does not parse
    /// or violates its constraint.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fixture = lookup("HARNESS_FIXTURE")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);
        let device = Self::load_device(lookup("HARNESS_DEVICE"))?;
        let null_token = Self::load_null_token(lookup("HARNESS_NULL_TOKEN"))?;
        let tablet_capacity = Self::load_tablet_capacity(lookup("HARNESS_TABLET_CAPACITY"))?;
        let seed = parse_or("HARNESS_SEED", lookup("HARNESS_SEED"), Self::DEFAULT_SEED)?;
        let rows = parse_or("HARNESS_ROWS", lookup("HARNESS_ROWS"), Self::DEFAULT_ROWS)?;

        Ok(Self {
            fixture,
            device,
            null_token,
            tablet_capacity,
            seed,
            rows,
        })
    }

    /// The device must have a parent namespace, so the harness can create it.
    fn load_device(value: Option<String>) -> Result<DeviceId, ConfigError> {
        let value = value.unwrap_or_else(|| Self::DEFAULT_DEVICE.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            name: "HARNESS_DEVICE".to_string(),
            message,
        };
        let device = DeviceId::parse(&value).map_err(|e| invalid(format!("'{value}': {e}")))?;
        if Namespace::of(&device).is_none() {
            return Err(invalid(format!("'{value}' has no parent namespace")));
        }
        Ok(device)
    }

    fn load_null_token(value: Option<String>) -> Result<String, ConfigError> {
        let token = value.unwrap_or_else(|| DEFAULT_NULL_TOKEN.to_string());
        if token.is_empty() || token.contains(',') {
            return Err(ConfigError::InvalidValue {
                name: "HARNESS_NULL_TOKEN".to_string(),
                message: "must be non-empty and must not contain a comma".to_string(),
            });
        }
        Ok(token)
    }

    fn load_tablet_capacity(value: Option<String>) -> Result<usize, ConfigError> {
        let capacity = parse_or("HARNESS_TABLET_CAPACITY", value, DEFAULT_TABLET_CAPACITY)?;
        if capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "HARNESS_TABLET_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(capacity)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a valid non-negative integer"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<HarnessConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        HarnessConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();
        assert!(config.fixture.is_none());
        assert_eq!(config.device.as_str(), "root.harness.d1");
        assert_eq!(config.null_token, "null");
        assert_eq!(config.tablet_capacity, 64);
        assert_eq!(config.seed, 0);
        assert_eq!(config.rows, 100);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HARNESS_FIXTURE", "/tmp/fixture.csv"),
            ("HARNESS_DEVICE", "root.sg.d9"),
            ("HARNESS_NULL_TOKEN", "NA"),
            ("HARNESS_TABLET_CAPACITY", "3"),
            ("HARNESS_SEED", "42"),
            ("HARNESS_ROWS", "7"),
        ])
        .unwrap();
        assert_eq!(config.fixture, Some(PathBuf::from("/tmp/fixture.csv")));
        assert_eq!(config.device.as_str(), "root.sg.d9");
        assert_eq!(config.null_token, "NA");
        assert_eq!(config.tablet_capacity, 3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.rows, 7);
    }

    #[test]
    fn test_zero_tablet_capacity_is_rejected() {
        let err = load(&[("HARNESS_TABLET_CAPACITY", "0")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for HARNESS_TABLET_CAPACITY: must be at least 1"
        );
    }

    #[test]
    fn test_non_numeric_seed_is_rejected() {
        let err = load(&[("HARNESS_SEED", "abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name, .. } if name == "HARNESS_SEED"));
    }

    #[test]
    fn test_device_without_namespace_is_rejected() {
        assert!(load(&[("HARNESS_DEVICE", "root.d1")]).is_err());
        assert!(load(&[("HARNESS_DEVICE", "not a path")]).is_err());
    }

    #[test]
    fn test_invalid_null_token_display() {
        let err = load(&[("HARNESS_NULL_TOKEN", "a,b")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for HARNESS_NULL_TOKEN: must be non-empty and must not contain a comma"
        );
    }
}
