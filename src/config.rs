//! # Stack Configuration
//!
//! String-valued settings for one stack, read from a YAML file and overridden from the
//! command line:
//!
//! ```yaml
//! config:
//!   arith-fixture:x: 3
//!   y: "2"
//!   exact: 10
//!   delayMs: 5
//! ```
//!
//! Keys may carry a `namespace:` prefix, which is dropped. Scalars are kept as the text
//! they would print as; lists and maps are rejected.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Config key {0} must be a scalar")]
    NotAScalar(String),

    #[error("Config key {key} is not a number: {value:?}")]
    NotANumber { key: String, value: String },

    #[error("Config key {key} is out of range: {value}")]
    OutOfRange { key: String, value: f64 },

    #[error("Missing required config key {0}")]
    Missing(String),

    #[error("Invalid override {0:?}, expected key=value")]
    InvalidOverride(String),
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    config: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackConfig {
    values: BTreeMap<String, String>,
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }
        let file: ConfigFile = serde_yaml::from_str(yaml)?;

        let mut config = Self::new();
        for (key, value) in file.config {
            let text = match value {
                serde_yaml::Value::Null => continue,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::String(s) => s,
                _ => return Err(ConfigError::NotAScalar(key)),
            };
            config.set(key, text);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let key = match key.rsplit_once(':') {
            Some((_, bare)) => bare.to_string(),
            None => key,
        };
        self.values.insert(key, value.into());
    }

    /// Applies a `key=value` override.
    pub fn apply_override(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, value) = assignment
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::InvalidOverride(assignment.to_string()))?;
        self.set(key.trim(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Reads a finite number. Absent keys are `None`; anything unparsable is an error.
    pub fn get_number(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Some(number)),
            _ => Err(ConfigError::NotANumber {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn require_number(&self, key: &str) -> Result<f64, ConfigError> {
        self.get_number(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
