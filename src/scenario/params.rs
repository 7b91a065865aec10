use crate::config::{ConfigError, StackConfig};
use crate::topology::MAX_COUNT;
use std::time::Duration;

/// Delay between paced resources when `delayMs` is absent or zero.
pub const DEFAULT_DELAY_MS: f64 = 1.0;

/// Which branches run, and how large they are. `None` skips a branch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioParams {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub exact: Option<ExactParams>,
}

/// The paced branch: `count` resources with `delay` after each one.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactParams {
    pub count: f64,
    pub delay: Duration,
}

impl ExactParams {
    /// Negative delays clamp to zero and delays too long for a [`Duration`] saturate.
    pub fn new(count: f64, delay_ms: f64) -> Self {
        Self {
            count,
            delay: delay_from_ms(delay_ms).unwrap_or(Duration::MAX),
        }
    }
}

fn delay_from_ms(delay_ms: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(delay_ms.max(0.0) / 1000.0).ok()
}

impl ScenarioParams {
    /// Reads `x`, `y`, `z`, `exact` and `delayMs`.
    ///
    /// A missing or zero count skips its branch. The paced branch is on whenever `exact`
    /// is set to a non-empty value, in which case it must be numeric. Loop counts above
    /// [`MAX_COUNT`] and delays no [`Duration`] can hold are rejected.
    pub fn from_config(config: &StackConfig) -> Result<Self, ConfigError> {
        let number = |key: &str| -> Result<Option<f64>, ConfigError> {
            Ok(config.get_number(key)?.filter(|v| *v != 0.0))
        };
        let count = |key: &str| -> Result<Option<f64>, ConfigError> {
            let value = number(key)?;
            match value {
                Some(v) if v > MAX_COUNT as f64 => Err(out_of_range(key, v)),
                _ => Ok(value),
            }
        };

        let exact = match config.get("exact") {
            Some(value) if !value.is_empty() => {
                let delay_ms = number("delayMs")?.unwrap_or(DEFAULT_DELAY_MS);
                if delay_from_ms(delay_ms).is_none() {
                    return Err(out_of_range("delayMs", delay_ms));
                }
                let wanted = config.require_number("exact")?;
                if wanted > MAX_COUNT as f64 {
                    return Err(out_of_range("exact", wanted));
                }
                Some(ExactParams::new(wanted, delay_ms))
            }
            _ => None,
        };

        Ok(Self {
            x: count("x")?,
            y: count("y")?,
            z: number("z")?,
            exact,
        })
    }
}

fn out_of_range(key: &str, value: f64) -> ConfigError {
    ConfigError::OutOfRange {
        key: key.to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> StackConfig {
        let mut config = StackConfig::new();
        for (key, value) in pairs {
            config.set(*key, *value);
        }
        config
    }

    #[test]
    fn test_absent_and_zero_skip_branches() {
        let params = ScenarioParams::from_config(&config(&[("x", "0"), ("z", "3")])).unwrap();
        assert_eq!(
            params,
            ScenarioParams {
                z: Some(3.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_exact_defaults_delay() {
        let params = ScenarioParams::from_config(&config(&[("exact", "5")])).unwrap();
        assert_eq!(params.exact, Some(ExactParams::new(5.0, 1.0)));

        let params =
            ScenarioParams::from_config(&config(&[("exact", "5"), ("delayMs", "0")])).unwrap();
        assert_eq!(params.exact.unwrap().delay, Duration::from_millis(1));

        let params =
            ScenarioParams::from_config(&config(&[("exact", "2"), ("delayMs", "250")])).unwrap();
        assert_eq!(params.exact.unwrap().delay, Duration::from_millis(250));
    }

    #[test]
    fn test_empty_exact_is_off() {
        let params = ScenarioParams::from_config(&config(&[("exact", "")])).unwrap();
        assert!(params.exact.is_none());
    }

    #[test]
    fn test_non_numeric_values_are_errors() {
        assert!(matches!(
            ScenarioParams::from_config(&config(&[("y", "many")])),
            Err(ConfigError::NotANumber { .. })
        ));
        assert!(matches!(
            ScenarioParams::from_config(&config(&[("exact", "all")])),
            Err(ConfigError::NotANumber { .. })
        ));
    }

    #[test]
    fn test_delay_too_long_for_a_duration_is_an_error() {
        let result = ScenarioParams::from_config(&config(&[("exact", "1"), ("delayMs", "1e30")]));
        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange { ref key, .. }) if key == "delayMs"
        ));
        assert_eq!(ExactParams::new(1.0, 1e30).delay, Duration::MAX);
        assert_eq!(ExactParams::new(1.0, -5.0).delay, Duration::ZERO);
    }

    #[test]
    fn test_huge_counts_are_errors() {
        for key in ["x", "y", "exact"] {
            let result = ScenarioParams::from_config(&config(&[(key, "1e19")]));
            assert!(
                matches!(result, Err(ConfigError::OutOfRange { key: ref k, .. }) if k == key),
                "{key}"
            );
        }
        let params = ScenarioParams::from_config(&config(&[("z", "1e19")])).unwrap();
        assert_eq!(params.z, Some(1e19));
    }
}
