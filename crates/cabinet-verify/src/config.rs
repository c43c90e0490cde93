//! Tunables for the verification pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::grid::{GridResolution, CELL_RATIO_THRESHOLD, PIXEL_THRESHOLD};
use crate::matcher::ConfidencePolicy;
use crate::preprocess::Resampling;

/// Default bound on a single image fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Rejected configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// Engine configuration. Every field has a default, so a partial JSON file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub grid_resolution: GridResolution,
    pub pixel_threshold: f32,
    pub cell_ratio_threshold: f64,
    pub resampling: Resampling,
    pub confidence_policy: ConfidencePolicy,
    pub fetch_timeout_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            grid_resolution: GridResolution::default(),
            pixel_threshold: PIXEL_THRESHOLD,
            cell_ratio_threshold: CELL_RATIO_THRESHOLD,
            resampling: Resampling::default(),
            confidence_policy: ConfidencePolicy::default(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl VerifyConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Parse and validate a JSON document, filling any missing field with its default.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every tunable is finite and in range.
    ///
    /// Difference magnitudes lie in `[0, 2]`, ratios and confidences in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("pixel_threshold", f64::from(self.pixel_threshold), 0.0, 2.0, "within [0, 2]")?;
        check_range("cell_ratio_threshold", self.cell_ratio_threshold, 0.0, 1.0, "within [0, 1]")?;
        if let ConfidencePolicy::Fixed(c) = self.confidence_policy {
            check_range("confidence_policy.fixed", c, 0.0, 1.0, "within [0, 1]")?;
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "fetch_timeout_secs",
                expected: "at least 1",
                value: 0.0,
            });
        }
        Ok(())
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = VerifyConfig::default();
        assert_eq!(cfg.grid_resolution.get(), 8);
        assert_eq!(cfg.pixel_threshold, 0.3);
        assert_eq!(cfg.cell_ratio_threshold, 0.3);
        assert_eq!(cfg.resampling, Resampling::Nearest);
        assert_eq!(cfg.confidence_policy, ConfidencePolicy::MaxRegion);
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_json() {
        let cfg = VerifyConfig::from_json(
            r#"{"grid_resolution": 4, "confidence_policy": {"fixed": 0.8}, "resampling": "bilinear"}"#,
        )
        .unwrap();
        assert_eq!(cfg.grid_resolution.get(), 4);
        assert_eq!(cfg.confidence_policy, ConfidencePolicy::Fixed(0.8));
        assert_eq!(cfg.resampling, Resampling::Bilinear);
        assert_eq!(cfg.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
    }

    #[test]
    fn test_zero_grid_rejected() {
        assert!(VerifyConfig::from_json(r#"{"grid_resolution": 0}"#).is_err());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for bad in [
            r#"{"confidence_policy": {"fixed": 2.0}}"#,
            r#"{"pixel_threshold": -0.1}"#,
            r#"{"pixel_threshold": 2.5}"#,
            r#"{"cell_ratio_threshold": 1.5}"#,
            r#"{"fetch_timeout_secs": 0}"#,
        ] {
            let err = VerifyConfig::from_json(bad).unwrap_err();
            assert!(matches!(err, ConfigError::OutOfRange { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let cfg = VerifyConfig {
            pixel_threshold: f32::NAN,
            ..VerifyConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(VerifyConfig::default().validate().is_ok());
    }
}
