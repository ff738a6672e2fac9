//! TOML-based predictor configuration.
//!
//! Every tuning constant of the prediction pipeline lives here with its
//! empirical default:
//! - Envelope width and window sizing
//! - Active-phase gap threshold and run length
//! - Fit weighting and the exponential preference margin
//! - Projection step and horizon
//! - Confidence grading thresholds
//!
//! Configuration is stored at `~/.config/laborcast/config.toml`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::active_phase::ActivePhaseDetector;
use crate::envelope::{EnvelopeBuilder, DEFAULT_SIGMA_MULTIPLIER};
use crate::error::ConfigError;
use crate::regression::{CurveFitter, DEFAULT_EXPONENTIAL_MARGIN};

/// Envelope configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default = "default_sigma_multiplier")]
    pub sigma_multiplier: f64,
    #[serde(default = "default_min_window")]
    pub min_window: usize,
    #[serde(default = "default_window_divisor")]
    pub window_divisor: usize,
}

/// Active-phase detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePhaseConfig {
    #[serde(default = "default_gap_threshold_secs")]
    pub gap_threshold_secs: i64,
    #[serde(default = "default_run_length")]
    pub run_length: usize,
    #[serde(default = "default_fallback_fraction")]
    pub fallback_fraction: f64,
}

/// Curve fitting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingConfig {
    #[serde(default = "default_true")]
    pub weighted: bool,
    #[serde(default = "default_exponential_margin")]
    pub exponential_margin: f64,
}

/// Forward projection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    #[serde(default = "default_step_secs")]
    pub step_secs: i64,
    #[serde(default = "default_horizon_secs")]
    pub horizon_secs: i64,
    /// Report the interpolated crossing between steps instead of the step itself.
    #[serde(default)]
    pub interpolate_crossing: bool,
}

/// Confidence grading thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default = "default_high_max_gap_secs")]
    pub high_max_gap_secs: f64,
    #[serde(default = "default_medium_max_gap_secs")]
    pub medium_max_gap_secs: f64,
    #[serde(default = "default_min_strong_duration_secs")]
    pub min_strong_duration_secs: f64,
    #[serde(default = "default_medium_min_points")]
    pub medium_min_points: usize,
}

/// Chart-facing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Fitted upper band samples are capped here for plotting.
    #[serde(default = "default_upper_cap_secs")]
    pub upper_cap_secs: f64,
}

/// Predictor configuration.
///
/// Serialized to/from TOML at `~/.config/laborcast/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum completed (and active-phase) observations for a prediction.
    #[serde(default = "default_min_points")]
    pub min_points: usize,
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    #[serde(default)]
    pub active_phase: ActivePhaseConfig,
    #[serde(default)]
    pub fitting: FittingConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Largest second count whose millisecond value fits in an `i64`.
pub const MAX_DURATION_SECS: i64 = i64::MAX / 1000;

// Default functions
fn default_min_points() -> usize {
    3
}
fn default_sigma_multiplier() -> f64 {
    DEFAULT_SIGMA_MULTIPLIER
}
fn default_min_window() -> usize {
    3
}
fn default_window_divisor() -> usize {
    5
}
fn default_gap_threshold_secs() -> i64 {
    6 * 60
}
fn default_run_length() -> usize {
    3
}
fn default_fallback_fraction() -> f64 {
    0.5
}
fn default_true() -> bool {
    true
}
fn default_exponential_margin() -> f64 {
    DEFAULT_EXPONENTIAL_MARGIN
}
fn default_step_secs() -> i64 {
    5 * 60
}
fn default_horizon_secs() -> i64 {
    12 * 60 * 60
}
fn default_high_max_gap_secs() -> f64 {
    180.0
}
fn default_medium_max_gap_secs() -> f64 {
    300.0
}
fn default_min_strong_duration_secs() -> f64 {
    45.0
}
fn default_medium_min_points() -> usize {
    10
}
fn default_upper_cap_secs() -> f64 {
    180.0
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            sigma_multiplier: default_sigma_multiplier(),
            min_window: default_min_window(),
            window_divisor: default_window_divisor(),
        }
    }
}

impl Default for ActivePhaseConfig {
    fn default() -> Self {
        Self {
            gap_threshold_secs: default_gap_threshold_secs(),
            run_length: default_run_length(),
            fallback_fraction: default_fallback_fraction(),
        }
    }
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            weighted: true,
            exponential_margin: default_exponential_margin(),
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            step_secs: default_step_secs(),
            horizon_secs: default_horizon_secs(),
            interpolate_crossing: false,
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            high_max_gap_secs: default_high_max_gap_secs(),
            medium_max_gap_secs: default_medium_max_gap_secs(),
            min_strong_duration_secs: default_min_strong_duration_secs(),
            medium_min_points: default_medium_min_points(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            upper_cap_secs: default_upper_cap_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_points: default_min_points(),
            envelope: EnvelopeConfig::default(),
            active_phase: ActivePhaseConfig::default(),
            fitting: FittingConfig::default(),
            projection: ProjectionConfig::default(),
            confidence: ConfidenceConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Returns `~/.config/laborcast[-dev]/` based on LABORCAST_ENV.
///
/// Set LABORCAST_ENV=dev to use the development directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LABORCAST_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("laborcast-dev")
    } else {
        base_dir.join("laborcast")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DirectoryUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(format!("{e}")))?,
                ),
                serde_json::Value::Number(n) if n.is_f64() => value
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Number(_) => value
                    .parse::<i64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                serde_json::Value::Object(_) => return Err(invalid("not a leaf key".into())),
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default on-disk location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("falling back to default config: {e}");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |ok: bool, key: &str, message: &str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: message.to_string(),
                })
            }
        };
        check(self.min_points >= 1, "min_points", "must be at least 1")?;
        check(
            self.envelope.sigma_multiplier.is_finite() && self.envelope.sigma_multiplier >= 0.0,
            "envelope.sigma_multiplier",
            "must be a finite non-negative number",
        )?;
        check(self.envelope.window_divisor >= 1, "envelope.window_divisor", "must be at least 1")?;
        check(self.active_phase.run_length >= 1, "active_phase.run_length", "must be at least 1")?;
        check(
            (0.0..=1.0).contains(&self.active_phase.fallback_fraction),
            "active_phase.fallback_fraction",
            "must be between 0 and 1",
        )?;
        check(
            (1..=MAX_DURATION_SECS).contains(&self.active_phase.gap_threshold_secs),
            "active_phase.gap_threshold_secs",
            "must be positive and representable in milliseconds",
        )?;
        check(
            (1..=MAX_DURATION_SECS).contains(&self.projection.step_secs),
            "projection.step_secs",
            "must be positive and representable in milliseconds",
        )?;
        check(
            self.projection.horizon_secs >= 0,
            "projection.horizon_secs",
            "must not be negative",
        )?;
        Ok(())
    }

    pub fn envelope_builder(&self) -> EnvelopeBuilder {
        EnvelopeBuilder::with_settings(
            self.envelope.sigma_multiplier,
            self.envelope.min_window,
            self.envelope.window_divisor,
        )
    }

    pub fn active_phase_detector(&self) -> ActivePhaseDetector {
        ActivePhaseDetector {
            gap_threshold: Duration::try_seconds(self.active_phase.gap_threshold_secs)
                .unwrap_or(Duration::MAX),
            run_length: self.active_phase.run_length,
            fallback_fraction: self.active_phase.fallback_fraction,
            min_active_points: self.min_points,
        }
    }

    pub fn curve_fitter(&self) -> CurveFitter {
        CurveFitter::with_settings(self.fitting.weighted, self.fitting.exponential_margin)
    }
}
