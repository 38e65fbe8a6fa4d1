//! Analysis configuration and detector parameter metadata
//!
//! [`AnalysisParams`] is the request-level configuration accepted by the
//! engine; [`DisplayOptions`] carries the display-side toggles used by the
//! relevance filter. Both deserialize with serde and fall back to defaults for
//! missing fields.
//!
//! Parameter metadata enables:
//! - Grid search optimization
//! - Parameter documentation
//! - Automatic configuration UI generation
//!
//! # Example
//!
//! ```rust
//! use sdzones::params::{ParamMeta, ParamType, ParameterizedDetector};
//! use sdzones::prelude::*;
//!
//! // Get parameter metadata for a detector
//! let params = ConsolidationDetector::param_meta();
//! for param in params {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detectors::helpers;
use crate::{Period, Result, Threshold, ZoneError};

// ============================================================
// ANALYSIS PARAMETERS
// ============================================================

/// Which heuristics an analysis runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
  #[serde(alias = "Consolidation")]
  Consolidation,
  #[serde(alias = "Price Action", alias = "PriceAction")]
  PriceAction,
  #[default]
  #[serde(alias = "Both")]
  Both,
}

/// Parameter set for one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
  /// Base significance threshold (> 0)
  pub threshold: f64,
  /// Consolidation window K; the price-action window is K / 2
  pub lookback: usize,
  /// Breakout confirmation window M
  pub breakout_window: usize,
  pub require_volume: bool,
  pub detection_method: DetectionMethod,
  pub merge_enabled: bool,
}

impl Default for AnalysisParams {
  fn default() -> Self {
    Self {
      threshold: helpers::DEFAULT_THRESHOLD,
      lookback: helpers::DEFAULT_LOOKBACK,
      breakout_window: helpers::DEFAULT_BREAKOUT_WINDOW,
      require_volume: true,
      detection_method: DetectionMethod::Both,
      merge_enabled: true,
    }
  }
}

impl AnalysisParams {
  pub fn validate(&self) -> Result<()> {
    Threshold::new(self.threshold)?;
    if self.lookback == 0 {
      return Err(ZoneError::InvalidConfig("lookback must be >= 1".into()));
    }
    if self.breakout_window == 0 {
      return Err(ZoneError::InvalidConfig("breakout_window must be >= 1".into()));
    }
    Ok(())
  }
}

/// Display-side toggles for the relevance filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
  pub show_supply: bool,
  pub show_demand: bool,
  /// Fractional band around the current price
  pub tolerance: f64,
}

impl Default for DisplayOptions {
  fn default() -> Self {
    Self { show_supply: true, show_demand: true, tolerance: 0.05 }
  }
}

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Positive real threshold
  Threshold,
  /// Period value (positive integer)
  Period,
  /// Boolean encoded as 0.0 / 1.0
  Flag,
}

/// Metadata for a single detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "lookback")
  pub name: &'static str,
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn threshold(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Threshold, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 {
      return vec![min];
    }
    let steps = ((max - min) / step + 1e-9).floor() as usize;
    (0..=steps).map(|k| min + k as f64 * step).collect()
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(ZoneError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Threshold => Threshold::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(ZoneError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Flag => {
        if value != 0.0 && value != 1.0 {
          return Err(ZoneError::InvalidValue("Flag must be 0 or 1"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Trait for detectors that support parameterization
pub trait ParameterizedDetector: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector with parameters from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  fn detector_name() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Threshold from params with default fallback
pub fn get_threshold(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Threshold> {
  let value = params.get(key).copied().unwrap_or(default);
  Threshold::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 0.0 || value.fract() != 0.0 {
    return Err(ZoneError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to read a flag (non-zero = true) with default fallback
pub fn get_flag(params: &HashMap<&str, f64>, key: &str, default: bool) -> bool {
  params.get(key).map(|&v| v != 0.0).unwrap_or(default)
}

// ============================================================
// TESTS
// ============================================================
