//! Consolidation/breakout zone detector
//!
//! A zone is a window of `lookback + 1` bars whose high-low span is narrow
//! relative to ATR, followed within `breakout_window` bars by a close beyond
//! exactly one side of that span. An upside escape marks the window as demand,
//! a downside escape as supply.

use std::collections::HashMap;

use super::helpers::{
    self, clamp_strength, clamp_unit, max_close, max_high, max_volume, mean_by, min_close,
    min_low, usable_atr,
};
use crate::indicators::IndicatorRow;
use crate::params::{
    get_flag, get_period, get_threshold, AnalysisParams, ParamMeta, ParamType,
    ParameterizedDetector,
};
use crate::{ComputationWarning, Detection, Result, Zone, ZoneDetector, ZoneError, ZoneKind};

/// Consolidation followed by a one-sided breakout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsolidationDetector {
    pub threshold: f64,
    /// Consolidation window K (window spans K + 1 bars)
    pub lookback: usize,
    /// Confirmation window M
    pub breakout_window: usize,
    pub require_volume: bool,
    pub consolidation_factor: f64,
    pub volume_spike_factor: f64,
}

impl Default for ConsolidationDetector {
    fn default() -> Self {
        Self {
            threshold: helpers::DEFAULT_THRESHOLD,
            lookback: helpers::DEFAULT_LOOKBACK,
            breakout_window: helpers::DEFAULT_BREAKOUT_WINDOW,
            require_volume: true,
            consolidation_factor: helpers::CONSOLIDATION_FACTOR,
            volume_spike_factor: helpers::VOLUME_SPIKE_FACTOR,
        }
    }
}

impl ConsolidationDetector {
    pub fn from_params(params: &AnalysisParams) -> Self {
        Self {
            threshold: params.threshold,
            lookback: params.lookback,
            breakout_window: params.breakout_window,
            require_volume: params.require_volume,
            ..Self::default()
        }
    }

    /// Evaluate the window ending at row `i`. Caller guarantees
    /// `lookback <= i` and `i + breakout_window < rows.len()`.
    fn zone_at(&self, rows: &[IndicatorRow], i: usize, detection: &mut Detection) -> Option<Zone> {
        let window = &rows[i - self.lookback..=i];
        let upper = max_high(window);
        let lower = min_low(window);
        let price_range = upper - lower;

        if !price_range.is_finite() || price_range <= 0.0 {
            detection.warn(ComputationWarning::ZeroRangeWindow { index: i });
            return None;
        }

        let current = &rows[i];
        let Some(atr) = usable_atr(current) else {
            detection.warn(ComputationWarning::UndefinedIndicator {
                index: i,
                field: "atr",
            });
            return None;
        };

        if price_range >= self.consolidation_factor * self.threshold * atr {
            return None;
        }

        let peak_volume = max_volume(window);
        if self.require_volume {
            let mean_volume = mean_by(window, |r| r.volume)?;
            if peak_volume <= self.volume_spike_factor * mean_volume {
                return None;
            }
        }

        let confirm = &rows[i + 1..=i + self.breakout_window];
        let upward = confirm.iter().any(|r| r.close > upper);
        let downward = confirm.iter().any(|r| r.close < lower);

        let (kind, magnitude) = match (upward, downward) {
            (true, false) => (ZoneKind::Demand, max_close(confirm) - upper),
            (false, true) => (ZoneKind::Supply, lower - min_close(confirm)),
            // no breakout, or both sides broken: direction is ambiguous
            _ => return None,
        };

        let quality = clamp_unit(1.0 - price_range / (helpers::QUALITY_ATR_SPAN * atr));

        let volume_factor = if self.require_volume {
            let ratio = match current.volume_ma {
                Some(avg) if avg > 0.0 => peak_volume / avg,
                _ => 1.0,
            };
            clamp_unit((ratio - 1.0) * 0.5)
        } else {
            helpers::DEFAULT_VOLUME_FACTOR
        };

        let breakout_factor = clamp_unit(magnitude / atr * 0.5);

        let strength = clamp_strength(
            helpers::QUALITY_WEIGHT * quality
                + helpers::VOLUME_WEIGHT * volume_factor
                + helpers::BREAKOUT_WEIGHT * breakout_factor,
        );

        Some(Zone {
            kind,
            level: lower + price_range / 2.0,
            upper,
            lower,
            strength,
            anchor_timestamp: current.timestamp,
            anchor_index: i,
            volume: peak_volume,
            avg_volume: current.volume_ma.unwrap_or(0.0),
            is_consolidation: true,
            price_range: Some(price_range),
            atr: Some(atr),
        })
    }
}

impl ZoneDetector for ConsolidationDetector {
    fn name(&self) -> &'static str {
        "consolidation"
    }

    fn min_bars(&self) -> usize {
        self.lookback + self.breakout_window + 1
    }

    fn detect(&self, rows: &[IndicatorRow]) -> Detection {
        if let Err(err) = self.check_len(rows) {
            return Detection::insufficient(self.name(), err);
        }

        let mut detection = Detection::default();
        for i in self.lookback..rows.len() - self.breakout_window {
            if let Some(zone) = self.zone_at(rows, i, &mut detection) {
                detection.candidates.push(zone);
            }
        }

        log::debug!(
            "consolidation: {} candidates from {} rows",
            detection.candidates.len(),
            rows.len()
        );
        detection
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ZoneError::InvalidValue("threshold must be finite and > 0"));
        }
        if self.lookback == 0 {
            return Err(ZoneError::InvalidValue("lookback must be > 0"));
        }
        if self.breakout_window == 0 {
            return Err(ZoneError::InvalidValue("breakout_window must be > 0"));
        }
        if !(self.consolidation_factor > 0.0 && self.volume_spike_factor > 0.0) {
            return Err(ZoneError::InvalidConfig(format!(
                "consolidation factors must be > 0 (got {}, {})",
                self.consolidation_factor, self.volume_spike_factor
            )));
        }
        Ok(())
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static CONSOLIDATION_PARAMS: &[ParamMeta] = &[
    ParamMeta {
        name: "threshold",
        param_type: ParamType::Threshold,
        default: helpers::DEFAULT_THRESHOLD,
        range: (0.005, 0.05, 0.005),
        description: "Base significance threshold",
    },
    ParamMeta {
        name: "lookback",
        param_type: ParamType::Period,
        default: helpers::DEFAULT_LOOKBACK as f64,
        range: (5.0, 30.0, 5.0),
        description: "Consolidation window length",
    },
    ParamMeta {
        name: "breakout_window",
        param_type: ParamType::Period,
        default: helpers::DEFAULT_BREAKOUT_WINDOW as f64,
        range: (1.0, 10.0, 1.0),
        description: "Bars inspected for breakout confirmation",
    },
    ParamMeta {
        name: "require_volume",
        param_type: ParamType::Flag,
        default: 1.0,
        range: (0.0, 1.0, 1.0),
        description: "Require a volume spike inside the window",
    },
];

impl ParameterizedDetector for ConsolidationDetector {
    fn param_meta() -> &'static [ParamMeta] {
        CONSOLIDATION_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            threshold: get_threshold(params, "threshold", helpers::DEFAULT_THRESHOLD)?.get(),
            lookback: get_period(params, "lookback", helpers::DEFAULT_LOOKBACK)?.get(),
            breakout_window: get_period(
                params,
                "breakout_window",
                helpers::DEFAULT_BREAKOUT_WINDOW,
            )?
            .get(),
            require_volume: get_flag(params, "require_volume", true),
            ..Self::default()
        })
    }

    fn detector_name() -> &'static str {
        "consolidation"
    }
}
