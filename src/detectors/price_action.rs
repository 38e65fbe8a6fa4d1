//! Price-action zone detector
//!
//! Marks bars that set a local extreme against the prior `lookback` bars and
//! are followed by a move away from it: a new high with lower closes after it
//! is supply, a new low with higher closes after it is demand.

use std::collections::HashMap;

use super::helpers::{self, clamp_strength, max_high, mean_by, min_low, usable_atr};
use crate::indicators::IndicatorRow;
use crate::params::{
    get_flag, get_period, get_threshold, AnalysisParams, ParamMeta, ParamType,
    ParameterizedDetector,
};
use crate::{ComputationWarning, Detection, Result, Zone, ZoneDetector, ZoneError, ZoneKind};

/// Local extreme with directional follow-through
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceActionDetector {
    pub threshold: f64,
    /// Bars compared on each side of the candidate bar
    pub lookback: usize,
    pub require_volume: bool,
    pub max_range_percent: f64,
    pub volume_factor: f64,
}

impl Default for PriceActionDetector {
    fn default() -> Self {
        Self {
            threshold: helpers::DEFAULT_THRESHOLD,
            lookback: helpers::DEFAULT_PRICE_ACTION_LOOKBACK,
            require_volume: true,
            max_range_percent: helpers::MAX_RANGE_PERCENT,
            volume_factor: helpers::PRICE_ACTION_VOLUME_FACTOR,
        }
    }
}

impl PriceActionDetector {
    /// Configure from analysis parameters: the symmetric window is half the
    /// consolidation lookback (at least one bar).
    pub fn from_params(params: &AnalysisParams) -> Self {
        Self {
            threshold: params.threshold,
            lookback: (params.lookback / 2).max(1),
            require_volume: params.require_volume,
            ..Self::default()
        }
    }

    fn zone_at(&self, rows: &[IndicatorRow], i: usize, detection: &mut Detection) -> Option<Zone> {
        let bar = &rows[i];

        // abnormal bars and the first bar (no prior close) are skipped
        let range_percent = bar.range_percent?;
        if range_percent > self.max_range_percent {
            return None;
        }

        if self.require_volume {
            let avg = bar.volume_ma?;
            if bar.volume <= avg * self.volume_factor {
                return None;
            }
        }

        let change = bar.price_change?.abs();
        if change <= self.threshold {
            return None;
        }

        let before = &rows[i - self.lookback..i];
        let after = &rows[i + 1..=i + self.lookback];
        let next_close = after[0].close;
        let after_mean = mean_by(after, |r| r.close)?;

        let kind = if bar.high > max_high(before) && next_close < bar.close && after_mean < bar.close
        {
            ZoneKind::Supply
        } else if bar.low < min_low(before) && next_close > bar.close && after_mean > bar.close {
            ZoneKind::Demand
        } else {
            return None;
        };

        let strength_base = (change / self.threshold * 50.0).min(helpers::MAX_STRENGTH);

        let volume_component = match bar.volume_ma {
            Some(avg) if avg > 0.0 => {
                ((bar.volume / avg - 1.0) * 20.0).min(helpers::MAX_VOLUME_COMPONENT)
            }
            _ => 0.0,
        };

        let reaction = match usable_atr(bar) {
            Some(atr) => {
                let adverse = match kind {
                    ZoneKind::Supply => min_low(after),
                    ZoneKind::Demand => max_high(after),
                };
                (bar.close - adverse).abs() / atr
            }
            None => {
                detection.warn(ComputationWarning::UndefinedIndicator {
                    index: i,
                    field: "atr",
                });
                0.0
            }
        };
        let reaction_component = (reaction * 2.0).min(helpers::MAX_REACTION_COMPONENT);

        let strength = clamp_strength(strength_base + volume_component + reaction_component);

        let (level, upper, lower) = match kind {
            ZoneKind::Supply => (
                bar.high - bar.hl_range * helpers::LEVEL_DEPTH,
                bar.high,
                bar.high - bar.hl_range * helpers::BAND_DEPTH,
            ),
            ZoneKind::Demand => (
                bar.low + bar.hl_range * helpers::LEVEL_DEPTH,
                bar.low + bar.hl_range * helpers::BAND_DEPTH,
                bar.low,
            ),
        };

        Some(Zone {
            kind,
            level,
            upper,
            lower,
            strength,
            anchor_timestamp: bar.timestamp,
            anchor_index: i,
            volume: bar.volume,
            avg_volume: bar.volume_ma.unwrap_or(0.0),
            is_consolidation: false,
            price_range: None,
            atr: None,
        })
    }
}

impl ZoneDetector for PriceActionDetector {
    fn name(&self) -> &'static str {
        "price_action"
    }

    fn min_bars(&self) -> usize {
        self.lookback + 3
    }

    fn detect(&self, rows: &[IndicatorRow]) -> Detection {
        if let Err(err) = self.check_len(rows) {
            return Detection::insufficient(self.name(), err);
        }

        let mut detection = Detection::default();
        for i in self.lookback..rows.len().saturating_sub(self.lookback) {
            if let Some(zone) = self.zone_at(rows, i, &mut detection) {
                detection.candidates.push(zone);
            }
        }

        log::debug!(
            "price_action: {} candidates from {} rows",
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
        if !(self.max_range_percent > 0.0 && self.volume_factor > 0.0) {
            return Err(ZoneError::InvalidConfig(format!(
                "price-action factors must be > 0 (got {}, {})",
                self.max_range_percent, self.volume_factor
            )));
        }
        Ok(())
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static PRICE_ACTION_PARAMS: &[ParamMeta] = &[
    ParamMeta {
        name: "threshold",
        param_type: ParamType::Threshold,
        default: helpers::DEFAULT_THRESHOLD,
        range: (0.005, 0.05, 0.005),
        description: "Minimum absolute close-to-close change",
    },
    ParamMeta {
        name: "lookback",
        param_type: ParamType::Period,
        default: helpers::DEFAULT_PRICE_ACTION_LOOKBACK as f64,
        range: (2.0, 15.0, 1.0),
        description: "Bars compared on each side of the extreme",
    },
    ParamMeta {
        name: "require_volume",
        param_type: ParamType::Flag,
        default: 1.0,
        range: (0.0, 1.0, 1.0),
        description: "Require volume above its moving average",
    },
];

impl ParameterizedDetector for PriceActionDetector {
    fn param_meta() -> &'static [ParamMeta] {
        PRICE_ACTION_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            threshold: get_threshold(params, "threshold", helpers::DEFAULT_THRESHOLD)?.get(),
            lookback: get_period(params, "lookback", helpers::DEFAULT_PRICE_ACTION_LOOKBACK)?
                .get(),
            require_volume: get_flag(params, "require_volume", true),
            ..Self::default()
        })
    }

    fn detector_name() -> &'static str {
        "price_action"
    }
}
