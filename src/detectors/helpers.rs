//! Common helpers for zone detection
//!
//! Default heuristic constants and window statistics shared by the detectors.

use crate::indicators::IndicatorRow;

// ============================================================
// DEFAULT PARAMETERS
// ============================================================

/// Base significance threshold (fractional price change)
pub const DEFAULT_THRESHOLD: f64 = 0.02;
/// Consolidation window length K
pub const DEFAULT_LOOKBACK: usize = 10;
/// Breakout confirmation window length M
pub const DEFAULT_BREAKOUT_WINDOW: usize = 5;
/// Price-action symmetric window
pub const DEFAULT_PRICE_ACTION_LOOKBACK: usize = 5;

// ============================================================
// CONSOLIDATION CONSTANTS
// ============================================================

/// Window range must be below threshold * ATR * this factor
pub const CONSOLIDATION_FACTOR: f64 = 1.5;
/// Peak window volume must exceed mean window volume by this factor
pub const VOLUME_SPIKE_FACTOR: f64 = 1.2;
/// ATR multiple at which consolidation quality reaches zero
pub const QUALITY_ATR_SPAN: f64 = 3.0;
/// Volume factor used when the volume gate is disabled
pub const DEFAULT_VOLUME_FACTOR: f64 = 0.5;

pub const QUALITY_WEIGHT: f64 = 40.0;
pub const VOLUME_WEIGHT: f64 = 30.0;
pub const BREAKOUT_WEIGHT: f64 = 30.0;

// ============================================================
// PRICE-ACTION CONSTANTS
// ============================================================

/// Bars whose range exceeds this fraction of the prior close are skipped
pub const MAX_RANGE_PERCENT: f64 = 0.10;
/// Volume must exceed volume MA by this factor
pub const PRICE_ACTION_VOLUME_FACTOR: f64 = 1.5;
/// Fraction of the bar range from the extreme to the zone level
pub const LEVEL_DEPTH: f64 = 0.33;
/// Fraction of the bar range from the extreme to the far zone edge
pub const BAND_DEPTH: f64 = 0.67;

pub const MAX_VOLUME_COMPONENT: f64 = 40.0;
pub const MAX_REACTION_COMPONENT: f64 = 10.0;

pub const MAX_STRENGTH: f64 = 100.0;

// ============================================================
// WINDOW STATISTICS
// ============================================================

#[inline]
pub fn max_high(rows: &[IndicatorRow]) -> f64 {
    rows.iter().map(|r| r.high).fold(f64::NEG_INFINITY, f64::max)
}

#[inline]
pub fn min_low(rows: &[IndicatorRow]) -> f64 {
    rows.iter().map(|r| r.low).fold(f64::INFINITY, f64::min)
}

#[inline]
pub fn max_close(rows: &[IndicatorRow]) -> f64 {
    rows.iter().map(|r| r.close).fold(f64::NEG_INFINITY, f64::max)
}

#[inline]
pub fn min_close(rows: &[IndicatorRow]) -> f64 {
    rows.iter().map(|r| r.close).fold(f64::INFINITY, f64::min)
}

#[inline]
pub fn max_volume(rows: &[IndicatorRow]) -> f64 {
    rows.iter().map(|r| r.volume).fold(f64::NEG_INFINITY, f64::max)
}

/// Mean of `f` over the rows. `None` for an empty window.
#[inline]
pub fn mean_by(rows: &[IndicatorRow], f: impl Fn(&IndicatorRow) -> f64) -> Option<f64> {
    (!rows.is_empty()).then(|| rows.iter().map(f).sum::<f64>() / rows.len() as f64)
}

#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Clamp a composite score into 0..=100. Non-finite scores collapse to 0.
#[inline]
pub fn clamp_strength(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_STRENGTH)
    } else {
        0.0
    }
}

/// Positive, defined ATR at a row
#[inline]
pub fn usable_atr(row: &IndicatorRow) -> Option<f64> {
    row.atr.filter(|&atr| atr > 0.0 && atr.is_finite())
}
