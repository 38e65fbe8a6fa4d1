//! # SDZones - Supply & Demand Zone Detector
//!
//! Detects supply and demand zones in OHLCV price series using two independent
//! heuristics (consolidation/breakout and price-action), then merges and ranks
//! the resulting zones.
//!
//! ## Quick Start
//!
//! ```rust
//! use sdzones::prelude::*;
//!
//! // Define your OHLCV data
//! struct Candle { t: i64, o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Candle {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//!     fn timestamp(&self) -> Option<i64> { Some(self.t) }
//! }
//!
//! // Create engine with default parameters
//! let engine = EngineBuilder::new().build().unwrap();
//!
//! // Analyze your data
//! let candles: Vec<Candle> = vec![];
//! let analysis = engine.analyze(&candles).unwrap();
//! assert!(analysis.zones.is_empty());
//! ```

pub mod detectors;
pub mod indicators;
pub mod merge;
pub mod params;
pub mod rank;

pub mod prelude {
    pub use crate::{
        // Detectors
        detectors::{ConsolidationDetector, PriceActionDetector},
        // Indicators
        indicators::{DefaultIndicatorProvider, IndicatorProvider, IndicatorRow, Indicators},
        // Merge / rank
        merge::{merge_by_kind, merge_zones},
        // Parameters
        params::{
            get_period, get_threshold, AnalysisParams, DetectionMethod, DisplayOptions, ParamMeta,
            ParamType, ParameterizedDetector,
        },
        rank::{rank_zones, RelevanceFilter},
        // Parallel
        scan_parallel,
        // Engine
        Analysis,
        // Core types
        Bar,
        ComputationWarning,
        DefaultEngine,
        Detection,
        EngineBuilder,
        OHLCVExt,
        Period,
        Result,
        ScanError,
        ScanResult,
        Threshold,
        Zone,
        ZoneCandidate,
        ZoneDetector,
        ZoneEngine,
        // Errors
        ZoneError,
        ZoneKind,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ZoneError>;

/// Errors that can occur during zone detection
#[derive(Debug, Clone, thiserror::Error)]
pub enum ZoneError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Invalid timestamp at index {index}: {reason}")]
    InvalidTimestamp { index: usize, reason: &'static str },
}

impl ZoneError {
    /// True for malformed input data. These are fatal and never downgraded.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ZoneError::InvalidOHLCV { .. } | ZoneError::InvalidTimestamp { .. }
        )
    }
}

/// Non-fatal conditions met while computing indicators or scanning for zones.
///
/// Recorded and logged, never raised.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationWarning {
    /// A detector got fewer rows than its minimum window and returned nothing.
    InsufficientData {
        detector: &'static str,
        need: usize,
        got: usize,
    },
    /// A consolidation window had zero (or undefined) high-low range.
    ZeroRangeWindow { index: usize },
    /// RSI average loss was exactly zero; RSI pinned to 100.
    RsiSaturated { index: usize },
    /// A required rolling indicator was not yet defined at this row.
    UndefinedIndicator { index: usize, field: &'static str },
}

impl ComputationWarning {
    pub(crate) fn log(&self) {
        match self {
            ComputationWarning::InsufficientData { .. } => log::debug!("{:?}", self),
            _ => log::trace!("{:?}", self),
        }
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Strictly positive, finite significance threshold (fractional price change)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// Create a new Threshold, validating the value is finite and > 0
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(ZoneError::InvalidValue(
                "Threshold cannot be NaN or infinite",
            ));
        }
        if value <= 0.0 {
            return Err(ZoneError::InvalidValue("Threshold must be > 0"));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Threshold {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Threshold {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Threshold::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ZoneError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Bar timestamp. When no bar of a series has one, the bar index is used.
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_wick(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_wick(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let values = [
            self.open(),
            self.high(),
            self.low(),
            self.close(),
            self.volume(),
        ];
        if values.iter().any(|v| v.is_nan()) {
            return Err(ZoneError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(ZoneError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if values.iter().any(|&v| v < 0.0) {
            return Err(ZoneError::InvalidOHLCV {
                index: 0,
                reason: "negative value in OHLCV",
            });
        }
        if self.high() < self.open().max(self.close()) {
            return Err(ZoneError::InvalidOHLCV {
                index: 0,
                reason: "high < max(open, close)",
            });
        }
        if self.low() > self.open().min(self.close()) {
            return Err(ZoneError::InvalidOHLCV {
                index: 0,
                reason: "low > min(open, close)",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Validate a whole series: per-bar consistency and strictly increasing timestamps.
///
/// Returns the timestamp to use for each bar (bar index when the series carries none).
pub fn validate_series<T: OHLCV>(bars: &[T]) -> Result<Vec<i64>> {
    let has_timestamps = bars.first().is_some_and(|b| b.timestamp().is_some());
    let mut stamps = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            ZoneError::InvalidOHLCV { reason, .. } => ZoneError::InvalidOHLCV { index: i, reason },
            other => other,
        })?;

        let ts = match (has_timestamps, bar.timestamp()) {
            (true, Some(ts)) => ts,
            (false, None) => i as i64,
            _ => {
                return Err(ZoneError::InvalidTimestamp {
                    index: i,
                    reason: "series mixes bars with and without timestamps",
                })
            }
        };
        if let Some(&prev) = stamps.last() {
            if ts <= prev {
                return Err(ZoneError::InvalidTimestamp {
                    index: i,
                    reason: "timestamps must be strictly increasing",
                });
            }
        }
        stamps.push(ts);
    }

    Ok(stamps)
}

/// Plain OHLCV bar, the shape produced by market-data and CSV adapters
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// ZONES
// ============================================================

/// Side of the market a zone belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ZoneKind {
    Supply,
    Demand,
}

impl ZoneKind {
    #[inline]
    pub fn is_supply(self) -> bool {
        matches!(self, ZoneKind::Supply)
    }

    #[inline]
    pub fn is_demand(self) -> bool {
        matches!(self, ZoneKind::Demand)
    }
}

/// A supply or demand price band
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Zone {
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    pub level: f64,
    pub upper: f64,
    pub lower: f64,
    /// Composite score 0.0..=100.0
    pub strength: f64,
    pub anchor_timestamp: i64,
    pub anchor_index: usize,
    pub volume: f64,
    pub avg_volume: f64,
    pub is_consolidation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atr: Option<f64>,
}

/// Detector output, before merging. Same shape as a final [`Zone`].
pub type ZoneCandidate = Zone;

impl Zone {
    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    #[inline]
    pub fn overlaps(&self, other: &Zone) -> bool {
        self.upper >= other.lower && self.lower <= other.upper
    }

    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }
}

// ============================================================
// ZONE DETECTOR TRAIT
// ============================================================

/// Candidates and warnings produced by one detector run
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub candidates: Vec<ZoneCandidate>,
    pub warnings: Vec<ComputationWarning>,
}

impl Detection {
    /// Empty detection recording that `detector` had too few rows.
    pub(crate) fn insufficient(detector: &'static str, err: ZoneError) -> Self {
        let mut detection = Detection::default();
        if let ZoneError::InsufficientData { need, got } = err {
            detection.warn(ComputationWarning::InsufficientData {
                detector,
                need,
                got,
            });
        }
        detection
    }

    pub(crate) fn warn(&mut self, warning: ComputationWarning) {
        warning.log();
        self.warnings.push(warning);
    }

    fn extend(&mut self, other: Detection) {
        self.candidates.extend(other.candidates);
        self.warnings.extend(other.warnings);
    }
}

/// Object-safe zone detector trait
pub trait ZoneDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn min_bars(&self) -> usize;

    /// Scan indicator rows. Short input yields an empty detection, never an error.
    fn detect(&self, rows: &[IndicatorRow]) -> Detection;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    fn check_len(&self, rows: &[IndicatorRow]) -> Result<()> {
        let need = self.min_bars();
        if rows.len() < need {
            return Err(ZoneError::InsufficientData {
                need,
                got: rows.len(),
            });
        }
        Ok(())
    }
}

use detectors::{ConsolidationDetector, PriceActionDetector};
use indicators::{DefaultIndicatorProvider, IndicatorProvider, IndicatorRow};
use params::{AnalysisParams, DetectionMethod, DisplayOptions};
use rank::RelevanceFilter;

// ============================================================
// ZONE ENGINE
// ============================================================

/// Result of one analysis request
#[derive(Debug, Clone, serde::Serialize)]
pub struct Analysis {
    /// Final zones, strongest first
    pub zones: Vec<Zone>,
    pub warnings: Vec<ComputationWarning>,
    /// Close of the last bar, the reference price for relevance filtering
    pub last_close: Option<f64>,
    pub bar_count: usize,
}

impl Analysis {
    /// Zones worth displaying relative to the last close.
    pub fn relevant_zones(&self, options: &DisplayOptions) -> Vec<Zone> {
        match self.last_close {
            Some(price) => RelevanceFilter::from_options(price, options).apply(&self.zones),
            None => Vec::new(),
        }
    }
}

/// Main zone detection engine
pub struct ZoneEngine<P: IndicatorProvider = DefaultIndicatorProvider> {
    consolidation: ConsolidationDetector,
    price_action: PriceActionDetector,
    custom: Vec<Box<dyn ZoneDetector>>,
    indicator_provider: P,
    params: AnalysisParams,
}

impl<P: IndicatorProvider> ZoneEngine<P> {
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    pub fn consolidation_detector(&self) -> &ConsolidationDetector {
        &self.consolidation
    }

    pub fn price_action_detector(&self) -> &PriceActionDetector {
        &self.price_action
    }

    /// Validate bars and compute indicator rows.
    #[inline]
    pub fn compute_indicators<T: OHLCV>(&self, bars: &[T]) -> Result<indicators::Indicators> {
        self.indicator_provider.compute_all(bars)
    }

    /// Run the configured detectors without merging or ranking.
    pub fn detect(&self, rows: &[IndicatorRow]) -> Detection {
        let mut detection = match self.params.detection_method {
            DetectionMethod::Consolidation => self.consolidation.detect(rows),
            DetectionMethod::PriceAction => self.price_action.detect(rows),
            DetectionMethod::Both => {
                let (mut consolidation, price_action) = rayon::join(
                    || self.consolidation.detect(rows),
                    || self.price_action.detect(rows),
                );
                consolidation.extend(price_action);
                consolidation
            }
        };

        for detector in &self.custom {
            detection.extend(detector.detect(rows));
        }

        detection
    }

    /// Full pipeline: indicators, detection, merge, rank.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Result<Analysis> {
        let indicators = self.compute_indicators(bars)?;
        let detection = self.detect(&indicators.rows);

        let candidate_count = detection.candidates.len();
        let mut zones = if self.params.merge_enabled {
            merge::merge_by_kind(detection.candidates)
        } else {
            detection.candidates
        };
        rank::rank_zones(&mut zones);

        let mut warnings = indicators.warnings;
        warnings.extend(detection.warnings);

        log::debug!(
            "analyzed {} bars: {} candidates -> {} zones ({} warnings)",
            bars.len(),
            candidate_count,
            zones.len(),
            warnings.len()
        );

        Ok(Analysis {
            zones,
            warnings,
            last_close: bars.last().map(|b| b.close()),
            bar_count: bars.len(),
        })
    }

    fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.consolidation.validate_config()?;
        self.price_action.validate_config()?;
        for d in &self.custom {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating ZoneEngine instances
pub struct EngineBuilder<P: IndicatorProvider = DefaultIndicatorProvider> {
    indicator_provider: P,
    params: AnalysisParams,
    custom: Vec<Box<dyn ZoneDetector>>,
}

impl Default for EngineBuilder<DefaultIndicatorProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<DefaultIndicatorProvider> {
    pub fn new() -> Self {
        Self {
            indicator_provider: DefaultIndicatorProvider::default(),
            params: AnalysisParams::default(),
            custom: Vec::new(),
        }
    }
}

impl<P: IndicatorProvider> EngineBuilder<P> {
    /// Change indicator provider
    pub fn indicator_provider<P2: IndicatorProvider>(self, provider: P2) -> EngineBuilder<P2> {
        EngineBuilder {
            indicator_provider: provider,
            params: self.params,
            custom: self.custom,
        }
    }

    /// Replace all analysis parameters
    pub fn params(mut self, params: AnalysisParams) -> Self {
        self.params = params;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.params.threshold = threshold;
        self
    }

    pub fn lookback(mut self, lookback: usize) -> Self {
        self.params.lookback = lookback;
        self
    }

    pub fn breakout_window(mut self, breakout_window: usize) -> Self {
        self.params.breakout_window = breakout_window;
        self
    }

    pub fn require_volume(mut self, enable: bool) -> Self {
        self.params.require_volume = enable;
        self
    }

    pub fn detection_method(mut self, method: DetectionMethod) -> Self {
        self.params.detection_method = method;
        self
    }

    pub fn merge_enabled(mut self, enable: bool) -> Self {
        self.params.merge_enabled = enable;
        self
    }

    /// Add a custom detector, run after the builtin ones
    pub fn add_detector<D: ZoneDetector + 'static>(mut self, detector: D) -> Self {
        self.custom.push(Box::new(detector));
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<ZoneEngine<P>> {
        let engine = ZoneEngine {
            consolidation: ConsolidationDetector::from_params(&self.params),
            price_action: PriceActionDetector::from_params(&self.params),
            custom: self.custom,
            indicator_provider: self.indicator_provider,
            params: self.params,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub analysis: Analysis,
}

/// Error from analyzing a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: ZoneError,
}

/// Parallel analysis of multiple instruments
pub fn scan_parallel<'a, T, I, P>(
    engine: &ZoneEngine<P>,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
    P: IndicatorProvider + Sync,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .analyze(bars)
                .map(|analysis| ScanResult {
                    symbol: symbol.to_string(),
                    analysis,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => {
                log::warn!("analysis failed for {}: {}", e.symbol, e.error);
                errors.push(e)
            }
        }
    }

    (successes, errors)
}

// ============================================================
// TYPE ALIASES
// ============================================================

/// Default engine with DefaultIndicatorProvider
pub type DefaultEngine = ZoneEngine<DefaultIndicatorProvider>;

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar::new(i as i64 * 60, 100.0, 100.0, 100.0, 100.0, 1000.0))
            .collect()
    }

    fn wavy_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + ((i as f64) * 0.3).sin() * 5.0;
                let volume = 1000.0 + ((i * 37) % 11) as f64 * 250.0;
                Bar::new(i as i64, base, base + 1.0, base - 1.0, base + 0.4, volume)
            })
            .collect()
    }

    /// Bar without timestamp
    struct Untimed(f64);

    impl OHLCV for Untimed {
        fn open(&self) -> f64 {
            self.0
        }

        fn high(&self) -> f64 {
            self.0 + 1.0
        }

        fn low(&self) -> f64 {
            self.0 - 1.0
        }

        fn close(&self) -> f64 {
            self.0
        }

        fn volume(&self) -> f64 {
            500.0
        }
    }

    #[test]
    fn test_threshold_validation() {
        assert!(Threshold::new(0.02).is_ok());
        assert!(Threshold::new(5.0).is_ok());
        assert!(Threshold::new(0.0).is_err());
        assert!(Threshold::new(-0.1).is_err());
        assert!(Threshold::new(f64::NAN).is_err());
        assert!(Threshold::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(0, 100.0, 110.0, 90.0, 105.0, 10.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_wick(), 5.0);
        assert_eq!(bar.lower_wick(), 10.0);
    }

    #[test]
    fn test_zone_geometry() {
        let zone = Zone {
            kind: ZoneKind::Supply,
            level: 105.0,
            upper: 110.0,
            lower: 100.0,
            strength: 50.0,
            anchor_timestamp: 0,
            anchor_index: 0,
            volume: 0.0,
            avg_volume: 0.0,
            is_consolidation: false,
            price_range: None,
            atr: None,
        };
        assert_eq!(zone.width(), 10.0);
        assert!(zone.contains(100.0) && zone.contains(110.0));
        assert!(!zone.contains(110.5));
        assert!(zone.kind.is_supply() && !zone.kind.is_demand());
        assert!(ZoneKind::Demand.is_demand());
    }

    #[test]
    fn test_bar_validation() {
        assert!(Bar::new(0, 100.0, 110.0, 90.0, 105.0, 10.0).validate().is_ok());
        assert!(Bar::new(0, 100.0, 104.0, 90.0, 105.0, 10.0).validate().is_err());
        assert!(Bar::new(0, 100.0, 110.0, 101.0, 105.0, 10.0).validate().is_err());
        assert!(Bar::new(0, f64::NAN, 110.0, 90.0, 105.0, 10.0).validate().is_err());
        assert!(Bar::new(0, 100.0, 110.0, 90.0, 105.0, -1.0).validate().is_err());
    }

    #[test]
    fn test_validate_series_reports_index() {
        let mut bars = flat_bars(5);
        bars[3].high = 50.0;
        match validate_series(&bars) {
            Err(ZoneError::InvalidOHLCV { index, .. }) => assert_eq!(index, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_series_rejects_duplicate_timestamps() {
        let mut bars = flat_bars(5);
        bars[2].timestamp = bars[1].timestamp;
        let err = validate_series(&bars).unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(err, ZoneError::InvalidTimestamp { index: 2, .. }));
    }

    #[test]
    fn test_untimed_series_uses_index() {
        let bars: Vec<Untimed> = (0..4).map(|i| Untimed(100.0 + i as f64)).collect();
        assert_eq!(validate_series(&bars).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_engine_builder() {
        assert!(EngineBuilder::new().build().is_ok());
        assert!(EngineBuilder::new().threshold(0.0).build().is_err());
        assert!(EngineBuilder::new().lookback(0).build().is_err());
        assert!(EngineBuilder::new().breakout_window(0).build().is_err());
    }

    #[test]
    fn test_empty_analyze() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars: Vec<Bar> = vec![];
        let analysis = engine.analyze(&bars).unwrap();
        assert!(analysis.zones.is_empty());
        assert_eq!(analysis.last_close, None);
        assert!(analysis.relevant_zones(&DisplayOptions::default()).is_empty());
    }

    #[test]
    fn test_flat_series_has_no_zones() {
        let engine = EngineBuilder::new().require_volume(false).build().unwrap();
        let analysis = engine.analyze(&flat_bars(250)).unwrap();
        assert!(analysis.zones.is_empty());
        assert!(analysis
            .warnings
            .iter()
            .any(|w| matches!(w, ComputationWarning::ZeroRangeWindow { .. })));
    }

    #[test]
    fn test_invalid_bars_are_fatal() {
        let engine = EngineBuilder::new().build().unwrap();
        let mut bars = wavy_bars(50);
        bars[10].close = f64::NAN;
        let err = engine.analyze(&bars).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_zones_are_ranked() {
        let engine = EngineBuilder::new()
            .require_volume(false)
            .threshold(0.005)
            .build()
            .unwrap();
        let analysis = engine.analyze(&wavy_bars(300)).unwrap();
        for pair in analysis.zones.windows(2) {
            assert!(pair[0].strength >= pair[1].strength);
        }
    }

    #[test]
    fn test_custom_detector_runs() {
        struct Fixed;

        impl ZoneDetector for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }

            fn min_bars(&self) -> usize {
                1
            }

            fn detect(&self, rows: &[IndicatorRow]) -> Detection {
                let Some(last) = rows.last() else {
                    return Detection::default();
                };
                Detection {
                    candidates: vec![Zone {
                        kind: ZoneKind::Demand,
                        level: last.low,
                        upper: last.low,
                        lower: last.low,
                        strength: 1.0,
                        anchor_timestamp: last.timestamp,
                        anchor_index: last.index,
                        volume: last.volume,
                        avg_volume: 0.0,
                        is_consolidation: false,
                        price_range: None,
                        atr: None,
                    }],
                    warnings: Vec::new(),
                }
            }
        }

        let engine = EngineBuilder::new()
            .detection_method(DetectionMethod::PriceAction)
            .add_detector(Fixed)
            .build()
            .unwrap();
        let analysis = engine.analyze(&flat_bars(10)).unwrap();
        assert_eq!(analysis.zones.len(), 1);
        assert_eq!(analysis.zones[0].anchor_index, 9);
    }

    #[test]
    fn test_parallel_scan() {
        let engine = EngineBuilder::new().require_volume(false).build().unwrap();

        let bars1 = flat_bars(60);
        let bars2 = wavy_bars(60);
        let mut bad = wavy_bars(60);
        bad[5].low = 1000.0;

        let instruments: Vec<(&str, &[Bar])> =
            vec![("AAPL", &bars1), ("GOOGL", &bars2), ("BAD", &bad)];

        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
    }
}
