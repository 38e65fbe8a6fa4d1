//! Per-bar indicator computation
//!
//! Derives true range, ATR, RSI, simple moving averages, volume MA and the
//! per-bar range/wick fields from raw OHLCV. Rolling values are `None` until
//! their window is full; they are never back-filled with zero.

use crate::{validate_series, ComputationWarning, OHLCVExt, Period, Result, OHLCV};

/// One bar plus its derived statistics
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct IndicatorRow {
    pub index: usize,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,

    pub true_range: f64,
    pub atr: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi: Option<f64>,
    pub volume_ma: Option<f64>,
    /// Fractional close-to-close change
    pub price_change: Option<f64>,
    /// High-low range over the prior close
    pub range_percent: Option<f64>,

    pub hl_range: f64,
    pub body_range: f64,
    pub upper_wick: f64,
    pub lower_wick: f64,
}

/// Indicator rows (1:1 with input bars) and the warnings met computing them
#[derive(Debug, Clone, Default)]
pub struct Indicators {
    pub rows: Vec<IndicatorRow>,
    pub warnings: Vec<ComputationWarning>,
}

/// Provider of indicator rows - precomputes derived fields for all bars
pub trait IndicatorProvider: Send + Sync {
    fn compute_all<T: OHLCV>(&self, bars: &[T]) -> Result<Indicators>;
}

/// Default indicator provider using simple rolling means
#[derive(Debug, Clone)]
pub struct DefaultIndicatorProvider {
    pub atr_period: Period,
    pub rsi_period: Period,
    pub volume_period: Period,
    pub sma_fast: Period,
    pub sma_mid: Period,
    pub sma_slow: Period,
}

impl Default for DefaultIndicatorProvider {
    fn default() -> Self {
        Self {
            atr_period: Period::new_const(14),
            rsi_period: Period::new_const(14),
            volume_period: Period::new_const(20),
            sma_fast: Period::new_const(20),
            sma_mid: Period::new_const(50),
            sma_slow: Period::new_const(200),
        }
    }
}

impl IndicatorProvider for DefaultIndicatorProvider {
    fn compute_all<T: OHLCV>(&self, bars: &[T]) -> Result<Indicators> {
        let stamps = validate_series(bars)?;
        let len = bars.len();

        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();

        let true_ranges: Vec<f64> = (0..len)
            .map(|i| {
                let bar = &bars[i];
                let hl = (bar.high() - bar.low()).abs();
                match i.checked_sub(1).map(|p| closes[p]) {
                    Some(prev_close) => hl
                        .max((bar.high() - prev_close).abs())
                        .max((bar.low() - prev_close).abs()),
                    None => hl,
                }
            })
            .collect();

        // Delta at 0 has no predecessor and contributes nothing to either side.
        let (gains, losses): (Vec<f64>, Vec<f64>) = (0..len)
            .map(|i| {
                let delta = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
                (delta.max(0.0), (-delta).max(0.0))
            })
            .unzip();

        let atr = rolling_mean(&true_ranges, self.atr_period.get());
        let avg_gain = rolling_mean(&gains, self.rsi_period.get());
        let avg_loss = rolling_mean(&losses, self.rsi_period.get());
        let sma20 = rolling_mean(&closes, self.sma_fast.get());
        let sma50 = rolling_mean(&closes, self.sma_mid.get());
        let sma200 = rolling_mean(&closes, self.sma_slow.get());
        let volume_ma = rolling_mean(&volumes, self.volume_period.get());

        let mut warnings = Vec::new();
        let mut rows = Vec::with_capacity(len);

        for (i, bar) in bars.iter().enumerate() {
            let rsi = match (avg_gain[i], avg_loss[i]) {
                (Some(_), Some(loss)) if loss == 0.0 => {
                    warnings.push(ComputationWarning::RsiSaturated { index: i });
                    Some(100.0)
                }
                (Some(gain), Some(loss)) => Some(100.0 - 100.0 / (1.0 + gain / loss)),
                _ => None,
            };

            let prev_close = i.checked_sub(1).map(|p| closes[p]).filter(|&c| c > 0.0);
            let hl_range = bar.range();

            rows.push(IndicatorRow {
                index: i,
                timestamp: stamps[i],
                open: bar.open(),
                high: bar.high(),
                low: bar.low(),
                close: bar.close(),
                volume: bar.volume(),
                true_range: true_ranges[i],
                atr: atr[i],
                sma20: sma20[i],
                sma50: sma50[i],
                sma200: sma200[i],
                rsi,
                volume_ma: volume_ma[i],
                price_change: prev_close.map(|pc| bar.close() / pc - 1.0),
                range_percent: prev_close.map(|pc| hl_range / pc),
                hl_range,
                body_range: bar.body(),
                upper_wick: bar.upper_wick(),
                lower_wick: bar.lower_wick(),
            });
        }

        if !warnings.is_empty() {
            log::trace!("{} bars with saturated RSI", warnings.len());
        }

        Ok(Indicators { rows, warnings })
    }
}

/// Trailing simple mean over `period` values, including the current one.
///
/// `None` until `period` values are available.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        out.resize(values.len(), None);
        return out;
    }

    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            // Running sums drift; recompute from the window periodically.
            if i % 1024 == 0 {
                sum = values[i + 1 - period..=i].iter().sum();
            }
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}
