//! Supply/demand zone detectors
//!
//! Two independent heuristics over precomputed indicator rows:
//!
//! - **Consolidation/breakout**: tight-range windows followed by a one-sided
//!   close beyond the range.
//! - **Price-action**: local extremes with directional follow-through.
//!
//! Both emit [`ZoneCandidate`](crate::ZoneCandidate)s; merging and ranking live
//! in [`merge`](crate::merge) and [`rank`](crate::rank).

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod consolidation;
pub mod price_action;

impl_with_defaults!(ConsolidationDetector, PriceActionDetector);

// Re-export detectors for convenience
pub use consolidation::*;
pub use price_action::*;
