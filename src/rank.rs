//! Zone ranking and display-side relevance filtering

use crate::params::DisplayOptions;
use crate::{Zone, ZoneKind};

/// Order zones by strength, strongest first. Stable: equal strengths keep
/// their incoming order.
pub fn rank_zones(zones: &mut [Zone]) {
    zones.sort_by(|a, b| b.strength.total_cmp(&a.strength));
}

/// Keeps zones close enough to the current price to matter on a chart.
///
/// Supply zones must sit above `price * (1 - tolerance)`; demand zones below
/// `price * (1 + tolerance)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceFilter {
    pub current_price: f64,
    pub tolerance: f64,
    pub show_supply: bool,
    pub show_demand: bool,
}

impl RelevanceFilter {
    pub fn new(current_price: f64) -> Self {
        Self::from_options(current_price, &DisplayOptions::default())
    }

    pub fn from_options(current_price: f64, options: &DisplayOptions) -> Self {
        Self {
            current_price,
            tolerance: options.tolerance,
            show_supply: options.show_supply,
            show_demand: options.show_demand,
        }
    }

    pub fn is_relevant(&self, zone: &Zone) -> bool {
        match zone.kind {
            ZoneKind::Supply => {
                self.show_supply && zone.lower > self.current_price * (1.0 - self.tolerance)
            }
            ZoneKind::Demand => {
                self.show_demand && zone.upper < self.current_price * (1.0 + self.tolerance)
            }
        }
    }

    /// Relevant zones, order preserved.
    pub fn apply(&self, zones: &[Zone]) -> Vec<Zone> {
        zones.iter().filter(|z| self.is_relevant(z)).cloned().collect()
    }
}
