//! Interval merging of same-kind zone candidates
//!
//! Candidates are swept in anchor-time order. Each overlapping neighbour
//! widens the running zone to the union of both bands; everything except the
//! band is taken from the stronger of the two. A grown zone can reach back over
//! an earlier one, so sweeps repeat until one makes no merge.

use std::cmp::Ordering;

use crate::{Zone, ZoneCandidate};

/// Canonical sweep order: anchor time, then band, then score.
fn sweep_order(a: &Zone, b: &Zone) -> Ordering {
    a.anchor_timestamp
        .cmp(&b.anchor_timestamp)
        .then_with(|| a.lower.total_cmp(&b.lower))
        .then_with(|| a.upper.total_cmp(&b.upper))
        .then_with(|| a.strength.total_cmp(&b.strength))
        .then_with(|| a.level.total_cmp(&b.level))
        .then_with(|| a.volume.total_cmp(&b.volume))
        .then_with(|| a.is_consolidation.cmp(&b.is_consolidation))
}

/// Fold `next` into `acc`. Ties in strength keep the accumulator's fields.
fn absorb(acc: Zone, next: Zone) -> Zone {
    let lower = acc.lower.min(next.lower);
    let upper = acc.upper.max(next.upper);
    let mut merged = if next.strength > acc.strength { next } else { acc };
    merged.lower = lower;
    merged.upper = upper;
    merged.level = lower + (upper - lower) / 2.0;
    merged
}

/// One left-to-right pass over the candidates in sweep order.
fn sweep(mut candidates: Vec<Zone>) -> Vec<Zone> {
    candidates.sort_by(sweep_order);

    let mut merged = Vec::with_capacity(candidates.len());
    let mut iter = candidates.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for next in iter {
        if current.overlaps(&next) {
            current = absorb(current, next);
        } else {
            merged.push(std::mem::replace(&mut current, next));
        }
    }
    merged.push(current);

    merged
}

/// Merge overlapping candidates of a single kind.
///
/// Output is in sweep order and no two neighbours overlap, so merging the
/// output again returns it unchanged.
pub fn merge_zones(mut candidates: Vec<ZoneCandidate>) -> Vec<Zone> {
    debug_assert!(
        candidates.windows(2).all(|w| w[0].kind == w[1].kind),
        "merge_zones expects candidates of one kind"
    );

    loop {
        let before = candidates.len();
        candidates = sweep(candidates);
        // a pass without merges leaves the input sorted and unchanged
        if candidates.len() == before {
            return candidates;
        }
    }
}

/// Split candidates by kind and merge each kind. Supply zones come first.
pub fn merge_by_kind(candidates: Vec<ZoneCandidate>) -> Vec<Zone> {
    let (supply, demand): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|z| z.kind.is_supply());

    let before = supply.len() + demand.len();
    let mut zones = merge_zones(supply);
    zones.extend(merge_zones(demand));
    log::debug!("merged {} candidates into {} zones", before, zones.len());
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZoneKind;

    fn zone(kind: ZoneKind, ts: i64, lower: f64, upper: f64, strength: f64) -> Zone {
        Zone {
            kind,
            level: (lower + upper) / 2.0,
            upper,
            lower,
            strength,
            anchor_timestamp: ts,
            anchor_index: ts as usize,
            volume: strength * 10.0,
            avg_volume: 1.0,
            is_consolidation: true,
            price_range: Some(upper - lower),
            atr: Some(strength / 100.0),
        }
    }

    #[test]
    fn test_overlap_takes_union_and_stronger_fields() {
        let a = zone(ZoneKind::Supply, 1, 10.0, 20.0, 40.0);
        let b = zone(ZoneKind::Supply, 2, 15.0, 25.0, 70.0);
        let merged = merge_zones(vec![a, b.clone()]);

        assert_eq!(merged.len(), 1);
        let z = &merged[0];
        assert_eq!((z.lower, z.upper), (10.0, 25.0));
        assert_eq!(z.level, 17.5);
        assert_eq!(z.strength, 70.0);
        assert_eq!(z.price_range, b.price_range);
        assert_eq!(z.atr, b.atr);
        assert_eq!(z.volume, b.volume);
        assert_eq!(z.anchor_timestamp, 2);
    }

    #[test]
    fn test_equal_strength_keeps_earlier() {
        let a = zone(ZoneKind::Demand, 1, 10.0, 20.0, 50.0);
        let b = zone(ZoneKind::Demand, 2, 12.0, 22.0, 50.0);
        let merged = merge_zones(vec![b, a]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].anchor_timestamp, 1);
    }

    #[test]
    fn test_touching_bands_merge() {
        let a = zone(ZoneKind::Demand, 1, 10.0, 20.0, 10.0);
        let b = zone(ZoneKind::Demand, 2, 20.0, 30.0, 10.0);
        assert_eq!(merge_zones(vec![a, b]).len(), 1);
    }

    #[test]
    fn test_disjoint_kept_in_time_order() {
        let a = zone(ZoneKind::Supply, 5, 30.0, 40.0, 10.0);
        let b = zone(ZoneKind::Supply, 1, 10.0, 20.0, 90.0);
        let merged = merge_zones(vec![a, b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].anchor_timestamp, 1);
        assert_eq!(merged[1].anchor_timestamp, 5);
    }

    #[test]
    fn test_disjoint_late_zone_kept() {
        let a = zone(ZoneKind::Supply, 1, 10.0, 20.0, 10.0);
        let b = zone(ZoneKind::Supply, 2, 50.0, 60.0, 10.0);
        let c = zone(ZoneKind::Supply, 3, 15.0, 18.0, 10.0);
        let merged = merge_zones(vec![a, b, c]);
        // c overlaps a but never neighbours it in time order
        assert_eq!(merged.len(), 3);
        assert_eq!(merge_zones(merged.clone()), merged);
    }

    #[test]
    fn test_grown_zone_folds_back() {
        let a = zone(ZoneKind::Supply, 1, 10.0, 20.0, 10.0);
        let b = zone(ZoneKind::Supply, 2, 50.0, 60.0, 10.0);
        let c = zone(ZoneKind::Supply, 3, 15.0, 55.0, 30.0);
        let merged = merge_zones(vec![a, b, c]);
        assert_eq!(merged.len(), 1);
        assert_eq!((merged[0].lower, merged[0].upper), (10.0, 60.0));
        assert_eq!(merged[0].strength, 30.0);
        assert_eq!(merge_zones(merged.clone()), merged);
    }

    #[test]
    fn test_chain_merge() {
        let zones = vec![
            zone(ZoneKind::Demand, 1, 10.0, 12.0, 30.0),
            zone(ZoneKind::Demand, 2, 11.0, 14.0, 20.0),
            zone(ZoneKind::Demand, 3, 13.5, 16.0, 80.0),
        ];
        let merged = merge_zones(zones);
        assert_eq!(merged.len(), 1);
        assert_eq!((merged[0].lower, merged[0].upper), (10.0, 16.0));
        assert_eq!(merged[0].strength, 80.0);
    }

    #[test]
    fn test_merge_by_kind_keeps_kinds_apart() {
        let zones = vec![
            zone(ZoneKind::Demand, 1, 10.0, 20.0, 30.0),
            zone(ZoneKind::Supply, 2, 15.0, 25.0, 40.0),
            zone(ZoneKind::Demand, 3, 18.0, 22.0, 50.0),
        ];
        let merged = merge_by_kind(zones);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].kind, ZoneKind::Supply);
        assert_eq!(merged[1].kind, ZoneKind::Demand);
        assert_eq!((merged[1].lower, merged[1].upper), (10.0, 22.0));
    }

    #[test]
    fn test_empty() {
        assert!(merge_zones(Vec::new()).is_empty());
        assert!(merge_by_kind(Vec::new()).is_empty());
    }
}
