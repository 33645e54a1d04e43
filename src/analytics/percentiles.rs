//! Per-town age percentiles.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::types::{Citizen, TownAgeStats};

/// Percentiles reported for every town.
pub const PERCENTILES: [f64; 3] = [50.0, 75.0, 99.0];

/// Percentile of an ascending slice by linear interpolation between the
/// two closest ranks: `rank = p / 100 * (n - 1)`.
///
/// Returns `None` for an empty slice. `p` is clamped to `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = p.clamp(0.0, 100.0) / 100.0 * last as f64;
    let lo = rank.floor() as usize;
    let hi = (rank.ceil() as usize).min(last);
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Age percentiles of every town, ordered by town name.
///
/// Ages are completed years on `today`.
pub fn town_age_percentiles(citizens: &[Citizen], today: NaiveDate) -> Vec<TownAgeStats> {
    let mut ages_by_town: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for citizen in citizens {
        ages_by_town
            .entry(citizen.town.as_str())
            .or_default()
            .push(f64::from(citizen.birth_date.age_on(today)));
    }

    ages_by_town
        .into_iter()
        .filter_map(|(town, mut ages)| {
            ages.sort_by(f64::total_cmp);
            let [p50, p75, p99] = PERCENTILES.map(|p| percentile(&ages, p).map(round2));
            Some(TownAgeStats {
                town: town.to_string(),
                p50: p50?,
                p75: p75?,
                p99: p99?,
            })
        })
        .collect()
}
