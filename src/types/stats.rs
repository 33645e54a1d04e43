//! Analytics output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::citizen::CitizenId;

/// How many presents one citizen buys in a given month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentCount {
    /// The buyer.
    pub citizen_id: CitizenId,
    /// Number of relatives with a birthday in the month.
    pub presents: u32,
}

/// Month (1..=12) -> buyers in that month.
///
/// Every month is present, empty months hold an empty list. Serializes as a
/// JSON object keyed `"1"` .. `"12"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BirthdayDistribution(BTreeMap<u32, Vec<PresentCount>>);

impl BirthdayDistribution {
    /// Distribution with all twelve months empty.
    pub fn empty() -> Self {
        Self((1..=12).map(|month| (month, Vec::new())).collect())
    }

    /// Build from a month map, filling in missing months.
    pub fn from_months(months: BTreeMap<u32, Vec<PresentCount>>) -> Self {
        let mut dist = Self::empty();
        for (month, buyers) in months {
            dist.0.insert(month, buyers);
        }
        dist
    }

    /// Buyers in `month`.
    pub fn month(&self, month: u32) -> &[PresentCount] {
        self.0.get(&month).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterate months in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[PresentCount])> {
        self.0.iter().map(|(m, v)| (*m, v.as_slice()))
    }

    /// Sum of all present counts, across months and buyers.
    pub fn total_presents(&self) -> u64 {
        self.0
            .values()
            .flat_map(|buyers| buyers.iter())
            .map(|p| u64::from(p.presents))
            .sum()
    }
}

/// Age percentiles for one town.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownAgeStats {
    /// Town name.
    pub town: String,
    /// 50th percentile.
    pub p50: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 99th percentile.
    pub p99: f64,
}
