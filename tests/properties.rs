//! Property tests over randomly generated imports.

use chrono::NaiveDate;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use citizen_registry::analytics::{percentile, PERCENTILES};
use citizen_registry::{CitizenId, CitizenRegistry, InMemoryCitizenStore};

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

/// A batch description: birth dates per citizen plus an undirected edge set.
#[derive(Debug, Clone)]
struct BatchShape {
    births: Vec<(u32, u32, i32)>,
    edges: BTreeSet<(i64, i64)>,
    /// Which side lists each edge: `true` for the lower id.
    listed_by_low: Vec<bool>,
}

fn batch_shape() -> impl Strategy<Value = BatchShape> {
    (1usize..24)
        .prop_flat_map(|n| {
            let births = prop::collection::vec((1u32..=28, 1u32..=12, 1940i32..2023), n);
            let pairs = prop::collection::vec((0..n as i64, 0..n as i64), 0..(n * 2));
            (births, pairs)
        })
        .prop_flat_map(|(births, pairs)| {
            let edges: BTreeSet<(i64, i64)> = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .collect();
            let sides = prop::collection::vec(any::<bool>(), edges.len());
            (Just(births), Just(edges), sides)
        })
        .prop_map(|(births, edges, listed_by_low)| BatchShape {
            births,
            edges,
            listed_by_low,
        })
}

fn towns() -> [&'static str; 3] {
    ["Kazan", "Moscow", "Omsk"]
}

fn payload(shape: &BatchShape) -> Value {
    let mut listed: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for ((low, high), by_low) in shape.edges.iter().zip(&shape.listed_by_low) {
        if *by_low {
            listed.entry(*low).or_default().push(*high);
        } else {
            listed.entry(*high).or_default().push(*low);
        }
    }

    let citizens: Vec<Value> = shape
        .births
        .iter()
        .enumerate()
        .map(|(i, (day, month, year))| {
            let id = i as i64;
            json!({
                "citizen_id": id,
                "town": towns()[i % 3],
                "street": "Lva Tolstogo",
                "building": "16k7s",
                "apartment": id,
                "name": format!("Citizen {}", id),
                "birth_date": format!("{:02}.{:02}.{}", day, month, year),
                "gender": "female",
                "relatives": listed.get(&id).cloned().unwrap_or_default(),
            })
        })
        .collect();
    json!({ "citizens": citizens })
}

proptest! {
    #[test]
    fn prop_percentiles_are_monotonic(years in prop::collection::vec(0u32..120, 1..64)) {
        let mut ages: Vec<f64> = years.into_iter().map(f64::from).collect();
        ages.sort_by(f64::total_cmp);
        let values: Vec<f64> = PERCENTILES.iter().map(|p| percentile(&ages, *p).unwrap()).collect();
        prop_assert!(values[0] <= values[1]);
        prop_assert!(values[1] <= values[2]);
        prop_assert!(values[0] >= ages[0]);
        prop_assert!(values[2] <= ages[ages.len() - 1]);
    }

    #[test]
    fn prop_import_round_trip_is_symmetric(shape in batch_shape()) {
        let rt = runtime();
        let registry = CitizenRegistry::with_clock(Arc::new(InMemoryCitizenStore::new()), fixed_today);

        let citizens = rt.block_on(async {
            let import_id = registry.import_citizens(&payload(&shape)).await.unwrap();
            registry.citizens(import_id).await.unwrap()
        });

        prop_assert_eq!(citizens.len(), shape.births.len());
        for citizen in &citizens {
            let id = citizen.citizen_id.get();
            let expected: Vec<CitizenId> = shape
                .edges
                .iter()
                .filter_map(|(low, high)| match (*low == id, *high == id) {
                    (true, _) => Some(CitizenId::new(*high)),
                    (_, true) => Some(CitizenId::new(*low)),
                    _ => None,
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            prop_assert_eq!(&citizen.relatives, &expected);
        }
    }

    #[test]
    fn prop_presents_are_twice_the_edges(shape in batch_shape()) {
        let rt = runtime();
        let registry = CitizenRegistry::with_clock(Arc::new(InMemoryCitizenStore::new()), fixed_today);

        let distribution = rt.block_on(async {
            let import_id = registry.import_citizens(&payload(&shape)).await.unwrap();
            registry.birthdays(import_id).await.unwrap()
        });

        prop_assert_eq!(distribution.total_presents(), 2 * shape.edges.len() as u64);
    }

    #[test]
    fn prop_town_stats_are_ordered(shape in batch_shape()) {
        let rt = runtime();
        let registry = CitizenRegistry::with_clock(Arc::new(InMemoryCitizenStore::new()), fixed_today);

        let stats = rt.block_on(async {
            let import_id = registry.import_citizens(&payload(&shape)).await.unwrap();
            registry.town_age_percentiles(import_id).await.unwrap()
        });

        let names: Vec<&str> = stats.iter().map(|s| s.town.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&names, &sorted);
        for town in &stats {
            prop_assert!(town.p50 <= town.p75 && town.p75 <= town.p99);
        }
    }
}
