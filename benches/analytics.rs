//! Performance benchmarks for import analytics.
//!
//! Run with: `cargo bench --bench analytics`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Birthday distribution | Linear in edges | One pass over relative lists |
//! | Town percentiles | n log n | Sort per town |
//! | Import validation | Linear in citizens + edges | Symmetry check over a map |

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use citizen_registry::types::BIRTH_DATE_FORMAT;
use citizen_registry::{
    birthday_distribution, town_age_percentiles, BirthDate, Citizen, CitizenId, Gender, Validator,
};

const TOWNS: [&str; 5] = ["Kazan", "Moscow", "Omsk", "Perm", "Tver"];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default()
}

/// Relatives form a chain with a skip link: `i ~ i+1` and `i ~ i+7`.
fn related(id: i64, n: i64) -> Vec<i64> {
    let mut relatives: Vec<i64> = [id - 7, id - 1, id + 1, id + 7]
        .into_iter()
        .filter(|r| (1..=n).contains(r))
        .collect();
    relatives.sort_unstable();
    relatives
}

fn birth(id: i64) -> NaiveDate {
    let day = (id % 28 + 1) as u32;
    let month = (id % 12 + 1) as u32;
    let year = 1950 + (id % 60) as i32;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn make_citizens(n: i64) -> Vec<Citizen> {
    (1..=n)
        .map(|id| Citizen {
            citizen_id: CitizenId::new(id),
            town: TOWNS[(id as usize) % TOWNS.len()].to_string(),
            street: "Lva Tolstogo".to_string(),
            building: "16k7s".to_string(),
            apartment: id,
            name: format!("Citizen {}", id),
            birth_date: BirthDate::new(birth(id)),
            gender: if id % 2 == 0 { Gender::Female } else { Gender::Male },
            relatives: related(id, n).into_iter().map(CitizenId::new).collect(),
        })
        .collect()
}

fn make_payload(n: i64) -> Value {
    let citizens: Vec<Value> = make_citizens(n)
        .iter()
        .map(|c| {
            json!({
                "citizen_id": c.citizen_id.get(),
                "town": c.town,
                "street": c.street,
                "building": c.building,
                "apartment": c.apartment,
                "name": c.name,
                "birth_date": c.birth_date.date().format(BIRTH_DATE_FORMAT).to_string(),
                "gender": c.gender.as_str(),
                "relatives": c.relatives.iter().map(|r| r.get()).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({ "citizens": citizens })
}

fn bench_birthday_distribution(c: &mut Criterion) {
    let mut group = c.benchmark_group("birthday_distribution");

    for n in [100, 1_000, 10_000] {
        let citizens = make_citizens(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("citizens", n), &citizens, |b, citizens| {
            b.iter(|| birthday_distribution(black_box(citizens)))
        });
    }

    group.finish();
}

fn bench_town_percentiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("town_age_percentiles");

    for n in [100, 1_000, 10_000] {
        let citizens = make_citizens(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("citizens", n), &citizens, |b, citizens| {
            b.iter(|| town_age_percentiles(black_box(citizens), today()))
        });
    }

    group.finish();
}

fn bench_import_validation(c: &mut Criterion) {
    let validator = Validator::new(today());
    let mut group = c.benchmark_group("validate_import");

    for n in [100, 1_000, 10_000] {
        let payload = make_payload(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("citizens", n), &payload, |b, payload| {
            b.iter(|| {
                let citizens = validator.validate_import(black_box(payload));
                assert!(citizens.is_ok());
                citizens
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_birthday_distribution,
    bench_town_percentiles,
    bench_import_validation,
);
criterion_main!(benches);
