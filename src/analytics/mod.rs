//! Analytics over a committed import.
//!
//! Both computations are pure functions of an import snapshot (the citizen
//! views returned by the store) and never touch storage themselves:
//!
//! ```text
//! CitizenStore → Vec<Citizen> → birthday_distribution  → BirthdayDistribution
//!                             → town_age_percentiles   → Vec<TownAgeStats>
//! ```

pub mod birthdays;
pub mod percentiles;

pub use birthdays::birthday_distribution;
pub use percentiles::{percentile, round2, town_age_percentiles, PERCENTILES};
