//! Core types for the citizen registry.

pub mod citizen;
pub mod relative;
pub mod stats;

pub use citizen::{BirthDate, Citizen, CitizenId, CitizenPatch, Gender, ImportId, BIRTH_DATE_FORMAT};
pub use relative::{RelativeEdge, RelativesMap};
pub use stats::{BirthdayDistribution, PresentCount, TownAgeStats};
