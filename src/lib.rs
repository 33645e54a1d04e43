//! # citizen-registry
//!
//! Registry of citizen imports with relative graphs and birthday analytics.
//!
//! An import is an immutable-id batch of citizens. Each citizen lists its
//! relatives within the same import; the relation is symmetric.
//!
//! ## Core Contract
//!
//! 1. Validate a batch completely before anything is written
//! 2. Commit it atomically under a fresh, never-reused import id
//! 3. Replace individual citizens atomically, keeping the relation symmetric
//! 4. Answer listing, birthday-gift and age-percentile queries from one
//!    consistent snapshot of an import
//!
//! ## Architecture
//!
//! ```text
//! JSON payload → Validator → CitizenStore (Postgres or Memory)
//!                                 ↓
//!                 ImportGraph ← relatives → analytics
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Citizens are listed by `citizen_id`, relatives ascending
//! - Buyers within a month are ordered by `citizen_id`
//! - Towns are ordered lexicographically

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analytics;
pub mod config;
pub mod graph;
pub mod registry;
pub mod store;
pub mod types;
pub mod validator;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    BirthDate, BirthdayDistribution, Citizen, CitizenId, CitizenPatch, Gender, ImportId, PresentCount,
    RelativeEdge, RelativesMap, TownAgeStats,
};
pub use validator::{ValidationError, Validator};
pub use store::{CitizenStore, InMemoryCitizenStore, IntegrityError};
#[cfg(feature = "postgres")]
pub use store::PostgresCitizenStore;
pub use graph::{expand_relatives, ImportGraph};
pub use analytics::{birthday_distribution, town_age_percentiles};
pub use registry::{CitizenRegistry, RegistryError};
pub use config::{ServiceConfig, StoreBackend};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};
