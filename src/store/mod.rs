//! Citizen storage backends.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::types::{Citizen, CitizenId, CitizenPatch, ImportId, RelativeEdge, RelativesMap};

/// Trait for citizen storage backends.
///
/// Implementations must make `commit_import` and `replace_citizen` atomic
/// with respect to readers, and must assign import ids without races
/// between concurrent committers. Read methods return `None` for an
/// unknown import.
#[async_trait]
pub trait CitizenStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// One greater than the largest committed import id, or `0` when empty.
    async fn next_import_id(&self) -> Result<ImportId, Self::Error>;

    /// Whether `import_id` names a committed import.
    ///
    /// An id is known iff it is non-negative and below `next_import_id`.
    async fn is_known_import(&self, import_id: ImportId) -> Result<bool, Self::Error> {
        if import_id.get() < 0 {
            return Ok(false);
        }
        Ok(import_id < self.next_import_id().await?)
    }

    /// Atomically assign an id and write all citizens plus their edges.
    async fn commit_import(&self, citizens: Vec<Citizen>) -> Result<ImportId, Self::Error>;

    /// Atomically rewrite one citizen's fields (and edges, if the patch
    /// carries relatives). Returns the updated view, or `None` when the
    /// import or citizen does not exist.
    async fn replace_citizen(
        &self,
        import_id: ImportId,
        citizen_id: CitizenId,
        patch: &CitizenPatch,
    ) -> Result<Option<Citizen>, Self::Error>;

    /// All citizens of an import, ordered by citizen id, with resolved
    /// bidirectional relative lists.
    async fn get_import_citizens(&self, import_id: ImportId) -> Result<Option<Vec<Citizen>>, Self::Error>;

    /// Raw one-directional adjacency of an import.
    async fn get_relatives_map(&self, import_id: ImportId) -> Result<Option<RelativesMap>, Self::Error>;

    /// Citizen ids of an import.
    async fn citizen_ids(&self, import_id: ImportId) -> Result<Option<BTreeSet<CitizenId>>, Self::Error>;

    /// Whether the backend is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Integrity violation caught by a store before writing.
///
/// The validator rejects all of these first; stores check again so that
/// no caller can persist an inconsistent import.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Two citizens with the same id in one batch.
    #[error("Duplicate citizen_id {0} in import batch")]
    DuplicateCitizen(CitizenId),
    /// An edge endpoint that is not a citizen of the import.
    #[error("Citizen {citizen} lists unknown relative {relative}")]
    UnknownRelative {
        /// Citizen declaring the relative.
        citizen: CitizenId,
        /// The missing relative id.
        relative: CitizenId,
    },
}

/// Collect the canonical edge set of a batch, checking id uniqueness and
/// that every relative is a member of the batch.
///
/// Edges listed from both sides collapse into one; self-pairs are dropped.
pub fn batch_edges(citizens: &[Citizen]) -> Result<BTreeSet<RelativeEdge>, IntegrityError> {
    let mut members = BTreeSet::new();
    for citizen in citizens {
        if !members.insert(citizen.citizen_id) {
            return Err(IntegrityError::DuplicateCitizen(citizen.citizen_id));
        }
    }

    let mut edges = BTreeSet::new();
    for citizen in citizens {
        for relative in &citizen.relatives {
            if !members.contains(relative) {
                return Err(IntegrityError::UnknownRelative {
                    citizen: citizen.citizen_id,
                    relative: *relative,
                });
            }
            if let Some(edge) = RelativeEdge::new(citizen.citizen_id, *relative) {
                edges.insert(edge);
            }
        }
    }
    Ok(edges)
}

pub use memory::InMemoryCitizenStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresCitizenStore;
