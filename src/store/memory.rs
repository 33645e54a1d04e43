//! In-memory citizen store.
//!
//! Imports live in a `Vec` indexed by import id. The outer lock is held
//! for writing only while an import is appended, which is also when its id
//! is assigned, so concurrent committers can never share an id. Each import
//! has its own lock: replacing a citizen in one import never blocks readers
//! of another.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{batch_edges, CitizenStore, IntegrityError};
use crate::graph::ImportGraph;
use crate::types::{Citizen, CitizenId, CitizenPatch, ImportId, RelativeEdge, RelativesMap};

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Batch or patch would break import consistency.
    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityError),
}

/// Rows of one import.
///
/// Citizens are kept with an empty `relatives` list; relative lists are
/// derived from `edges` on every read.
#[derive(Debug, Clone, Default)]
struct ImportData {
    citizens: BTreeMap<CitizenId, Citizen>,
    edges: BTreeSet<RelativeEdge>,
}

impl ImportData {
    fn graph(&self) -> ImportGraph {
        ImportGraph::new(self.citizens.keys().copied().collect(), self.edges.iter().copied())
    }

    fn view(&self, graph: &ImportGraph, id: CitizenId) -> Option<Citizen> {
        self.citizens.get(&id).map(|row| Citizen {
            relatives: graph.relatives_of(id),
            ..row.clone()
        })
    }
}

/// In-memory citizen store.
///
/// Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCitizenStore {
    imports: Arc<RwLock<Vec<Arc<RwLock<ImportData>>>>>,
}

impl InMemoryCitizenStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed imports.
    pub fn num_imports(&self) -> usize {
        self.imports.read().len()
    }

    fn slot(&self, import_id: ImportId) -> Option<Arc<RwLock<ImportData>>> {
        let index = usize::try_from(import_id.get()).ok()?;
        self.imports.read().get(index).cloned()
    }
}

#[async_trait]
impl CitizenStore for InMemoryCitizenStore {
    type Error = InMemoryError;

    async fn next_import_id(&self) -> Result<ImportId, Self::Error> {
        Ok(ImportId::new(self.imports.read().len() as i64))
    }

    async fn commit_import(&self, citizens: Vec<Citizen>) -> Result<ImportId, Self::Error> {
        let edges = batch_edges(&citizens)?;
        let data = ImportData {
            citizens: citizens
                .into_iter()
                .map(|citizen| {
                    let row = Citizen {
                        relatives: Vec::new(),
                        ..citizen
                    };
                    (row.citizen_id, row)
                })
                .collect(),
            edges,
        };

        let mut imports = self.imports.write();
        let import_id = ImportId::new(imports.len() as i64);
        imports.push(Arc::new(RwLock::new(data)));
        Ok(import_id)
    }

    async fn replace_citizen(
        &self,
        import_id: ImportId,
        citizen_id: CitizenId,
        patch: &CitizenPatch,
    ) -> Result<Option<Citizen>, Self::Error> {
        let Some(slot) = self.slot(import_id) else {
            return Ok(None);
        };
        let mut data = slot.write();
        if !data.citizens.contains_key(&citizen_id) {
            return Ok(None);
        }

        if let Some(relatives) = &patch.relatives {
            if let Some(unknown) = relatives.iter().find(|r| !data.citizens.contains_key(*r)) {
                return Err(IntegrityError::UnknownRelative {
                    citizen: citizen_id,
                    relative: *unknown,
                }
                .into());
            }
        }

        if let Some(row) = data.citizens.get_mut(&citizen_id) {
            row.apply_scalars(patch);
        }
        if let Some(relatives) = &patch.relatives {
            data.edges.retain(|edge| !edge.touches(citizen_id));
            let fresh: Vec<RelativeEdge> = relatives
                .iter()
                .filter_map(|relative| RelativeEdge::new(citizen_id, *relative))
                .collect();
            data.edges.extend(fresh);
        }

        let graph = data.graph();
        Ok(data.view(&graph, citizen_id))
    }

    async fn get_import_citizens(&self, import_id: ImportId) -> Result<Option<Vec<Citizen>>, Self::Error> {
        let Some(slot) = self.slot(import_id) else {
            return Ok(None);
        };
        let data = slot.read();
        let graph = data.graph();
        Ok(Some(
            data.citizens
                .keys()
                .filter_map(|id| data.view(&graph, *id))
                .collect(),
        ))
    }

    async fn get_relatives_map(&self, import_id: ImportId) -> Result<Option<RelativesMap>, Self::Error> {
        let Some(slot) = self.slot(import_id) else {
            return Ok(None);
        };
        let data = slot.read();
        let mut map = RelativesMap::new();
        for edge in &data.edges {
            map.entry(edge.low()).or_default().push(edge.high());
        }
        Ok(Some(map))
    }

    async fn citizen_ids(&self, import_id: ImportId) -> Result<Option<BTreeSet<CitizenId>>, Self::Error> {
        Ok(self
            .slot(import_id)
            .map(|slot| slot.read().citizens.keys().copied().collect()))
    }
}
