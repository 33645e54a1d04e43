//! Shared service state.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::registry::CitizenRegistry;
use crate::store::CitizenStore;

/// Shared service state.
///
/// Holds the registry facade; handlers clone it per request.
pub struct ServiceState<S: CitizenStore + 'static> {
    /// The registry all handlers delegate to.
    pub registry: CitizenRegistry<S>,
    /// Backend label reported by the health endpoint.
    pub backend: &'static str,
}

impl<S: CitizenStore + 'static> ServiceState<S> {
    /// Create service state over a store, using the UTC date as "today".
    pub fn new(store: S, backend: &'static str) -> Self {
        Self {
            registry: CitizenRegistry::new(store),
            backend,
        }
    }

    /// Create service state with a custom date source.
    pub fn with_clock(store: Arc<S>, backend: &'static str, clock: fn() -> NaiveDate) -> Self {
        Self {
            registry: CitizenRegistry::with_clock(store, clock),
            backend,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        self.registry.store()
    }
}

impl<S: CitizenStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            backend: self.backend,
        }
    }
}
