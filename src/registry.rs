//! Registry facade.
//!
//! Wires the validator, a [`CitizenStore`], the relative graph and the
//! analytics into the five operations the request layer consumes.

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analytics::{birthday_distribution, town_age_percentiles};
use crate::graph::ImportGraph;
use crate::store::CitizenStore;
use crate::types::{BirthdayDistribution, Citizen, CitizenId, ImportId, TownAgeStats};
use crate::validator::{ValidationError, Validator};

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Payload rejected before any write.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Import id that was never committed.
    #[error("No such \"import_id\" = {0} in database.")]
    ImportNotFound(ImportId),
    /// Citizen absent from a known import.
    #[error("Citizen with \"citizen_id\" = {citizen_id} is not in import {import_id}.")]
    CitizenNotFound {
        /// Import searched.
        import_id: ImportId,
        /// Missing citizen.
        citizen_id: CitizenId,
    },
    /// Storage failure, surfaced as-is.
    #[error("Store error: {0}")]
    Store(String),
}

impl RegistryError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ImportNotFound(_) => "IMPORT_NOT_FOUND",
            Self::CitizenNotFound { .. } => "CITIZEN_NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether the error means "no such import or citizen".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ImportNotFound(_) | Self::CitizenNotFound { .. })
    }
}

/// Current UTC date.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Citizen registry over a store backend.
pub struct CitizenRegistry<S: CitizenStore> {
    store: Arc<S>,
    clock: fn() -> NaiveDate,
}

impl<S: CitizenStore> CitizenRegistry<S> {
    /// Create a registry using the UTC date as "today".
    pub fn new(store: S) -> Self {
        Self::with_clock(Arc::new(store), utc_today)
    }

    /// Create a registry over a shared store with a custom date source.
    pub fn with_clock(store: Arc<S>, clock: fn() -> NaiveDate) -> Self {
        Self { store, clock }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Today's date according to the registry clock.
    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    fn validator(&self) -> Validator {
        Validator::new(self.today())
    }

    async fn ensure_import(&self, import_id: ImportId) -> Result<(), RegistryError> {
        let known = self
            .store
            .is_known_import(import_id)
            .await
            .map_err(RegistryError::from_store)?;
        if known {
            Ok(())
        } else {
            Err(RegistryError::ImportNotFound(import_id))
        }
    }

    /// Validate and commit an import batch.
    pub async fn import_citizens(&self, payload: &Value) -> Result<ImportId, RegistryError> {
        let citizens = self.validator().validate_import(payload)?;
        let count = citizens.len();
        let import_id = self
            .store
            .commit_import(citizens)
            .await
            .map_err(RegistryError::from_store)?;

        info!(import_id = %import_id, citizens = count, "Import committed");
        Ok(import_id)
    }

    /// Validate a partial update and apply it to one citizen.
    pub async fn replace_citizen(
        &self,
        import_id: ImportId,
        citizen_id: CitizenId,
        payload: &Value,
    ) -> Result<Citizen, RegistryError> {
        self.ensure_import(import_id).await?;
        let graph = ImportGraph::load(self.store.as_ref(), import_id)
            .await
            .map_err(RegistryError::from_store)?
            .ok_or(RegistryError::ImportNotFound(import_id))?;
        if !graph.contains(citizen_id) {
            return Err(RegistryError::CitizenNotFound { import_id, citizen_id });
        }

        let patch = self.validator().validate_replace(payload, citizen_id, &graph)?;
        let updated = self
            .store
            .replace_citizen(import_id, citizen_id, &patch)
            .await
            .map_err(RegistryError::from_store)?
            .ok_or(RegistryError::CitizenNotFound { import_id, citizen_id })?;

        info!(
            import_id = %import_id,
            citizen_id = %citizen_id,
            relatives_rewritten = patch.relatives.is_some(),
            "Citizen replaced"
        );
        Ok(updated)
    }

    /// All citizens of an import.
    pub async fn citizens(&self, import_id: ImportId) -> Result<Vec<Citizen>, RegistryError> {
        self.ensure_import(import_id).await?;
        let citizens = self
            .store
            .get_import_citizens(import_id)
            .await
            .map_err(RegistryError::from_store)?
            .ok_or(RegistryError::ImportNotFound(import_id))?;

        debug!(import_id = %import_id, citizens = citizens.len(), "Import read");
        Ok(citizens)
    }

    /// Monthly present counts of an import.
    pub async fn birthdays(&self, import_id: ImportId) -> Result<BirthdayDistribution, RegistryError> {
        let citizens = self.citizens(import_id).await?;
        Ok(birthday_distribution(&citizens))
    }

    /// Age percentiles per town of an import.
    pub async fn town_age_percentiles(&self, import_id: ImportId) -> Result<Vec<TownAgeStats>, RegistryError> {
        let citizens = self.citizens(import_id).await?;
        Ok(town_age_percentiles(&citizens, self.today()))
    }
}

impl<S: CitizenStore> Clone for CitizenRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: self.clock,
        }
    }
}
