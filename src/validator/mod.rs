//! Payload validation.
//!
//! The validator turns untyped JSON into the typed records the store
//! accepts. Every check short-circuits: the first failing citizen or
//! field rejects the whole payload with a single error, and nothing is
//! written.
//!
//! ## Import
//!
//! 1. The payload carries a `citizens` array of objects.
//! 2. `citizen_id` values are pairwise distinct (checked before anything else).
//! 3. Each citizen has exactly the nine known fields; each field passes its rule.
//! 4. The collected relatives map is consistent: no repeats, no self-references,
//!    no ids outside the batch.
//!
//! ## Replace
//!
//! The payload is a partial citizen without `citizen_id`. A supplied
//! relative list must only name citizens of the target import.

pub mod rules;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::graph::ImportGraph;
use crate::types::{Citizen, CitizenId, CitizenPatch, RelativesMap};

pub use rules::{check_field, check_relative_list, Field, FieldRule, MAX_STRING_LEN, RELATIVES};

/// Number of fields a citizen must carry on import.
pub const IMPORT_FIELD_COUNT: usize = Field::ALL.len() + 1;

/// What is wrong with a relative list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelativesProblem {
    /// Element that is not an integer (JSON text).
    NotInteger(String),
    /// Same relative listed twice.
    Duplicate(CitizenId),
    /// Citizen lists itself.
    SelfReference(CitizenId),
    /// Relative id that does not belong to the import.
    Unknown(CitizenId),
}

impl fmt::Display for RelativesProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInteger(value) => write!(f, "{} is not an integer", value),
            Self::Duplicate(id) => write!(f, "{} is listed more than once", id),
            Self::SelfReference(id) => write!(f, "citizen {} lists itself", id),
            Self::Unknown(id) => write!(f, "{} is not a citizen of this import", id),
        }
    }
}

/// Validation failure, reported to callers as a bad request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Import payload without a `citizens` array.
    #[error("\"citizens\" is not in json form.")]
    MissingCitizens,
    /// A citizen (or replace payload) that is not a JSON object.
    #[error("Every citizen must be a JSON object.")]
    NotAnObject,
    /// Repeated `citizen_id` in one import batch.
    #[error("\"citizen_id\" must be unique for upload: {0} is repeated.")]
    DuplicateCitizenId(String),
    /// Citizen with too many or too few fields.
    #[error("Number of fields not match the allowed number of fields: expected {expected}, found {found}.")]
    FieldCount {
        /// Required number of fields.
        expected: usize,
        /// Number of fields supplied.
        found: usize,
    },
    /// Field name outside the known set.
    #[error("You have some fields that are not supported: \"{0}\".")]
    UnsupportedField(String),
    /// Replace payload trying to set `citizen_id`.
    #[error("\"citizen_id\" cannot be changed.")]
    ImmutableCitizenId,
    /// Field value rejected by its rule.
    #[error("\"{field}\" = {value} field is not correct.")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Rejected value, as JSON.
        value: String,
    },
    /// `relatives` that is not an array.
    #[error("\"relatives\" field must be a list.")]
    RelativesNotList,
    /// Relative list with a bad element or reference.
    #[error("Some of the \"relatives\" fields of your citizens is not correct: {0}.")]
    InvalidRelatives(RelativesProblem),
    /// Payload that passed every rule but still failed to decode.
    #[error("Malformed citizen payload: {0}")]
    Malformed(String),
}

/// Validation mode, with the context each mode needs.
#[derive(Debug, Clone, Copy)]
pub enum Mode<'a> {
    /// Whole import batch.
    Import,
    /// Partial update of `citizen_id` inside the import described by `graph`.
    Replace {
        /// Citizen being replaced.
        citizen_id: CitizenId,
        /// Current members and edges of the import.
        graph: &'a ImportGraph,
    },
}

/// Typed result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// Citizens of an import batch, relatives as submitted.
    Import(Vec<Citizen>),
    /// Fields of a replace payload.
    Replace(CitizenPatch),
}

/// Stateless rule engine, parameterised by the current date.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    today: NaiveDate,
}

impl Validator {
    /// Create a validator that treats `today` as the current date.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// The date birth dates must precede.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Validate a payload in the given mode.
    pub fn validate(&self, payload: &Value, mode: Mode<'_>) -> Result<Validated, ValidationError> {
        match mode {
            Mode::Import => self.validate_import(payload).map(Validated::Import),
            Mode::Replace { citizen_id, graph } => self
                .validate_replace(payload, citizen_id, graph)
                .map(Validated::Replace),
        }
    }

    /// Validate an import batch and decode its citizens.
    pub fn validate_import(&self, payload: &Value) -> Result<Vec<Citizen>, ValidationError> {
        let items = payload
            .get("citizens")
            .and_then(Value::as_array)
            .ok_or(ValidationError::MissingCitizens)?;

        let objects = items
            .iter()
            .map(|item| item.as_object().ok_or(ValidationError::NotAnObject))
            .collect::<Result<Vec<_>, _>>()?;

        check_unique_ids(&objects)?;

        // citizen_id -> relatives as submitted
        let mut relatives = RelativesMap::new();
        let mut citizen_ids = BTreeSet::new();
        for citizen in &objects {
            if citizen.len() != IMPORT_FIELD_COUNT {
                return Err(ValidationError::FieldCount {
                    expected: IMPORT_FIELD_COUNT,
                    found: citizen.len(),
                });
            }
            let listed = self.check_fields(citizen)?;
            let id = citizen
                .get(Field::CitizenId.name())
                .and_then(Value::as_i64)
                .map(CitizenId::new)
                .ok_or_else(|| ValidationError::InvalidField {
                    field: Field::CitizenId.name(),
                    value: Value::Null.to_string(),
                })?;
            citizen_ids.insert(id);
            relatives.insert(id, listed.unwrap_or_default());
        }

        check_relatives(&relatives, &citizen_ids)?;

        items
            .iter()
            .map(|item| {
                serde_json::from_value::<Citizen>(item.clone())
                    .map_err(|e| ValidationError::Malformed(e.to_string()))
            })
            .collect()
    }

    /// Validate a replace payload for `citizen_id` and decode it.
    pub fn validate_replace(
        &self,
        payload: &Value,
        citizen_id: CitizenId,
        graph: &ImportGraph,
    ) -> Result<CitizenPatch, ValidationError> {
        let fields = payload.as_object().ok_or(ValidationError::NotAnObject)?;
        if fields.contains_key(Field::CitizenId.name()) {
            return Err(ValidationError::ImmutableCitizenId);
        }

        if let Some(listed) = self.check_fields(fields)? {
            let mut relatives = RelativesMap::new();
            relatives.insert(citizen_id, listed);
            check_relatives(&relatives, graph.members())?;
        }

        serde_json::from_value::<CitizenPatch>(payload.clone())
            .map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Run every field of one citizen object through its rule.
    ///
    /// Returns the relative list if the object has one.
    fn check_fields(&self, citizen: &Map<String, Value>) -> Result<Option<Vec<CitizenId>>, ValidationError> {
        let mut listed = None;
        for (name, value) in citizen {
            if name == RELATIVES {
                listed = Some(check_relative_list(value)?);
                continue;
            }
            check_field(name, value, self.today)?;
        }
        Ok(listed)
    }
}

fn check_unique_ids(citizens: &[&Map<String, Value>]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for citizen in citizens {
        if let Some(id) = citizen.get(Field::CitizenId.name()) {
            let key = id.to_string();
            if !seen.insert(key.clone()) {
                return Err(ValidationError::DuplicateCitizenId(key));
            }
        }
    }
    Ok(())
}

/// Check a relatives map against the set of citizens it may reference.
///
/// For every citizen: no repeated relative, no self-reference and every
/// relative is in `members`.
pub fn check_relatives(
    relatives: &RelativesMap,
    members: &BTreeSet<CitizenId>,
) -> Result<(), ValidationError> {
    for (citizen, listed) in relatives {
        let mut seen = BTreeSet::new();
        for relative in listed {
            let problem = if !seen.insert(*relative) {
                Some(RelativesProblem::Duplicate(*relative))
            } else if relative == citizen {
                Some(RelativesProblem::SelfReference(*citizen))
            } else if !members.contains(relative) {
                Some(RelativesProblem::Unknown(*relative))
            } else {
                None
            };
            if let Some(problem) = problem {
                return Err(ValidationError::InvalidRelatives(problem));
            }
        }
    }
    Ok(())
}
