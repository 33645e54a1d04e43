//! Per-field validation rules.
//!
//! Each scalar field name maps to one rule function through [`Field::rule`].
//! Names outside the table are rejected as unsupported rather than
//! ignored. `relatives` is not a scalar field and is checked by
//! [`check_relative_list`] instead.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeSet;

use super::{RelativesProblem, ValidationError};
use crate::types::{BirthDate, CitizenId, Gender};

/// Name of the relative list field.
pub const RELATIVES: &str = "relatives";

/// Longest accepted string value, in characters.
pub const MAX_STRING_LEN: usize = 256;

/// Signature shared by all scalar field rules.
pub type FieldRule = fn(Field, &Value, NaiveDate) -> Result<(), ValidationError>;

/// Scalar citizen fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// `citizen_id`
    CitizenId,
    /// `town`
    Town,
    /// `street`
    Street,
    /// `building`
    Building,
    /// `apartment`
    Apartment,
    /// `name`
    Name,
    /// `birth_date`
    BirthDate,
    /// `gender`
    Gender,
}

impl Field {
    /// Every scalar field, in wire order.
    pub const ALL: [Field; 8] = [
        Field::CitizenId,
        Field::Town,
        Field::Street,
        Field::Building,
        Field::Apartment,
        Field::Name,
        Field::BirthDate,
        Field::Gender,
    ];

    /// Look up a field by its JSON name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "citizen_id" => Some(Self::CitizenId),
            "town" => Some(Self::Town),
            "street" => Some(Self::Street),
            "building" => Some(Self::Building),
            "apartment" => Some(Self::Apartment),
            "name" => Some(Self::Name),
            "birth_date" => Some(Self::BirthDate),
            "gender" => Some(Self::Gender),
            _ => None,
        }
    }

    /// JSON name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CitizenId => "citizen_id",
            Self::Town => "town",
            Self::Street => "street",
            Self::Building => "building",
            Self::Apartment => "apartment",
            Self::Name => "name",
            Self::BirthDate => "birth_date",
            Self::Gender => "gender",
        }
    }

    /// The rule that checks this field.
    pub fn rule(&self) -> FieldRule {
        match self {
            Self::CitizenId | Self::Apartment => check_non_negative_int,
            Self::Town | Self::Street | Self::Building => check_string_value,
            Self::Name => check_name,
            Self::BirthDate => check_birth_date,
            Self::Gender => check_gender,
        }
    }
}

/// Check one `(name, value)` pair of a citizen object.
///
/// Unknown names fail with [`ValidationError::UnsupportedField`].
pub fn check_field(name: &str, value: &Value, today: NaiveDate) -> Result<(), ValidationError> {
    match Field::from_name(name) {
        Some(field) => (field.rule())(field, value, today),
        None => Err(ValidationError::UnsupportedField(name.to_string())),
    }
}

fn invalid(field: Field, value: &Value) -> ValidationError {
    ValidationError::InvalidField {
        field: field.name(),
        value: value.to_string(),
    }
}

fn check_non_negative_int(field: Field, value: &Value, _today: NaiveDate) -> Result<(), ValidationError> {
    match value.as_i64() {
        Some(n) if n >= 0 => Ok(()),
        _ => Err(invalid(field, value)),
    }
}

fn check_string_value(field: Field, value: &Value, _today: NaiveDate) -> Result<(), ValidationError> {
    match value.as_str() {
        Some(s)
            if s != "null"
                && s.chars().any(char::is_alphanumeric)
                && s.chars().count() <= MAX_STRING_LEN =>
        {
            Ok(())
        }
        _ => Err(invalid(field, value)),
    }
}

fn check_name(field: Field, value: &Value, _today: NaiveDate) -> Result<(), ValidationError> {
    match value.as_str() {
        Some(s) if (1..=MAX_STRING_LEN).contains(&s.chars().count()) => Ok(()),
        _ => Err(invalid(field, value)),
    }
}

fn check_birth_date(field: Field, value: &Value, today: NaiveDate) -> Result<(), ValidationError> {
    match value.as_str().and_then(BirthDate::parse) {
        Some(date) if date.date() < today => Ok(()),
        _ => Err(invalid(field, value)),
    }
}

fn check_gender(field: Field, value: &Value, _today: NaiveDate) -> Result<(), ValidationError> {
    match value.as_str().and_then(Gender::from_str) {
        Some(_) => Ok(()),
        None => Err(invalid(field, value)),
    }
}

/// Check the shape of one citizen's relative list: a JSON array of
/// integers with no repeats.
pub fn check_relative_list(value: &Value) -> Result<Vec<CitizenId>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::RelativesNotList)?;
    let mut seen = BTreeSet::new();
    let mut relatives = Vec::with_capacity(items.len());
    for item in items {
        let id = item.as_i64().map(CitizenId::new).ok_or_else(|| {
            ValidationError::InvalidRelatives(RelativesProblem::NotInteger(item.to_string()))
        })?;
        if !seen.insert(id) {
            return Err(ValidationError::InvalidRelatives(RelativesProblem::Duplicate(id)));
        }
        relatives.push(id);
    }
    Ok(relatives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn check(name: &str, value: Value) -> Result<(), ValidationError> {
        check_field(name, &value, today())
    }

    #[test]
    fn test_field_names_roundtrip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name(RELATIVES), None);
    }

    #[test]
    fn test_unknown_field_fails_closed() {
        assert_eq!(
            check("nickname", json!("Bob")),
            Err(ValidationError::UnsupportedField("nickname".to_string()))
        );
    }

    #[test]
    fn test_integers() {
        assert!(check("citizen_id", json!(0)).is_ok());
        assert!(check("apartment", json!(12)).is_ok());
        assert!(check("citizen_id", json!(-1)).is_err());
        assert!(check("apartment", json!(1.5)).is_err());
        assert!(check("apartment", json!("7")).is_err());
        assert!(check("citizen_id", json!(true)).is_err());
        assert!(check("citizen_id", json!(null)).is_err());
    }

    #[test]
    fn test_string_values() {
        assert!(check("town", json!("Moscow")).is_ok());
        assert!(check("building", json!("16k7s")).is_ok());
        assert!(check("street", json!("-1")).is_ok());
        assert!(check("town", json!("null")).is_err());
        assert!(check("town", json!("")).is_err());
        assert!(check("street", json!("- ,.")).is_err());
        assert!(check("town", json!(null)).is_err());
        assert!(check("town", json!(5)).is_err());
        assert!(check("town", json!("a".repeat(256))).is_ok());
        assert!(check("town", json!("a".repeat(257))).is_err());
    }

    #[test]
    fn test_string_rule_counts_characters() {
        assert!(check("town", json!("ё".repeat(256))).is_ok());
    }

    #[test]
    fn test_name_length_bounds() {
        assert!(check("name", json!("A")).is_ok());
        assert!(check("name", json!(" ")).is_ok());
        assert!(check("name", json!("")).is_err());
        assert!(check("name", json!("n".repeat(256))).is_ok());
        assert!(check("name", json!("n".repeat(257))).is_err());
    }

    #[test]
    fn test_birth_date_must_be_past() {
        assert!(check("birth_date", json!("09.05.2024")).is_ok());
        assert!(check("birth_date", json!("10.05.2024")).is_err());
        assert!(check("birth_date", json!("11.05.2024")).is_err());
        assert!(check("birth_date", json!("2024-05-01")).is_err());
        assert!(check("birth_date", json!("1.1.2000")).is_err());
        assert!(check("birth_date", json!(20000101)).is_err());
    }

    #[test]
    fn test_gender() {
        assert!(check("gender", json!("male")).is_ok());
        assert!(check("gender", json!("female")).is_ok());
        assert!(check("gender", json!("Male")).is_err());
        assert!(check("gender", json!("")).is_err());
    }

    #[test]
    fn test_error_names_field_and_value() {
        let err = check("town", json!("null")).unwrap_err();
        assert_eq!(err.to_string(), "\"town\" = \"null\" field is not correct.");
    }

    #[test]
    fn test_relative_list_shape() {
        assert_eq!(
            check_relative_list(&json!([3, 1])).unwrap(),
            vec![CitizenId::new(3), CitizenId::new(1)]
        );
        assert!(check_relative_list(&json!([])).unwrap().is_empty());
        assert_eq!(check_relative_list(&json!("1,2")), Err(ValidationError::RelativesNotList));
        assert!(matches!(
            check_relative_list(&json!([1, "2"])),
            Err(ValidationError::InvalidRelatives(RelativesProblem::NotInteger(_)))
        ));
        assert!(matches!(
            check_relative_list(&json!([1, 1])),
            Err(ValidationError::InvalidRelatives(RelativesProblem::Duplicate(_)))
        ));
    }
}
