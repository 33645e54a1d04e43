//! Citizen types for the registry.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifier of one committed import batch.
///
/// Assigned by the store at commit time, starting at `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportId(i64);

impl ImportId {
    /// Create an ImportId from its raw value.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ImportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a citizen, unique within its import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitizenId(i64);

impl CitizenId {
    /// Create a CitizenId from its raw value.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gender of a citizen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// `"male"`
    Male,
    /// `"female"`
    Female,
}

impl Gender {
    /// Parse gender from its exact wire form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    /// Wire form of the gender.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Birth date serialized as `dd.mm.yyyy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BirthDate(NaiveDate);

/// Wire format of birth dates.
pub const BIRTH_DATE_FORMAT: &str = "%d.%m.%Y";

impl BirthDate {
    /// Wrap an already parsed date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `dd.mm.yyyy` string.
    ///
    /// Day and month must be zero-padded and the year must have exactly
    /// four digits; chrono alone accepts looser input.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[2] != b'.' || bytes[5] != b'.' {
            return None;
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
        if !digits_ok {
            return None;
        }
        NaiveDate::parse_from_str(s, BIRTH_DATE_FORMAT).ok().map(Self)
    }

    /// The underlying calendar date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Birth month, 1..=12.
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Age in completed years on `today`.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let born = self.0;
        let mut age = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            age -= 1;
        }
        age
    }
}

impl fmt::Display for BirthDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BIRTH_DATE_FORMAT))
    }
}

impl Serialize for BirthDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BirthDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid birth date: {}", raw)))
    }
}

/// Full view of a citizen.
///
/// `relatives` is sorted, deduplicated and bidirectional: it lists every
/// citizen sharing an edge with this one, whichever side recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    /// Citizen identifier.
    pub citizen_id: CitizenId,
    /// Town name.
    pub town: String,
    /// Street name.
    pub street: String,
    /// Building designation.
    pub building: String,
    /// Apartment number.
    pub apartment: i64,
    /// Full name.
    pub name: String,
    /// Birth date.
    pub birth_date: BirthDate,
    /// Gender.
    pub gender: Gender,
    /// Related citizens in the same import.
    pub relatives: Vec<CitizenId>,
}

impl Citizen {
    /// Apply the scalar fields of a patch. Relatives are left to the store,
    /// which owns edge rewriting.
    pub fn apply_scalars(&mut self, patch: &CitizenPatch) {
        if let Some(town) = &patch.town {
            self.town = town.clone();
        }
        if let Some(street) = &patch.street {
            self.street = street.clone();
        }
        if let Some(building) = &patch.building {
            self.building = building.clone();
        }
        if let Some(apartment) = patch.apartment {
            self.apartment = apartment;
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(birth_date) = patch.birth_date {
            self.birth_date = birth_date;
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
    }
}

/// Partial update of one citizen.
///
/// `citizen_id` is immutable and therefore has no slot here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitizenPatch {
    /// New town.
    pub town: Option<String>,
    /// New street.
    pub street: Option<String>,
    /// New building.
    pub building: Option<String>,
    /// New apartment.
    pub apartment: Option<i64>,
    /// New name.
    pub name: Option<String>,
    /// New birth date.
    pub birth_date: Option<BirthDate>,
    /// New gender.
    pub gender: Option<Gender>,
    /// Replacement relative list.
    pub relatives: Option<Vec<CitizenId>>,
}

impl CitizenPatch {
    /// True if any scalar (non-relative) field is set.
    pub fn has_scalars(&self) -> bool {
        self.town.is_some()
            || self.street.is_some()
            || self.building.is_some()
            || self.apartment.is_some()
            || self.name.is_some()
            || self.birth_date.is_some()
            || self.gender.is_some()
    }
}
