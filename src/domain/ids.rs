//! Domain identifier types with validation
//!
//! Source-side identifiers are row keys from the relational schema and are
//! numeric. The synthetic [`ResourceId`] is assigned when a document resource
//! is created and is what references inside a bundle point at.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Patient identifier newtype wrapper
///
/// Opaque source-row identifier used as a work-queue token and as the lookup
/// key into the data source. Never mutated after creation.
///
/// # Examples
///
/// ```
/// use medbundle::domain::ids::PatientId;
/// use std::str::FromStr;
///
/// let id = PatientId::from_str("1234").unwrap();
/// assert_eq!(id.value(), 1234);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PatientId(i64);

impl PatientId {
    /// Creates a new PatientId
    ///
    /// # Returns
    ///
    /// Returns `Ok(PatientId)` if the row id is positive, `Err` otherwise
    pub fn new(id: i64) -> Result<Self, String> {
        if id <= 0 {
            return Err(format!("Patient ID must be positive, got {id}"));
        }
        Ok(Self(id))
    }

    /// Returns the raw row id
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for PatientId {
    type Error = String;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<PatientId> for i64 {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("Invalid patient ID '{s}': {e}"))?;
        Self::new(value)
    }
}

/// Caregiver identifier (`caregivers.cgid`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct CaregiverId(i64);

impl CaregiverId {
    /// Creates a caregiver id; the source uses `0` for "no caregiver"
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Returns the raw caregiver id
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for CaregiverId {
    type Error = String;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id).ok_or_else(|| format!("Caregiver ID must be positive, got {id}"))
    }
}

impl From<CaregiverId> for i64 {
    fn from(id: CaregiverId) -> Self {
        id.0
    }
}

impl fmt::Display for CaregiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ward identifier (`transfers.curr_wardid`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WardId(i64);

impl WardId {
    /// Creates a ward id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw ward id
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for WardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synthetic document resource identifier
///
/// Always rendered as a `urn:uuid:` URI so it can be used both as the
/// bundle entry `fullUrl` and as the target of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    const PREFIX: &'static str = "urn:uuid:";

    /// Wraps a uuid as a `urn:uuid:` resource id
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(format!("{}{}", Self::PREFIX, uuid))
    }

    /// Creates a fresh random resource id
    pub fn random() -> Self {
        Self::from_uuid(uuid::Uuid::new_v4())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid_part = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| format!("Resource ID must start with {}: {s}", Self::PREFIX))?;
        let uuid = uuid::Uuid::parse_str(uuid_part)
            .map_err(|e| format!("Invalid resource ID '{s}': {e}"))?;
        Ok(Self::from_uuid(uuid))
    }
}
