//! Document resource model
//!
//! Typed subset of the FHIR R4 resources a patient document is made of. Every
//! resource carries the synthetic [`ResourceId`] it was created with; the id is
//! not serialized into the resource body because the bundle entry's `fullUrl`
//! carries it.
//!
//! Duplicate detection works on a typed [`NaturalKey`] (resource kind plus a
//! system/value pair) instead of query strings. The query form is only
//! rendered when the bundle is serialized.

mod administrative;
mod clinical;

pub use administrative::{Location, Organization, Practitioner, PractitionerRole};
pub use clinical::{
    Annotation, Condition, Dosage, Encounter, EncounterDiagnosis, EncounterHospitalization,
    EncounterLocation, Medication, MedicationStatement, Observation, Patient, Procedure,
};

use super::ids::ResourceId;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Kind of a document resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResourceKind {
    Patient,
    Organization,
    Encounter,
    Condition,
    Procedure,
    Location,
    Medication,
    MedicationStatement,
    Observation,
    Practitioner,
    PractitionerRole,
}

impl ResourceKind {
    /// All kinds, in declaration order
    pub const ALL: [ResourceKind; 11] = [
        ResourceKind::Patient,
        ResourceKind::Organization,
        ResourceKind::Encounter,
        ResourceKind::Condition,
        ResourceKind::Procedure,
        ResourceKind::Location,
        ResourceKind::Medication,
        ResourceKind::MedicationStatement,
        ResourceKind::Observation,
        ResourceKind::Practitioner,
        ResourceKind::PractitionerRole,
    ];

    /// FHIR resource type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Organization => "Organization",
            ResourceKind::Encounter => "Encounter",
            ResourceKind::Condition => "Condition",
            ResourceKind::Procedure => "Procedure",
            ResourceKind::Location => "Location",
            ResourceKind::Medication => "Medication",
            ResourceKind::MedicationStatement => "MedicationStatement",
            ResourceKind::Observation => "Observation",
            ResourceKind::Practitioner => "Practitioner",
            ResourceKind::PractitionerRole => "PractitionerRole",
        }
    }

    /// Stable 1-based ordinal, used to build sequential ids
    pub fn ordinal(&self) -> u64 {
        ResourceKind::ALL
            .iter()
            .position(|k| k == self)
            .map(|p| p as u64 + 1)
            .unwrap_or(0)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business identifier (system + value)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            value: value.into(),
        }
    }
}

/// Reference to another resource in the same bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub reference: ResourceId,
}

impl Reference {
    /// Creates a reference pointing at `id`
    pub fn to(id: &ResourceId) -> Self {
        Self {
            reference: id.clone(),
        }
    }

    /// The referenced resource id
    pub fn target(&self) -> &ResourceId {
        &self.reference
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: &str, code: impl Into<String>, display: Option<&str>) -> Self {
        Self {
            system: Some(system.to_string()),
            code: code.into(),
            display: display.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Concept with a single coding
    pub fn coded(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    /// Concept carried as plain text only
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            coding: Vec::new(),
            text: Some(text.into()),
        }
    }

    /// Code of the first coding, if any
    pub fn first_code(&self) -> Option<&str> {
        self.coding.first().map(|c| c.code.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,
}

impl Period {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HumanName {
    #[serde(rename = "use")]
    pub use_: String,
    pub family: String,
}

/// Field a [`NaturalKey`] is matched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchField {
    Identifier,
    Code,
}

/// Typed natural key of a resource
///
/// Two resources of the same kind with equal keys represent the same
/// real-world entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub kind: ResourceKind,
    pub field: MatchField,
    pub system: String,
    pub value: String,
}

impl NaturalKey {
    /// Key on the resource's business identifier
    pub fn identifier(kind: ResourceKind, identifier: &Identifier) -> Self {
        Self {
            kind,
            field: MatchField::Identifier,
            system: identifier.system.clone(),
            value: identifier.value.clone(),
        }
    }

    /// Key on a coded value
    pub fn code(kind: ResourceKind, system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            kind,
            field: MatchField::Code,
            system: system.into(),
            value: code.into(),
        }
    }

    /// Conditional-create search expression: `identifier=sys|value` or `code=value`
    pub fn to_search_expression(&self) -> String {
        match self.field {
            MatchField::Identifier => format!("identifier={}|{}", self.system, self.value),
            MatchField::Code => format!("code={}", self.value),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?{}", self.kind, self.to_search_expression())
    }
}

/// Behaviour shared by every document resource
pub trait DocumentResource {
    /// Kind of this resource
    const KIND: ResourceKind;

    /// Synthetic id assigned at creation
    fn id(&self) -> &ResourceId;

    /// Natural key used for conditional adds, if the resource has one
    fn natural_key(&self) -> Option<NaturalKey>;

    /// All outgoing references
    fn references(&self) -> Vec<&Reference>;
}

/// Natural key built from the first business identifier
fn first_identifier_key(kind: ResourceKind, identifiers: &[Identifier]) -> Option<NaturalKey> {
    identifiers
        .first()
        .map(|identifier| NaturalKey::identifier(kind, identifier))
}

macro_rules! document_resources {
    ($($kind:ident),+ $(,)?) => {
        /// Any document resource
        #[derive(Debug, Clone, Serialize)]
        #[serde(tag = "resourceType")]
        pub enum Resource {
            $($kind($kind),)+
        }

        impl Resource {
            pub fn id(&self) -> &ResourceId {
                match self {
                    $(Resource::$kind(r) => r.id(),)+
                }
            }

            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(Resource::$kind(_) => ResourceKind::$kind,)+
                }
            }

            pub fn natural_key(&self) -> Option<NaturalKey> {
                match self {
                    $(Resource::$kind(r) => r.natural_key(),)+
                }
            }

            pub fn references(&self) -> Vec<&Reference> {
                match self {
                    $(Resource::$kind(r) => r.references(),)+
                }
            }
        }

        $(
            impl From<$kind> for Resource {
                fn from(resource: $kind) -> Self {
                    Resource::$kind(resource)
                }
            }
        )+
    };
}

document_resources!(
    Patient,
    Organization,
    Encounter,
    Condition,
    Procedure,
    Location,
    Medication,
    MedicationStatement,
    Observation,
    Practitioner,
    PractitionerRole,
);
