//! Patient-level clinical resources

use super::{first_identifier_key, CodeableConcept, DocumentResource, HumanName, Identifier};
use super::{NaturalKey, Period, Quantity, Reference, ResourceKind};
use crate::domain::ids::ResourceId;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceased_date_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl DocumentResource for Patient {
    const KIND: ResourceKind = ResourceKind::Patient;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        first_identifier_key(Self::KIND, &self.identifier)
    }

    fn references(&self) -> Vec<&Reference> {
        Vec::new()
    }
}

/// Entry of `Encounter.diagnosis`: a condition or procedure with its rank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterDiagnosis {
    pub condition: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

/// Entry of `Encounter.location`: one stay in a ward
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterLocation {
    pub location: Reference,
    pub period: Period,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterHospitalization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admit_source: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discharge_disposition: Option<CodeableConcept>,
}

/// One admission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    pub status: String,
    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub type_: Vec<CodeableConcept>,
    pub subject: Reference,
    pub period: Period,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnosis: Vec<EncounterDiagnosis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<EncounterLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospitalization: Option<EncounterHospitalization>,
}

impl DocumentResource for Encounter {
    const KIND: ResourceKind = ResourceKind::Encounter;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        first_identifier_key(Self::KIND, &self.identifier)
    }

    fn references(&self) -> Vec<&Reference> {
        std::iter::once(&self.subject)
            .chain(self.diagnosis.iter().map(|d| &d.condition))
            .chain(self.location.iter().map(|l| &l.location))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    pub code: CodeableConcept,
    pub subject: Reference,
}

impl DocumentResource for Condition {
    const KIND: ResourceKind = ResourceKind::Condition;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        first_identifier_key(Self::KIND, &self.identifier)
    }

    fn references(&self) -> Vec<&Reference> {
        vec![&self.subject]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub code: CodeableConcept,
    pub subject: Reference,
}

impl DocumentResource for Procedure {
    const KIND: ResourceKind = ResourceKind::Procedure;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        first_identifier_key(Self::KIND, &self.identifier)
    }

    fn references(&self) -> Vec<&Reference> {
        vec![&self.subject]
    }
}

/// Drug, deduplicated within a document by its code
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(skip)]
    pub id: ResourceId,
    pub code: CodeableConcept,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<CodeableConcept>,
}

impl DocumentResource for Medication {
    const KIND: ResourceKind = ResourceKind::Medication;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        let coding = self.code.coding.first()?;
        Some(NaturalKey::code(
            Self::KIND,
            coding.system.clone().unwrap_or_default(),
            coding.code.clone(),
        ))
    }

    fn references(&self) -> Vec<&Reference> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dosage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<CodeableConcept>,
}

/// Administration of a medication during an encounter
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationStatement {
    #[serde(skip)]
    pub id: ResourceId,
    pub status: String,
    /// Resolved after the medication's conditional add
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication_reference: Option<Reference>,
    pub subject: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_period: Option<Period>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dosage: Vec<Dosage>,
}

impl DocumentResource for MedicationStatement {
    const KIND: ResourceKind = ResourceKind::MedicationStatement;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        None
    }

    fn references(&self) -> Vec<&Reference> {
        self.medication_reference
            .iter()
            .chain(std::iter::once(&self.subject))
            .chain(self.context.iter())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub text: String,
}

/// Vital sign, lab result or clinical note
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(skip)]
    pub id: ResourceId,
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,
    pub code: CodeableConcept,
    pub subject: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interpretation: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub performer: Vec<Reference>,
}

impl DocumentResource for Observation {
    const KIND: ResourceKind = ResourceKind::Observation;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        None
    }

    fn references(&self) -> Vec<&Reference> {
        std::iter::once(&self.subject)
            .chain(self.encounter.iter())
            .chain(self.performer.iter())
            .collect()
    }
}
