//! Facility, ward and caregiver resources

use super::{first_identifier_key, CodeableConcept, DocumentResource, Identifier, NaturalKey};
use super::{Reference, ResourceKind};
use crate::domain::ids::ResourceId;
use serde::Serialize;

/// Healthcare organization; the facility anchor of every document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub type_: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DocumentResource for Organization {
    const KIND: ResourceKind = ResourceKind::Organization;

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

/// Ward
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_type: Option<CodeableConcept>,
    /// Set only when the ward is first added to a document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managing_organization: Option<Reference>,
}

impl DocumentResource for Location {
    const KIND: ResourceKind = ResourceKind::Location;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        first_identifier_key(Self::KIND, &self.identifier)
    }

    fn references(&self) -> Vec<&Reference> {
        self.managing_organization.iter().collect()
    }
}

/// Caregiver
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
}

impl DocumentResource for Practitioner {
    const KIND: ResourceKind = ResourceKind::Practitioner;

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

/// Role a caregiver holds at the facility
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PractitionerRole {
    #[serde(skip)]
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practitioner: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<CodeableConcept>,
}

impl DocumentResource for PractitionerRole {
    const KIND: ResourceKind = ResourceKind::PractitionerRole;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn natural_key(&self) -> Option<NaturalKey> {
        first_identifier_key(Self::KIND, &self.identifier)
    }

    fn references(&self) -> Vec<&Reference> {
        self.practitioner
            .iter()
            .chain(self.organization.iter())
            .collect()
    }
}
