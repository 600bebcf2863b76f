//! Finished transaction documents
//!
//! A [`Bundle`] is the ordered result of one patient's assembly. It can check
//! its own referential consistency and serialize itself as a FHIR transaction
//! bundle where conditional entries carry an `ifNoneExist` clause.

use crate::domain::resource::{NaturalKey, Resource, ResourceKind};
use crate::domain::{BundleError, ResourceId};
use serde::Serialize;
use std::collections::HashSet;

/// One resource in a bundle, with the natural key it was deduplicated on
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub resource: Resource,
    pub condition: Option<NaturalKey>,
}

impl BundleEntry {
    pub fn id(&self) -> &ResourceId {
        self.resource.id()
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

/// Ordered transaction document for one patient
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    entries: Vec<BundleEntry>,
}

impl Bundle {
    pub(crate) fn from_entries(entries: Vec<BundleEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resources in document order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entries.iter().map(|e| &e.resource)
    }

    /// Resources of one kind, in document order
    pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources().filter(move |r| r.kind() == kind)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources_of(kind).count()
    }

    /// Resource with the given synthetic id
    pub fn find(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources().find(|r| r.id() == id)
    }

    /// Check that every reference resolves to a resource in this bundle
    ///
    /// # Errors
    ///
    /// Returns the first dangling reference found, in document order.
    pub fn verify_references(&self) -> Result<(), BundleError> {
        let present: HashSet<&ResourceId> = self.resources().map(|r| r.id()).collect();

        for resource in self.resources() {
            if let Some(reference) = resource
                .references()
                .into_iter()
                .find(|reference| !present.contains(reference.target()))
            {
                return Err(BundleError::DanglingReference {
                    from: format!("{} {}", resource.kind(), resource.id()),
                    reference: reference.target().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Serialize as a FHIR transaction bundle
    pub fn to_json(&self, pretty: bool) -> Result<String, BundleError> {
        let wire = TransactionWire::from(self);
        let result = if pretty {
            serde_json::to_string_pretty(&wire)
        } else {
            serde_json::to_string(&wire)
        };
        result.map_err(|e| BundleError::Serialization(e.to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionWire<'a> {
    resource_type: &'static str,
    #[serde(rename = "type")]
    type_: &'static str,
    entry: Vec<EntryWire<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryWire<'a> {
    full_url: &'a ResourceId,
    resource: &'a Resource,
    request: RequestWire,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestWire {
    method: &'static str,
    url: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    if_none_exist: Option<String>,
}

impl<'a> From<&'a Bundle> for TransactionWire<'a> {
    fn from(bundle: &'a Bundle) -> Self {
        let entry = bundle
            .entries
            .iter()
            .map(|e| EntryWire {
                full_url: e.id(),
                resource: &e.resource,
                request: RequestWire {
                    method: "POST",
                    url: e.resource.kind().as_str(),
                    if_none_exist: e.condition.as_ref().map(NaturalKey::to_search_expression),
                },
            })
            .collect();

        Self {
            resource_type: "Bundle",
            type_: "transaction",
            entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::{
        DocumentResource, Identifier, Location, Organization, Reference,
    };

    fn organization() -> Organization {
        Organization {
            id: ResourceId::random(),
            identifier: vec![Identifier::new("http://www.imi-mimic.de", "hospital")],
            type_: vec![],
            name: Some("IMI-Mimic Hospital".to_string()),
        }
    }

    fn ward(managed_by: &ResourceId) -> Location {
        Location {
            id: ResourceId::random(),
            identifier: vec![Identifier::new("http://www.imi-mimic.de/wards", "52")],
            status: "active".to_string(),
            name: None,
            physical_type: None,
            managing_organization: Some(Reference::to(managed_by)),
        }
    }

    #[test]
    fn test_verify_references_accepts_resolved_graph() {
        let org = organization();
        let location = ward(&org.id);
        let bundle = Bundle::from_entries(vec![
            BundleEntry {
                condition: org.natural_key(),
                resource: org.into(),
            },
            BundleEntry {
                resource: location.into(),
                condition: None,
            },
        ]);

        assert!(bundle.verify_references().is_ok());
    }

    #[test]
    fn test_verify_references_reports_dangling() {
        let missing = ResourceId::random();
        let location = ward(&missing);
        let bundle = Bundle::from_entries(vec![BundleEntry {
            resource: location.into(),
            condition: None,
        }]);

        let err = bundle.verify_references().unwrap_err();
        assert!(matches!(
            err,
            BundleError::DanglingReference { ref reference, .. } if *reference == missing.to_string()
        ));
    }

    #[test]
    fn test_to_json_renders_transaction_requests() {
        let org = organization();
        let org_id = org.id.clone();
        let bundle = Bundle::from_entries(vec![BundleEntry {
            condition: org.natural_key(),
            resource: org.into(),
        }]);

        let json: serde_json::Value =
            serde_json::from_str(&bundle.to_json(false).unwrap()).unwrap();
        assert_eq!(json["resourceType"], "Bundle");
        assert_eq!(json["type"], "transaction");
        assert_eq!(json["entry"][0]["fullUrl"], org_id.as_str());
        assert_eq!(json["entry"][0]["request"]["method"], "POST");
        assert_eq!(json["entry"][0]["request"]["url"], "Organization");
        assert_eq!(
            json["entry"][0]["request"]["ifNoneExist"],
            "identifier=http://www.imi-mimic.de|hospital"
        );
    }
}
