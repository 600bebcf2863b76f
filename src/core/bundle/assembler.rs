//! In-progress document assembly
//!
//! [`BundleAssembler`] owns the document being built for one patient. Shared
//! entities go through [`BundleAssembler::add_conditional`], which resolves
//! duplicates by typed natural key within the current document only.

use super::document::{Bundle, BundleEntry};
use super::ids::{IdMinter, IdStrategy};
use crate::domain::resource::{DocumentResource, NaturalKey, Resource};
use crate::domain::{MappingError, ResourceId};
use std::collections::HashMap;

/// A resource waiting to be added, with the natural key it is deduplicated on
#[derive(Debug, Clone)]
pub struct ConditionalSlot {
    pub resource: Resource,
    pub key: NaturalKey,
}

impl ConditionalSlot {
    pub fn new(resource: impl Into<Resource>, key: NaturalKey) -> Self {
        Self {
            resource: resource.into(),
            key,
        }
    }

    /// Slot keyed on the resource's own natural key
    ///
    /// # Errors
    ///
    /// Fails when the resource carries no identifier or code to key on.
    pub fn keyed<R>(resource: R) -> Result<Self, MappingError>
    where
        R: DocumentResource + Into<Resource>,
    {
        let key = resource
            .natural_key()
            .ok_or_else(|| MappingError::MissingField {
                record: R::KIND.as_str().to_string(),
                field: "identifier".to_string(),
            })?;
        Ok(Self::new(resource, key))
    }
}

/// Builder for one patient's transaction document
#[derive(Debug, Default)]
pub struct BundleAssembler {
    entries: Vec<BundleEntry>,
    keyed: HashMap<NaturalKey, ResourceId>,
    minter: IdMinter,
    discarded: usize,
}

impl BundleAssembler {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            entries: Vec::new(),
            keyed: HashMap::new(),
            minter: IdMinter::new(strategy),
            discarded: 0,
        }
    }

    /// Append a resource known to be unique within the document
    pub fn add_unconditional(&mut self, resource: impl Into<Resource>) -> ResourceId {
        let resource = resource.into();
        let id = resource.id().clone();
        self.entries.push(BundleEntry {
            resource,
            condition: None,
        });
        id
    }

    /// Append a resource unless one with the same natural key is already present
    ///
    /// Returns the id that referrers must use: the new resource's id when it
    /// was appended, the existing match's id when it was discarded.
    pub fn add_conditional(&mut self, slot: ConditionalSlot) -> ResourceId {
        if let Some(existing) = self.keyed.get(&slot.key) {
            tracing::trace!(key = %slot.key, "Conditional add matched existing resource");
            self.discarded += 1;
            return existing.clone();
        }

        let id = slot.resource.id().clone();
        self.keyed.insert(slot.key.clone(), id.clone());
        self.entries.push(BundleEntry {
            resource: slot.resource,
            condition: Some(slot.key),
        });
        id
    }

    /// Id already assigned to `key` in the current document
    pub fn resolve(&self, key: &NaturalKey) -> Option<&ResourceId> {
        self.keyed.get(key)
    }

    /// Snapshot of the accumulated document; does not clear state
    pub fn finalize(&self) -> Bundle {
        Bundle::from_entries(self.entries.clone())
    }

    /// Return to an empty document with fresh id sequences
    pub fn reset(&mut self) {
        self.entries.clear();
        self.keyed.clear();
        self.minter.reset();
        self.discarded = 0;
    }

    /// Id source for resources created for this document
    pub fn minter_mut(&mut self) -> &mut IdMinter {
        &mut self.minter
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of conditional adds that matched an existing resource
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Whether the assembler holds no document state at all
    pub fn is_pristine(&self) -> bool {
        self.entries.is_empty() && self.keyed.is_empty() && self.discarded == 0
    }
}
