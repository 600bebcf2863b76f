//! Per-document reference caches
//!
//! A [`ReferenceCache`] remembers which synthetic id a natural key was given
//! in the document currently being assembled. [`ReferenceCaches`] groups the
//! three caches one assembly needs. Entries are scoped to a single patient
//! document and must be cleared before the next one starts: a stale entry
//! would point a reference at a resource that only existed in the previous
//! document.

use crate::domain::ResourceId;
use std::collections::HashMap;

/// Natural key to synthetic id memo for one document
#[derive(Debug, Default)]
pub struct ReferenceCache {
    name: &'static str,
    entries: HashMap<String, ResourceId>,
}

impl ReferenceCache {
    /// Create an empty cache; `name` only appears in logs
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    /// Synthetic id already assigned to `natural_key` in this document
    pub fn lookup(&self, natural_key: &str) -> Option<&ResourceId> {
        self.entries.get(natural_key)
    }

    /// Remember the synthetic id assigned to `natural_key`
    pub fn record(&mut self, natural_key: impl Into<String>, id: ResourceId) {
        self.entries.insert(natural_key.into(), id);
    }

    /// Drop every entry
    pub fn reset(&mut self) {
        if !self.entries.is_empty() {
            tracing::trace!(
                cache = self.name,
                entries = self.entries.len(),
                "Clearing reference cache"
            );
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The caregiver, ward and medication caches of one assembly
#[derive(Debug)]
pub struct ReferenceCaches {
    pub caregivers: ReferenceCache,
    pub wards: ReferenceCache,
    pub medications: ReferenceCache,
}

impl ReferenceCaches {
    pub fn new() -> Self {
        Self {
            caregivers: ReferenceCache::new("caregivers"),
            wards: ReferenceCache::new("wards"),
            medications: ReferenceCache::new("medications"),
        }
    }

    /// Clear all three caches unconditionally
    pub fn reset_all(&mut self) {
        self.caregivers.reset();
        self.wards.reset();
        self.medications.reset();
    }

    /// Whether all three caches are empty
    pub fn is_pristine(&self) -> bool {
        self.caregivers.is_empty() && self.wards.is_empty() && self.medications.is_empty()
    }
}

impl Default for ReferenceCaches {
    fn default() -> Self {
        Self::new()
    }
}
