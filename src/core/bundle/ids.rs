//! Synthetic id minting
//!
//! Every resource gets its id at creation time from the [`IdMinter`] owned by
//! the bundle being assembled. The sequential strategy encodes the resource
//! kind and a per-kind counter in the uuid, which makes ids stable between
//! runs and easy to tell apart when reading a document. Counters restart when
//! the bundle is reset.

use crate::domain::resource::ResourceKind;
use crate::domain::{MedBundleError, ResourceId, Result};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// How synthetic ids are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Random version 4 uuids
    #[default]
    Uuid,
    /// Deterministic per-kind sequence numbers
    Sequential,
}

impl FromStr for IdStrategy {
    type Err = MedBundleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "uuid" | "random" => Ok(Self::Uuid),
            "sequential" | "seq" => Ok(Self::Sequential),
            _ => Err(MedBundleError::Configuration(format!(
                "Invalid id strategy: {s}. Expected 'uuid' or 'sequential'"
            ))),
        }
    }
}

/// Issues synthetic ids for one bundle
#[derive(Debug, Default)]
pub struct IdMinter {
    strategy: IdStrategy,
    sequences: HashMap<ResourceKind, u64>,
}

impl IdMinter {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            sequences: HashMap::new(),
        }
    }

    /// Mint a new id for a resource of `kind`
    pub fn mint(&mut self, kind: ResourceKind) -> ResourceId {
        let sequence = self.sequences.entry(kind).or_insert(0);
        *sequence += 1;

        match self.strategy {
            IdStrategy::Uuid => ResourceId::random(),
            IdStrategy::Sequential => {
                ResourceId::from_uuid(Uuid::from_u64_pair(kind.ordinal(), *sequence))
            }
        }
    }

    /// Number of ids minted for `kind` since the last reset
    pub fn issued(&self, kind: ResourceKind) -> u64 {
        self.sequences.get(&kind).copied().unwrap_or(0)
    }

    /// Restart all sequences
    pub fn reset(&mut self) {
        self.sequences.clear();
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_strategy_from_str() {
        assert_eq!(IdStrategy::from_str("uuid").unwrap(), IdStrategy::Uuid);
        assert_eq!(IdStrategy::from_str("Sequential").unwrap(), IdStrategy::Sequential);
        assert!(IdStrategy::from_str("counter").is_err());
    }

    #[test]
    fn test_sequential_ids_are_deterministic_per_kind() {
        let mut minter = IdMinter::new(IdStrategy::Sequential);
        let first_patient = minter.mint(ResourceKind::Patient);
        let first_location = minter.mint(ResourceKind::Location);
        let second_patient = minter.mint(ResourceKind::Patient);

        assert_ne!(first_patient, second_patient);
        assert_ne!(first_patient, first_location);
        assert_eq!(minter.issued(ResourceKind::Patient), 2);

        minter.reset();
        assert_eq!(minter.issued(ResourceKind::Patient), 0);
        assert_eq!(minter.mint(ResourceKind::Patient), first_patient);
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let mut minter = IdMinter::new(IdStrategy::Uuid);
        let a = minter.mint(ResourceKind::Observation);
        let b = minter.mint(ResourceKind::Observation);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequential_ids_cannot_collide_with_random_ones() {
        let mut minter = IdMinter::new(IdStrategy::Sequential);
        let id = minter.mint(ResourceKind::Organization);
        let uuid = Uuid::parse_str(id.as_str().trim_start_matches("urn:uuid:")).unwrap();
        assert_ne!(uuid.get_version_num(), 4);
    }
}
