//! In-memory data source backed by a JSON dataset
//!
//! The dataset file has three top-level arrays, all optional:
//!
//! ```json
//! {
//!   "patients":   [{ "row_id": 1, "subject_id": 249, "admissions": [...] }],
//!   "caregivers": [{ "id": 14, "label": "RN" }],
//!   "wards":      [{ "id": 52, "careunit": "MICU" }]
//! }
//! ```

use crate::adapters::source::ClinicalDataSource;
use crate::domain::errors::SourceError;
use crate::domain::ids::{CaregiverId, PatientId, WardId};
use crate::domain::records::{CaregiverRecord, PatientRecord, WardRecord};
use crate::domain::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct Dataset {
    #[serde(default)]
    patients: Vec<PatientRecord>,

    #[serde(default)]
    caregivers: Vec<CaregiverRecord>,

    #[serde(default)]
    wards: Vec<WardRecord>,
}

/// Read-only data source over records held in memory
#[derive(Debug, Clone)]
pub struct FixtureSource {
    order: Vec<PatientId>,
    patients: HashMap<PatientId, PatientRecord>,
    caregivers: HashMap<CaregiverId, CaregiverRecord>,
    wards: HashMap<WardId, WardRecord>,
}

impl FixtureSource {
    /// Build a source from records; patient order is preserved
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidDataset`] if two patients share a row id,
    /// or two caregivers or wards share an id.
    pub fn from_records(
        patients: Vec<PatientRecord>,
        caregivers: Vec<CaregiverRecord>,
        wards: Vec<WardRecord>,
    ) -> Result<Self> {
        let mut order = Vec::with_capacity(patients.len());
        let mut by_id = HashMap::with_capacity(patients.len());

        for patient in patients {
            let id = patient.row_id;
            if by_id.insert(id, patient).is_some() {
                return Err(
                    SourceError::InvalidDataset(format!("duplicate patient row_id {id}")).into(),
                );
            }
            order.push(id);
        }

        Ok(Self {
            order,
            patients: by_id,
            caregivers: index_unique(caregivers, |c| c.id, "caregiver")?,
            wards: index_unique(wards, |w| w.id, "ward")?,
        })
    }

    /// Parse a dataset from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)
            .map_err(|e| SourceError::InvalidDataset(format!("failed to parse dataset: {e}")))?;
        Self::from_records(dataset.patients, dataset.caregivers, dataset.wards)
    }

    /// Read a dataset file
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            SourceError::InvalidDataset(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    pub fn patient_count(&self) -> usize {
        self.order.len()
    }
}

fn index_unique<K, V>(
    records: Vec<V>,
    key: impl Fn(&V) -> K,
    what: &str,
) -> Result<HashMap<K, V>>
where
    K: Eq + Hash + Display,
{
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        let id = key(&record);
        if index.contains_key(&id) {
            return Err(SourceError::InvalidDataset(format!("duplicate {what} id {id}")).into());
        }
        index.insert(id, record);
    }
    Ok(index)
}

#[async_trait]
impl ClinicalDataSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn list_patient_ids(&self) -> Result<Vec<PatientId>> {
        Ok(self.order.clone())
    }

    async fn load_patient(&self, id: PatientId) -> Result<Option<PatientRecord>> {
        Ok(self.patients.get(&id).cloned())
    }

    async fn preload_caregivers(&self) -> Result<HashMap<CaregiverId, CaregiverRecord>> {
        Ok(self.caregivers.clone())
    }

    async fn preload_wards(&self) -> Result<HashMap<WardId, WardRecord>> {
        Ok(self.wards.clone())
    }
}
