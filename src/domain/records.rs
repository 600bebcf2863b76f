//! Source record model
//!
//! In-memory representation of one patient's relational record graph: a
//! patient owns admissions, each admission owns its diagnoses, procedures,
//! prescriptions, observations and ward transfers. A [`PatientRecord`] is
//! read completely from the data source before any document resource is
//! created for it, and is never mutated afterwards.

use super::ids::{CaregiverId, PatientId, WardId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// One row of `patients` together with everything it owns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Source row id, the work-queue token
    pub row_id: PatientId,

    /// Business identifier of the patient
    pub subject_id: i64,

    /// Raw gender code (`M`, `F`, ...)
    #[serde(default)]
    pub gender: String,

    /// Date of birth
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,

    /// Date of death, if recorded
    #[serde(default)]
    pub death_date: Option<NaiveDateTime>,

    /// Admissions in source order
    #[serde(default)]
    pub admissions: Vec<AdmissionRecord>,
}

/// One hospital admission (`admissions` row) and its child records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionRecord {
    /// Business identifier of the admission
    pub hadm_id: i64,

    pub admit_time: NaiveDateTime,

    #[serde(default)]
    pub discharge_time: Option<NaiveDateTime>,

    #[serde(default)]
    pub admission_type: String,

    #[serde(default)]
    pub admission_location: Option<String>,

    #[serde(default)]
    pub discharge_location: Option<String>,

    #[serde(default)]
    pub marital_status: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub diagnoses: Vec<DiagnosisRecord>,

    #[serde(default)]
    pub procedures: Vec<ProcedureRecord>,

    #[serde(default)]
    pub prescriptions: Vec<PrescriptionRecord>,

    /// Charted vitals and other bedside observations
    #[serde(default)]
    pub chart_events: Vec<ChartEventRecord>,

    #[serde(default)]
    pub lab_events: Vec<LabEventRecord>,

    /// Free-text clinical notes
    #[serde(default)]
    pub note_events: Vec<NoteEventRecord>,

    /// Ward transfers in chronological order
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
}

/// ICD-9 diagnosis attached to an admission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    /// Priority sequence number, used as the encounter diagnosis rank
    #[serde(default)]
    pub seq_num: Option<u32>,

    pub icd9_code: String,

    #[serde(default)]
    pub short_title: Option<String>,

    #[serde(default)]
    pub long_title: Option<String>,
}

/// ICD-9 procedure attached to an admission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcedureRecord {
    #[serde(default)]
    pub seq_num: Option<u32>,

    pub icd9_code: String,

    #[serde(default)]
    pub short_title: Option<String>,

    #[serde(default)]
    pub long_title: Option<String>,
}

/// One prescription row: describes both the drug and its administration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,

    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,

    pub drug: String,

    #[serde(default)]
    pub drug_name_generic: Option<String>,

    #[serde(default)]
    pub formulary_drug_cd: Option<String>,

    #[serde(default)]
    pub ndc: Option<String>,

    #[serde(default)]
    pub prod_strength: Option<String>,

    #[serde(default)]
    pub dose_value: Option<String>,

    #[serde(default)]
    pub dose_unit: Option<String>,

    #[serde(default)]
    pub route: Option<String>,
}

impl PrescriptionRecord {
    /// Natural key of the prescribed medication
    ///
    /// Formulary code when present, then NDC, then the drug name.
    pub fn medication_code(&self) -> &str {
        [self.formulary_drug_cd.as_deref(), self.ndc.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|code| !code.is_empty() && *code != "0")
            .unwrap_or(self.drug.trim())
    }
}

/// Charted bedside observation (`chartevents`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartEventRecord {
    pub item_id: i64,

    /// Item label from the item dictionary
    #[serde(default)]
    pub label: String,

    pub chart_time: NaiveDateTime,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub value_num: Option<f64>,

    #[serde(default)]
    pub value_unit: Option<String>,

    #[serde(default, deserialize_with = "caregiver_or_none")]
    pub caregiver_id: Option<CaregiverId>,

    /// Marked as entered in error at the source
    #[serde(default)]
    pub error: bool,
}

/// Laboratory result (`labevents`); caregivers are not recorded for these
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabEventRecord {
    pub item_id: i64,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub fluid: Option<String>,

    #[serde(default)]
    pub loinc_code: Option<String>,

    pub chart_time: NaiveDateTime,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub value_num: Option<f64>,

    #[serde(default)]
    pub value_unit: Option<String>,

    /// `abnormal` when the result is outside the reference range
    #[serde(default)]
    pub flag: Option<String>,
}

/// Free-text clinical note (`noteevents`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteEventRecord {
    pub chart_date: NaiveDateTime,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "caregiver_or_none")]
    pub caregiver_id: Option<CaregiverId>,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub has_error: bool,
}

/// Movement of the patient into a ward (`transfers`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferRecord {
    #[serde(default)]
    pub event_type: Option<String>,

    #[serde(default)]
    pub careunit: Option<String>,

    /// Target ward; discharge rows carry none
    #[serde(default)]
    pub ward_id: Option<WardId>,

    #[serde(default)]
    pub in_time: Option<NaiveDateTime>,

    #[serde(default)]
    pub out_time: Option<NaiveDateTime>,
}

/// Preloaded caregiver (`caregivers`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverRecord {
    pub id: CaregiverId,

    /// Role label such as `RN` or `MD`
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Preloaded ward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardRecord {
    pub id: WardId,

    /// Care unit the ward belongs to, e.g. `MICU`
    #[serde(default)]
    pub careunit: Option<String>,
}

fn caregiver_or_none<'de, D>(deserializer: D) -> Result<Option<CaregiverId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(CaregiverId::new))
}
