//! Record to resource mapping
//!
//! The [`ResourceMapper`] trait turns one source record into document
//! resources. Implementations are pure: they read the record and the ids of
//! already-created ancestors, mint ids for what they create, and never touch
//! the bundle or the reference caches. Wiring references between resources
//! is the assembly engine's job.

pub mod codes;
pub mod mimic;

pub use mimic::MimicMapper;

use crate::core::bundle::IdMinter;
use crate::domain::resource::{
    Condition, Encounter, Location, Medication, MedicationStatement, Observation, Organization,
    Patient, Practitioner, PractitionerRole, Procedure,
};
use crate::domain::{
    AdmissionRecord, CaregiverRecord, ChartEventRecord, DiagnosisRecord, LabEventRecord,
    MappingError, NoteEventRecord, PatientRecord, PrescriptionRecord, ProcedureRecord,
    ResourceId, WardRecord,
};

/// Result type for mapper calls
pub type MapResult<T> = std::result::Result<T, MappingError>;

/// Ids of the resources a child record hangs off
#[derive(Debug, Clone, Copy)]
pub struct Ancestors<'a> {
    pub patient: &'a ResourceId,
    pub encounter: &'a ResourceId,
}

/// One mapping function per source record kind
pub trait ResourceMapper: Send + Sync {
    /// Facility anchor carrying the given id
    fn facility(&self, id: ResourceId) -> Organization;

    /// Patient resource; demographics come from the first admission
    fn patient(&self, record: &PatientRecord, ids: &mut IdMinter) -> MapResult<Patient>;

    /// Encounter for one admission, without diagnoses or locations
    fn encounter(
        &self,
        admission: &AdmissionRecord,
        patient: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Encounter>;

    fn condition(
        &self,
        diagnosis: &DiagnosisRecord,
        patient: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Condition>;

    fn procedure(
        &self,
        procedure: &ProcedureRecord,
        patient: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Procedure>;

    /// Ward location, without its managing organization
    fn ward(&self, ward: &WardRecord, ids: &mut IdMinter) -> MapResult<Location>;

    /// Medication prescribed by a prescription row
    fn medication(
        &self,
        prescription: &PrescriptionRecord,
        ids: &mut IdMinter,
    ) -> MapResult<Medication>;

    /// Statement for a prescription row, without its medication reference
    fn medication_statement(
        &self,
        prescription: &PrescriptionRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<MedicationStatement>;

    /// Charted observation, without a performer
    fn chart_observation(
        &self,
        event: &ChartEventRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<Observation>;

    fn lab_observation(
        &self,
        event: &LabEventRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<Observation>;

    /// Note observation, without a performer
    fn note_observation(
        &self,
        note: &NoteEventRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<Observation>;

    fn practitioner(
        &self,
        caregiver: &CaregiverRecord,
        ids: &mut IdMinter,
    ) -> MapResult<Practitioner>;

    /// Role of a caregiver at the facility; `None` when the caregiver has no role
    fn practitioner_role(
        &self,
        caregiver: &CaregiverRecord,
        practitioner: &ResourceId,
        facility: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Option<PractitionerRole>>;
}
