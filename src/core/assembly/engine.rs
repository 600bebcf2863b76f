//! Patient assembly engine
//!
//! [`PatientAssemblyEngine`] turns one patient record into one transaction
//! document. An engine is owned by a single worker and reused for every
//! patient that worker takes from the queue. Its bundle and reference caches
//! live in an [`AssemblyContext`] which is cleared by a scope guard on every
//! exit path, so nothing from one patient can leak into the next.

use super::state::{AssemblyState, StateTracker};
use crate::adapters::source::ClinicalDataSource;
use crate::core::bundle::{Bundle, BundleAssembler, ConditionalSlot, IdStrategy};
use crate::core::cache::ReferenceCaches;
use crate::core::mapping::{Ancestors, MimicMapper, ResourceMapper};
use crate::domain::errors::MappingError;
use crate::domain::resource::{EncounterDiagnosis, EncounterLocation, Organization, Period, Reference};
use crate::domain::{
    AdmissionRecord, CaregiverId, CaregiverRecord, PatientId, PatientRecord, ResourceId, Result,
    WardId, WardRecord,
};
use crate::{log_assembly_complete, log_assembly_start};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Read-only data shared by every engine of a run
///
/// Caregivers and wards are preloaded once. The facility anchor is created
/// once per process and carries the same id in every document.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    caregivers: HashMap<CaregiverId, CaregiverRecord>,
    wards: HashMap<WardId, WardRecord>,
    facility: Organization,
}

impl ReferenceData {
    pub fn new(
        caregivers: HashMap<CaregiverId, CaregiverRecord>,
        wards: HashMap<WardId, WardRecord>,
        facility: Organization,
    ) -> Self {
        Self {
            caregivers,
            wards,
            facility,
        }
    }

    /// Preload caregivers and wards from the source and create the facility anchor
    pub async fn load<M: ResourceMapper>(
        source: &dyn ClinicalDataSource,
        mapper: &M,
    ) -> Result<Self> {
        let caregivers = source.preload_caregivers().await?;
        let wards = source.preload_wards().await?;
        let facility = mapper.facility(ResourceId::random());

        tracing::info!(
            caregivers = caregivers.len(),
            wards = wards.len(),
            facility = %facility.id,
            "Reference data preloaded"
        );
        Ok(Self::new(caregivers, wards, facility))
    }

    pub fn caregiver(&self, id: CaregiverId) -> Option<&CaregiverRecord> {
        self.caregivers.get(&id)
    }

    pub fn ward(&self, id: WardId) -> Option<&WardRecord> {
        self.wards.get(&id)
    }

    pub fn facility(&self) -> &Organization {
        &self.facility
    }
}

/// Mutable state of one document: the bundle and its three reference caches
#[derive(Debug, Default)]
pub struct AssemblyContext {
    pub bundle: BundleAssembler,
    pub caches: ReferenceCaches,
}

impl AssemblyContext {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            bundle: BundleAssembler::new(strategy),
            caches: ReferenceCaches::new(),
        }
    }

    pub fn reset(&mut self) {
        self.bundle.reset();
        self.caches.reset_all();
    }

    pub fn is_pristine(&self) -> bool {
        self.bundle.is_pristine() && self.caches.is_pristine()
    }
}

/// Guard over one assembly; dropping it clears the context
struct AssemblyScope<'a> {
    context: &'a mut AssemblyContext,
    tracker: &'a mut StateTracker,
}

impl<'a> AssemblyScope<'a> {
    fn open(context: &'a mut AssemblyContext, tracker: &'a mut StateTracker) -> Self {
        tracker.begin();
        Self { context, tracker }
    }
}

impl Drop for AssemblyScope<'_> {
    fn drop(&mut self) {
        self.context.reset();
        self.tracker.reset();
    }
}

/// A finished patient document
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub patient_id: PatientId,
    pub bundle: Bundle,
    /// Serialized FHIR transaction bundle
    pub json: String,
}

impl AssembledDocument {
    /// Number of resources in the document
    pub fn resources(&self) -> usize {
        self.bundle.len()
    }
}

/// Builds one transaction document per patient
///
/// # Example
///
/// ```rust,no_run
/// use medbundle::adapters::{ClinicalDataSource, FixtureSource};
/// use medbundle::core::assembly::{PatientAssemblyEngine, ReferenceData};
/// use medbundle::core::bundle::IdStrategy;
/// use medbundle::core::mapping::MimicMapper;
/// use std::sync::Arc;
///
/// # async fn example() -> medbundle::domain::Result<()> {
/// let source = FixtureSource::from_path("tests/fixtures/mimic_sample.json").await?;
/// let mapper = MimicMapper::new();
/// let reference = Arc::new(ReferenceData::load(&source, &mapper).await?);
///
/// let mut engine = PatientAssemblyEngine::new(mapper, reference, IdStrategy::Uuid);
/// for id in source.list_patient_ids().await? {
///     if let Some(document) = engine.assemble(id, &source).await? {
///         println!("{id}: {} resources", document.resources());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct PatientAssemblyEngine<M: ResourceMapper = MimicMapper> {
    mapper: M,
    reference: Arc<ReferenceData>,
    context: AssemblyContext,
    tracker: StateTracker,
    pretty: bool,
}

impl<M: ResourceMapper> PatientAssemblyEngine<M> {
    pub fn new(mapper: M, reference: Arc<ReferenceData>, strategy: IdStrategy) -> Self {
        Self {
            mapper,
            reference,
            context: AssemblyContext::new(strategy),
            tracker: StateTracker::new(),
            pretty: true,
        }
    }

    /// Indent the serialized document (on by default)
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Load a patient from `source` and assemble its document
    ///
    /// Returns `Ok(None)` when the source has no such patient. The context is
    /// cleared before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the source's error if loading fails, a mapping error if a
    /// record cannot be mapped, or a bundle error if the finished document has
    /// a dangling reference.
    pub async fn assemble(
        &mut self,
        id: PatientId,
        source: &dyn ClinicalDataSource,
    ) -> Result<Option<AssembledDocument>> {
        log_assembly_start!(id);

        match source.load_patient(id).await {
            Ok(record) => self.assemble_record(id, record.as_ref()),
            Err(e) => {
                let _scope = AssemblyScope::open(&mut self.context, &mut self.tracker);
                tracing::error!(patient_id = %id, error = %e, "Failed to load patient");
                Err(e)
            }
        }
    }

    /// Assemble a document from an already loaded record
    ///
    /// `None` stands for a patient the source did not have.
    pub fn assemble_record(
        &mut self,
        id: PatientId,
        record: Option<&PatientRecord>,
    ) -> Result<Option<AssembledDocument>> {
        let started = Instant::now();
        let mut scope = AssemblyScope::open(&mut self.context, &mut self.tracker);
        scope.tracker.advance(AssemblyState::Loaded)?;

        let Some(record) = record else {
            tracing::info!(patient_id = %id, "Patient not found in source");
            return Ok(None);
        };

        match build_document(&self.mapper, &self.reference, &mut scope, id, record, self.pretty) {
            Ok(document) => {
                log_assembly_complete!(id, document.resources(), started.elapsed());
                Ok(Some(document))
            }
            Err(e) => {
                tracing::error!(
                    patient_id = %id,
                    state = %scope.tracker.current(),
                    error = %e,
                    "Patient assembly failed"
                );
                Err(e)
            }
        }
    }

    /// Whether the bundle and all caches are empty
    pub fn is_pristine(&self) -> bool {
        self.context.is_pristine()
    }

    /// States visited by the most recent assembly
    pub fn last_transitions(&self) -> &[AssemblyState] {
        self.tracker.history()
    }

    pub fn reference(&self) -> &Arc<ReferenceData> {
        &self.reference
    }
}

fn build_document<M: ResourceMapper>(
    mapper: &M,
    reference: &ReferenceData,
    scope: &mut AssemblyScope<'_>,
    id: PatientId,
    record: &PatientRecord,
    pretty: bool,
) -> Result<AssembledDocument> {
    let tracker = &mut *scope.tracker;
    let context = &mut *scope.context;

    let mut builder = DocumentBuilder::new(mapper, reference, context);
    let patient = builder.anchors(record)?;

    for admission in &record.admissions {
        let encounter = builder.basic_graph(admission, &patient)?;
        tracker.advance(AssemblyState::BasicGraphBuilt)?;

        let ancestors = Ancestors {
            patient: &patient,
            encounter: &encounter,
        };
        builder.medications(admission, ancestors)?;
        tracker.advance(AssemblyState::MedicationAttached)?;

        builder.observations(admission, ancestors)?;
        tracker.advance(AssemblyState::ObservationsAttached)?;
    }

    let bundle = builder.bundle.finalize();
    bundle.verify_references()?;
    let json = bundle.to_json(pretty)?;
    tracker.advance(AssemblyState::Finalized)?;

    Ok(AssembledDocument {
        patient_id: id,
        bundle,
        json,
    })
}

/// Wires mapper output into the bundle, resolving shared entities through the caches
struct DocumentBuilder<'a, M> {
    mapper: &'a M,
    reference: &'a ReferenceData,
    bundle: &'a mut BundleAssembler,
    caches: &'a mut ReferenceCaches,
    facility: ResourceId,
}

impl<'a, M: ResourceMapper> DocumentBuilder<'a, M> {
    fn new(mapper: &'a M, reference: &'a ReferenceData, context: &'a mut AssemblyContext) -> Self {
        Self {
            mapper,
            reference,
            facility: reference.facility.id.clone(),
            bundle: &mut context.bundle,
            caches: &mut context.caches,
        }
    }

    /// Add the facility anchor and the patient; returns the patient's id
    fn anchors(&mut self, record: &PatientRecord) -> Result<ResourceId> {
        self.facility = self
            .bundle
            .add_conditional(ConditionalSlot::keyed(self.reference.facility.clone())?);

        let patient = self.mapper.patient(record, self.bundle.minter_mut())?;
        Ok(self.bundle.add_conditional(ConditionalSlot::keyed(patient)?))
    }

    /// Encounter with its diagnoses, procedures and ward chain; the encounter goes in last
    fn basic_graph(&mut self, admission: &AdmissionRecord, patient: &ResourceId) -> Result<ResourceId> {
        let mut encounter = self
            .mapper
            .encounter(admission, patient, self.bundle.minter_mut())?;

        for diagnosis in &admission.diagnoses {
            let condition = self
                .mapper
                .condition(diagnosis, patient, self.bundle.minter_mut())?;
            let id = self.bundle.add_conditional(ConditionalSlot::keyed(condition)?);
            encounter.diagnosis.push(EncounterDiagnosis {
                condition: Reference::to(&id),
                rank: diagnosis.seq_num,
            });
        }

        for procedure in &admission.procedures {
            let resource = self
                .mapper
                .procedure(procedure, patient, self.bundle.minter_mut())?;
            let id = self.bundle.add_conditional(ConditionalSlot::keyed(resource)?);
            encounter.diagnosis.push(EncounterDiagnosis {
                condition: Reference::to(&id),
                rank: procedure.seq_num,
            });
        }

        for transfer in &admission.transfers {
            let Some(ward_id) = transfer.ward_id else {
                continue;
            };
            let location = self.resolve_ward(ward_id)?;
            encounter.location.push(EncounterLocation {
                location: Reference::to(&location),
                period: Period::new(transfer.in_time, transfer.out_time),
            });
        }

        Ok(self.bundle.add_unconditional(encounter))
    }

    /// Medications first, then the statements that reference them
    fn medications(&mut self, admission: &AdmissionRecord, ancestors: Ancestors<'_>) -> Result<()> {
        for prescription in &admission.prescriptions {
            let code = prescription.medication_code();
            if self.caches.medications.lookup(code).is_some() {
                continue;
            }

            let medication = self
                .mapper
                .medication(prescription, self.bundle.minter_mut())?;
            let id = self.bundle.add_conditional(ConditionalSlot::keyed(medication)?);
            self.caches.medications.record(code, id);
        }

        for prescription in &admission.prescriptions {
            let medication = self
                .caches
                .medications
                .lookup(prescription.medication_code())
                .cloned()
                .ok_or_else(|| MappingError::MissingField {
                    record: "MedicationStatement".to_string(),
                    field: "medicationReference".to_string(),
                })?;

            let mut statement = self.mapper.medication_statement(
                prescription,
                ancestors,
                self.bundle.minter_mut(),
            )?;
            statement.medication_reference = Some(Reference::to(&medication));
            self.bundle.add_unconditional(statement);
        }

        Ok(())
    }

    fn observations(&mut self, admission: &AdmissionRecord, ancestors: Ancestors<'_>) -> Result<()> {
        for event in &admission.chart_events {
            let mut observation =
                self.mapper
                    .chart_observation(event, ancestors, self.bundle.minter_mut())?;
            if let Some(caregiver) = event.caregiver_id {
                let performer = self.resolve_caregiver(caregiver)?;
                observation.performer.push(Reference::to(&performer));
            }
            self.bundle.add_unconditional(observation);
        }

        for event in &admission.lab_events {
            let observation =
                self.mapper
                    .lab_observation(event, ancestors, self.bundle.minter_mut())?;
            self.bundle.add_unconditional(observation);
        }

        for note in &admission.note_events {
            let mut observation =
                self.mapper
                    .note_observation(note, ancestors, self.bundle.minter_mut())?;
            if let Some(caregiver) = note.caregiver_id {
                let performer = self.resolve_caregiver(caregiver)?;
                observation.performer.push(Reference::to(&performer));
            }
            self.bundle.add_unconditional(observation);
        }

        Ok(())
    }

    /// Ward location id; the managing organization is set only when the ward is first created
    fn resolve_ward(&mut self, ward_id: WardId) -> Result<ResourceId> {
        let key = ward_id.to_string();
        if let Some(id) = self.caches.wards.lookup(&key) {
            return Ok(id.clone());
        }

        let ward = self
            .reference
            .ward(ward_id)
            .ok_or(MappingError::UnknownWard(ward_id))?;
        let mut location = self.mapper.ward(ward, self.bundle.minter_mut())?;
        location.managing_organization = Some(Reference::to(&self.facility));

        let id = self.bundle.add_conditional(ConditionalSlot::keyed(location)?);
        self.caches.wards.record(key, id.clone());
        Ok(id)
    }

    /// Practitioner id for a caregiver, creating the practitioner and its role on first sight
    fn resolve_caregiver(&mut self, caregiver_id: CaregiverId) -> Result<ResourceId> {
        let key = caregiver_id.to_string();
        if let Some(id) = self.caches.caregivers.lookup(&key) {
            return Ok(id.clone());
        }

        let caregiver = self
            .reference
            .caregiver(caregiver_id)
            .ok_or(MappingError::UnknownCaregiver(caregiver_id))?;
        let practitioner = self
            .mapper
            .practitioner(caregiver, self.bundle.minter_mut())?;
        let id = self.bundle.add_conditional(ConditionalSlot::keyed(practitioner)?);

        if let Some(role) = self.mapper.practitioner_role(
            caregiver,
            &id,
            &self.facility,
            self.bundle.minter_mut(),
        )? {
            self.bundle.add_conditional(ConditionalSlot::keyed(role)?);
        }

        self.caches.caregivers.record(key, id.clone());
        Ok(id)
    }
}
