//! Mapper for the MIMIC-III schema

use super::codes;
use super::{Ancestors, MapResult, ResourceMapper};
use crate::core::bundle::IdMinter;
use crate::domain::resource::{
    Annotation, CodeableConcept, Coding, Condition, Dosage, Encounter, EncounterHospitalization,
    HumanName, Identifier, Location, Medication, MedicationStatement, Observation, Organization,
    Patient, Period, Practitioner, PractitionerRole, Procedure, Quantity, Reference, ResourceKind,
};
use crate::domain::{
    AdmissionRecord, CaregiverRecord, ChartEventRecord, DiagnosisRecord, LabEventRecord,
    MappingError, NoteEventRecord, PatientRecord, PrescriptionRecord, ProcedureRecord,
    ResourceId, WardRecord,
};

pub const BASE_SYSTEM: &str = "http://www.imi-mimic.de";
pub const PATIENT_SYSTEM: &str = "http://www.imi-mimic.de/patients";
pub const ENCOUNTER_SYSTEM: &str = "http://www.imi-mimic.de/encs";
pub const CONDITION_SYSTEM: &str = "http://www.imi-mimic.de/conditions";
pub const PROCEDURE_SYSTEM: &str = "http://www.imi-mimic.de/procedures";
pub const WARD_SYSTEM: &str = "http://www.imi-mimic.de/wards";
pub const CAREGIVER_SYSTEM: &str = "http://www.imi-mimic.de/caregivers";
pub const ROLE_SYSTEM: &str = "http://www.imi-mimic.de/roles";
pub const PRESCRIPTION_SYSTEM: &str = "http://www.imi-mimic.de/prescriptions";
pub const ICD9_SYSTEM: &str = "http://hl7.org/fhir/sid/icd-9-cm";

const FACILITY_NAME: &str = "IMI-Mimic Hospital";

/// Maps MIMIC-III records to FHIR R4 resources
#[derive(Debug, Clone, Copy, Default)]
pub struct MimicMapper;

impl MimicMapper {
    pub fn new() -> Self {
        Self
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn require<'a>(value: &'a str, record: &str, field: &str) -> MapResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MappingError::MissingField {
            record: record.to_string(),
            field: field.to_string(),
        });
    }
    Ok(trimmed)
}

fn require_positive(value: i64, record: &str, field: &str) -> MapResult<i64> {
    if value <= 0 {
        return Err(MappingError::InvalidValue {
            record: record.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn icd9_concept(code: &str, short_title: Option<&str>, long_title: Option<&str>) -> CodeableConcept {
    CodeableConcept {
        coding: vec![Coding::new(ICD9_SYSTEM, code, non_empty(short_title))],
        text: non_empty(long_title).map(str::to_string),
    }
}

/// Numeric values become quantities, anything else is kept as text
fn observation_value(
    value_num: Option<f64>,
    value: Option<&str>,
    unit: Option<&str>,
) -> (Option<Quantity>, Option<String>) {
    match value_num {
        Some(value) => (
            Some(Quantity {
                value,
                unit: non_empty(unit).map(str::to_string),
            }),
            None,
        ),
        None => (None, non_empty(value).map(str::to_string)),
    }
}

fn observation_status(in_error: bool) -> String {
    let status = if in_error { "entered-in-error" } else { "final" };
    status.to_string()
}

impl ResourceMapper for MimicMapper {
    fn facility(&self, id: ResourceId) -> Organization {
        Organization {
            id,
            identifier: vec![Identifier::new(BASE_SYSTEM, "hospital")],
            type_: vec![CodeableConcept::coded(Coding::new(
                codes::ORGANIZATION_TYPE_SYSTEM,
                "prov",
                Some("Healthcare Provider"),
            ))],
            name: Some(FACILITY_NAME.to_string()),
        }
    }

    fn patient(&self, record: &PatientRecord, ids: &mut IdMinter) -> MapResult<Patient> {
        let subject = require_positive(record.subject_id, "patient", "subject_id")?;
        let first_admission = record.admissions.first();

        Ok(Patient {
            id: ids.mint(ResourceKind::Patient),
            identifier: vec![Identifier::new(PATIENT_SYSTEM, subject.to_string())],
            name: vec![HumanName {
                use_: "official".to_string(),
                family: format!("Patient_{subject}"),
            }],
            gender: Some(codes::gender(&record.gender).to_string()),
            birth_date: record.birth_date,
            deceased_date_time: record.death_date,
            marital_status: first_admission
                .and_then(|a| non_empty(a.marital_status.as_deref()))
                .map(codes::marital_status),
            language: first_admission
                .and_then(|a| non_empty(a.language.as_deref()))
                .map(codes::language),
        })
    }

    fn encounter(
        &self,
        admission: &AdmissionRecord,
        patient: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Encounter> {
        let hadm_id = require_positive(admission.hadm_id, "admission", "hadm_id")?;

        let hospitalization = EncounterHospitalization {
            admit_source: non_empty(admission.admission_location.as_deref())
                .map(CodeableConcept::text),
            discharge_disposition: non_empty(admission.discharge_location.as_deref())
                .map(CodeableConcept::text),
        };
        let hospitalization = (hospitalization != EncounterHospitalization::default())
            .then_some(hospitalization);

        Ok(Encounter {
            id: ids.mint(ResourceKind::Encounter),
            identifier: vec![Identifier::new(ENCOUNTER_SYSTEM, hadm_id.to_string())],
            status: "finished".to_string(),
            type_: non_empty(Some(admission.admission_type.as_str()))
                .map(CodeableConcept::text)
                .into_iter()
                .collect(),
            subject: Reference::to(patient),
            period: Period::new(Some(admission.admit_time), admission.discharge_time),
            diagnosis: Vec::new(),
            location: Vec::new(),
            hospitalization,
        })
    }

    fn condition(
        &self,
        diagnosis: &DiagnosisRecord,
        patient: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Condition> {
        let code = require(&diagnosis.icd9_code, "diagnosis", "icd9_code")?;

        Ok(Condition {
            id: ids.mint(ResourceKind::Condition),
            identifier: vec![Identifier::new(CONDITION_SYSTEM, code)],
            code: icd9_concept(
                code,
                diagnosis.short_title.as_deref(),
                diagnosis.long_title.as_deref(),
            ),
            subject: Reference::to(patient),
        })
    }

    fn procedure(
        &self,
        procedure: &ProcedureRecord,
        patient: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Procedure> {
        let code = require(&procedure.icd9_code, "procedure", "icd9_code")?;

        Ok(Procedure {
            id: ids.mint(ResourceKind::Procedure),
            identifier: vec![Identifier::new(PROCEDURE_SYSTEM, code)],
            status: "completed".to_string(),
            code: icd9_concept(
                code,
                procedure.short_title.as_deref(),
                procedure.long_title.as_deref(),
            ),
            subject: Reference::to(patient),
        })
    }

    fn ward(&self, ward: &WardRecord, ids: &mut IdMinter) -> MapResult<Location> {
        Ok(Location {
            id: ids.mint(ResourceKind::Location),
            identifier: vec![Identifier::new(WARD_SYSTEM, ward.id.to_string())],
            status: "active".to_string(),
            name: non_empty(ward.careunit.as_deref()).map(str::to_string),
            physical_type: Some(CodeableConcept::coded(Coding::new(
                codes::PHYSICAL_TYPE_SYSTEM,
                "wa",
                Some("Ward"),
            ))),
            managing_organization: None,
        })
    }

    fn medication(
        &self,
        prescription: &PrescriptionRecord,
        ids: &mut IdMinter,
    ) -> MapResult<Medication> {
        let code = require(prescription.medication_code(), "prescription", "drug")?;
        let name = non_empty(prescription.drug_name_generic.as_deref())
            .or_else(|| non_empty(Some(prescription.drug.as_str())));

        Ok(Medication {
            id: ids.mint(ResourceKind::Medication),
            code: CodeableConcept {
                coding: vec![Coding::new(PRESCRIPTION_SYSTEM, code, name)],
                text: name.map(str::to_string),
            },
            form: non_empty(prescription.prod_strength.as_deref()).map(CodeableConcept::text),
        })
    }

    fn medication_statement(
        &self,
        prescription: &PrescriptionRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<MedicationStatement> {
        let dose = match (
            non_empty(prescription.dose_value.as_deref()),
            non_empty(prescription.dose_unit.as_deref()),
        ) {
            (Some(value), Some(unit)) => Some(format!("{value} {unit}")),
            (Some(value), None) => Some(value.to_string()),
            _ => None,
        };
        let route = non_empty(prescription.route.as_deref()).map(CodeableConcept::text);
        let dosage = (dose.is_some() || route.is_some())
            .then(|| Dosage { text: dose, route })
            .into_iter()
            .collect();

        let effective_period = (prescription.start_date.is_some()
            || prescription.end_date.is_some())
        .then(|| Period::new(prescription.start_date, prescription.end_date));

        Ok(MedicationStatement {
            id: ids.mint(ResourceKind::MedicationStatement),
            status: "completed".to_string(),
            medication_reference: None,
            subject: Reference::to(ancestors.patient),
            context: Some(Reference::to(ancestors.encounter)),
            effective_period,
            dosage,
        })
    }

    fn chart_observation(
        &self,
        event: &ChartEventRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<Observation> {
        let label = require(&event.label, "chart event", "label")?;
        let (value_quantity, value_string) = observation_value(
            event.value_num,
            event.value.as_deref(),
            event.value_unit.as_deref(),
        );

        Ok(Observation {
            id: ids.mint(ResourceKind::Observation),
            status: observation_status(event.error),
            category: vec![codes::observation_category("vital-signs", "Vital Signs")],
            code: CodeableConcept::text(label),
            subject: Reference::to(ancestors.patient),
            encounter: Some(Reference::to(ancestors.encounter)),
            effective_date_time: Some(event.chart_time),
            value_quantity,
            value_string,
            interpretation: Vec::new(),
            note: Vec::new(),
            performer: Vec::new(),
        })
    }

    fn lab_observation(
        &self,
        event: &LabEventRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<Observation> {
        let label = require(&event.label, "lab event", "label")?;
        let code = CodeableConcept {
            coding: non_empty(event.loinc_code.as_deref())
                .map(|loinc| Coding::new(codes::LOINC_SYSTEM, loinc, Some(label)))
                .into_iter()
                .collect(),
            text: Some(match non_empty(event.fluid.as_deref()) {
                Some(fluid) => format!("{label} ({fluid})"),
                None => label.to_string(),
            }),
        };
        let (value_quantity, value_string) = observation_value(
            event.value_num,
            event.value.as_deref(),
            event.value_unit.as_deref(),
        );

        Ok(Observation {
            id: ids.mint(ResourceKind::Observation),
            status: observation_status(false),
            category: vec![codes::observation_category("laboratory", "Laboratory")],
            code,
            subject: Reference::to(ancestors.patient),
            encounter: Some(Reference::to(ancestors.encounter)),
            effective_date_time: Some(event.chart_time),
            value_quantity,
            value_string,
            interpretation: event
                .flag
                .as_deref()
                .and_then(codes::lab_interpretation)
                .into_iter()
                .collect(),
            note: Vec::new(),
            performer: Vec::new(),
        })
    }

    fn note_observation(
        &self,
        note: &NoteEventRecord,
        ancestors: Ancestors<'_>,
        ids: &mut IdMinter,
    ) -> MapResult<Observation> {
        Ok(Observation {
            id: ids.mint(ResourceKind::Observation),
            status: observation_status(note.has_error),
            category: codes::note_category(&note.category).into_iter().collect(),
            code: CodeableConcept::text(note.description.trim()),
            subject: Reference::to(ancestors.patient),
            encounter: Some(Reference::to(ancestors.encounter)),
            effective_date_time: Some(note.chart_date),
            value_quantity: None,
            value_string: None,
            interpretation: Vec::new(),
            note: non_empty(Some(note.text.as_str()))
                .map(|text| Annotation {
                    text: text.to_string(),
                })
                .into_iter()
                .collect(),
            performer: Vec::new(),
        })
    }

    fn practitioner(
        &self,
        caregiver: &CaregiverRecord,
        ids: &mut IdMinter,
    ) -> MapResult<Practitioner> {
        Ok(Practitioner {
            id: ids.mint(ResourceKind::Practitioner),
            identifier: vec![Identifier::new(CAREGIVER_SYSTEM, caregiver.id.to_string())],
        })
    }

    fn practitioner_role(
        &self,
        caregiver: &CaregiverRecord,
        practitioner: &ResourceId,
        facility: &ResourceId,
        ids: &mut IdMinter,
    ) -> MapResult<Option<PractitionerRole>> {
        let Some(label) = non_empty(caregiver.label.as_deref()) else {
            return Ok(None);
        };

        Ok(Some(PractitionerRole {
            id: ids.mint(ResourceKind::PractitionerRole),
            identifier: vec![Identifier::new(ROLE_SYSTEM, caregiver.id.to_string())],
            practitioner: Some(Reference::to(practitioner)),
            organization: Some(Reference::to(facility)),
            code: vec![CodeableConcept {
                coding: vec![Coding::new(
                    ROLE_SYSTEM,
                    label,
                    non_empty(caregiver.description.as_deref()),
                )],
                text: non_empty(caregiver.description.as_deref()).map(str::to_string),
            }],
        }))
    }
}
