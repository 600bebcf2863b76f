//! Integration tests for per-patient bundle assembly
//!
//! These tests run the assembly engine against the sample dataset in
//! `tests/fixtures/mimic_sample.json` and check:
//! - Shared resources (wards, caregivers, medications) appear once per document
//! - Encounter diagnoses and locations keep source order
//! - Nothing from one patient's document leaks into the next
//! - A missing patient leaves the engine pristine

use medbundle::adapters::FixtureSource;
use medbundle::core::assembly::{AssemblyState, PatientAssemblyEngine, ReferenceData};
use medbundle::core::bundle::{Bundle, BundleAssembler, ConditionalSlot, IdStrategy};
use medbundle::core::mapping::{MimicMapper, ResourceMapper};
use medbundle::domain::resource::{Encounter, Organization, ResourceKind};
use medbundle::domain::{PatientId, Resource, ResourceId};
use std::collections::HashSet;
use std::sync::Arc;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mimic_sample.json");

async fn setup(strategy: IdStrategy) -> (FixtureSource, PatientAssemblyEngine) {
    let source = FixtureSource::from_path(FIXTURE).await.unwrap();
    let mapper = MimicMapper::new();
    let reference = Arc::new(ReferenceData::load(&source, &mapper).await.unwrap());
    let engine = PatientAssemblyEngine::new(mapper, reference, strategy);
    (source, engine)
}

async fn assemble(engine: &mut PatientAssemblyEngine, source: &FixtureSource, id: i64) -> Bundle {
    engine
        .assemble(PatientId::new(id).unwrap(), source)
        .await
        .unwrap()
        .expect("patient present in fixture")
        .bundle
}

fn encounters(bundle: &Bundle) -> Vec<&Encounter> {
    bundle
        .resources()
        .filter_map(|r| match r {
            Resource::Encounter(e) => Some(e),
            _ => None,
        })
        .collect()
}

fn facility(bundle: &Bundle) -> &Organization {
    bundle
        .resources()
        .find_map(|r| match r {
            Resource::Organization(o) => Some(o),
            _ => None,
        })
        .expect("facility anchor")
}

fn ids(bundle: &Bundle) -> HashSet<ResourceId> {
    bundle.resources().map(|r| r.id().clone()).collect()
}

#[tokio::test]
async fn test_ward_revisited_yields_one_location_and_ordered_periods() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let bundle = assemble(&mut engine, &source, 1).await;

    // MICU -> CSRU -> MICU -> discharge
    assert_eq!(bundle.count(ResourceKind::Location), 2);

    let encounter = encounters(&bundle)[0];
    assert_eq!(encounter.location.len(), 3);
    let first = encounter.location[0].location.target();
    let second = encounter.location[1].location.target();
    let third = encounter.location[2].location.target();
    assert_eq!(first, third);
    assert_ne!(first, second);

    let starts: Vec<_> = encounter
        .location
        .iter()
        .map(|l| l.period.start.unwrap().to_string())
        .collect();
    assert_eq!(
        starts,
        vec![
            "2164-10-23 21:10:00",
            "2164-10-25 12:21:00",
            "2164-10-27 09:00:00"
        ]
    );
}

#[tokio::test]
async fn test_wards_are_managed_by_the_facility() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let bundle = assemble(&mut engine, &source, 1).await;

    let facility_id = facility(&bundle).id.clone();
    assert_eq!(bundle.count(ResourceKind::Organization), 1);
    for resource in bundle.resources_of(ResourceKind::Location) {
        let Resource::Location(location) = resource else {
            unreachable!()
        };
        let owner = location.managing_organization.as_ref().unwrap();
        assert_eq!(owner.target(), &facility_id);
    }
}

#[tokio::test]
async fn test_diagnosis_ranks_follow_sequence_numbers() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let bundle = assemble(&mut engine, &source, 1).await;

    let encounter = encounters(&bundle)[0];
    let ranks: Vec<_> = encounter.diagnosis.iter().map(|d| d.rank).collect();
    assert_eq!(ranks, vec![Some(1), Some(2), Some(3), Some(1)]);

    let kinds: Vec<_> = encounter
        .diagnosis
        .iter()
        .map(|d| bundle.find(d.condition.target()).unwrap().kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            ResourceKind::Condition,
            ResourceKind::Condition,
            ResourceKind::Condition,
            ResourceKind::Procedure
        ]
    );
}

#[tokio::test]
async fn test_shared_medication_code_yields_one_medication() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let bundle = assemble(&mut engine, &source, 1).await;

    // Two M01 prescriptions and one HEPA5I prescription
    assert_eq!(bundle.count(ResourceKind::Medication), 2);
    assert_eq!(bundle.count(ResourceKind::MedicationStatement), 3);

    let m01 = bundle
        .resources()
        .find_map(|r| match r {
            Resource::Medication(m) if m.code.first_code() == Some("M01") => Some(m.id.clone()),
            _ => None,
        })
        .expect("M01 medication");

    let referencing_m01 = bundle
        .resources()
        .filter(|r| match r {
            Resource::MedicationStatement(s) => s
                .medication_reference
                .as_ref()
                .is_some_and(|reference| reference.target() == &m01),
            _ => false,
        })
        .count();
    assert_eq!(referencing_m01, 2);
}

#[tokio::test]
async fn test_caregiver_appears_once_and_is_referenced_by_observations() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let bundle = assemble(&mut engine, &source, 1).await;

    // Caregivers 14 (two vitals) and 20 (one note); the error row has none
    assert_eq!(bundle.count(ResourceKind::Practitioner), 2);
    assert_eq!(bundle.count(ResourceKind::PractitionerRole), 2);
    assert_eq!(bundle.count(ResourceKind::Observation), 5);

    let performers: HashSet<_> = bundle
        .resources()
        .filter_map(|r| match r {
            Resource::Observation(o) => o.performer.first().map(|p| p.target().clone()),
            _ => None,
        })
        .collect();
    assert_eq!(performers.len(), 2);
    for performer in performers {
        assert_eq!(
            bundle.find(&performer).unwrap().kind(),
            ResourceKind::Practitioner
        );
    }
}

#[tokio::test]
async fn test_ward_shared_across_admissions_within_one_document() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let bundle = assemble(&mut engine, &source, 2).await;

    let encounters = encounters(&bundle);
    assert_eq!(encounters.len(), 2);
    assert_eq!(bundle.count(ResourceKind::Location), 1);
    assert_eq!(
        encounters[0].location[0].location.target(),
        encounters[1].location[0].location.target()
    );

    let expected = [
        AssemblyState::Idle,
        AssemblyState::Loaded,
        AssemblyState::BasicGraphBuilt,
        AssemblyState::MedicationAttached,
        AssemblyState::ObservationsAttached,
        AssemblyState::BasicGraphBuilt,
        AssemblyState::MedicationAttached,
        AssemblyState::ObservationsAttached,
        AssemblyState::Finalized,
        AssemblyState::Reset,
    ];
    assert_eq!(engine.last_transitions(), &expected);
}

#[tokio::test]
async fn test_condition_and_medication_shared_across_admissions() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let document = engine
        .assemble(PatientId::new(2).unwrap(), &source)
        .await
        .unwrap()
        .unwrap();
    let bundle = &document.bundle;

    // 07070 is diagnosed in both admissions, M01 prescribed in both
    assert_eq!(bundle.count(ResourceKind::Condition), 2);
    assert_eq!(bundle.count(ResourceKind::Medication), 1);
    assert_eq!(bundle.count(ResourceKind::MedicationStatement), 2);

    let encounters = encounters(bundle);
    let first: Vec<_> = encounters[0]
        .diagnosis
        .iter()
        .map(|d| (d.condition.target().clone(), d.rank))
        .collect();
    let second: Vec<_> = encounters[1]
        .diagnosis
        .iter()
        .map(|d| (d.condition.target().clone(), d.rank))
        .collect();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    assert_eq!(first[0].1, Some(1));
    assert_eq!(second[1].1, Some(2));
    assert_eq!(first[0].0, second[1].0);
    assert_ne!(second[0].0, second[1].0);

    let medication = bundle
        .resources_of(ResourceKind::Medication)
        .next()
        .unwrap()
        .id()
        .clone();
    for resource in bundle.resources_of(ResourceKind::MedicationStatement) {
        let Resource::MedicationStatement(statement) = resource else {
            unreachable!()
        };
        assert_eq!(
            statement.medication_reference.as_ref().unwrap().target(),
            &medication
        );
    }

    let json: serde_json::Value = serde_json::from_str(&document.json).unwrap();
    let medication_entry = json["entry"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["resource"]["resourceType"] == "Medication")
        .unwrap();
    assert_eq!(medication_entry["request"]["ifNoneExist"], "code=M01");
    assert_eq!(medication_entry["request"]["url"], "Medication");
}

#[tokio::test]
async fn test_no_leakage_between_consecutive_patients() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;

    let first = assemble(&mut engine, &source, 1).await;
    assert!(engine.is_pristine());
    let second = assemble(&mut engine, &source, 2).await;
    assert!(engine.is_pristine());

    // Patient 2 shares ward 52, caregiver 14 and medication M01 with patient 1
    assert_eq!(second.count(ResourceKind::Location), 1);
    assert_eq!(second.count(ResourceKind::Practitioner), 1);
    assert_eq!(second.count(ResourceKind::Medication), 1);
    assert!(second.verify_references().is_ok());

    // Only the facility anchor is common to both documents
    let shared: Vec<_> = ids(&first).intersection(&ids(&second)).cloned().collect();
    assert_eq!(shared, vec![facility(&first).id.clone()]);
    assert_eq!(facility(&first).id, facility(&second).id);
}

#[tokio::test]
async fn test_patient_without_admissions() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let bundle = assemble(&mut engine, &source, 3).await;

    assert_eq!(bundle.len(), 2);
    assert_eq!(bundle.count(ResourceKind::Patient), 1);
    assert_eq!(bundle.count(ResourceKind::Organization), 1);
    assert_eq!(
        engine.last_transitions(),
        &[
            AssemblyState::Idle,
            AssemblyState::Loaded,
            AssemblyState::Finalized,
            AssemblyState::Reset
        ]
    );
}

#[tokio::test]
async fn test_missing_patient_leaves_engine_pristine() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;

    let result = engine
        .assemble(PatientId::new(999).unwrap(), &source)
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(engine.is_pristine());
    assert_eq!(
        engine.last_transitions(),
        &[AssemblyState::Idle, AssemblyState::Loaded, AssemblyState::Reset]
    );

    // The next patient is unaffected
    let bundle = assemble(&mut engine, &source, 3).await;
    assert_eq!(bundle.len(), 2);
}

#[tokio::test]
async fn test_sequential_ids_are_reproducible() {
    let (source, mut engine) = setup(IdStrategy::Sequential).await;
    let id = PatientId::new(1).unwrap();

    let first = engine.assemble(id, &source).await.unwrap().unwrap();
    let second = engine.assemble(id, &source).await.unwrap().unwrap();

    assert_eq!(first.json, second.json);
}

#[tokio::test]
async fn test_document_json_is_a_transaction_bundle() {
    let (source, mut engine) = setup(IdStrategy::Uuid).await;
    let document = engine
        .assemble(PatientId::new(1).unwrap(), &source)
        .await
        .unwrap()
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&document.json).unwrap();
    assert_eq!(json["resourceType"], "Bundle");
    assert_eq!(json["type"], "transaction");

    let entries = json["entry"].as_array().unwrap();
    assert_eq!(entries.len(), document.resources());
    assert_eq!(entries[0]["resource"]["resourceType"], "Organization");
    assert_eq!(entries[1]["resource"]["resourceType"], "Patient");
    for entry in entries {
        assert_eq!(entry["request"]["method"], "POST");
    }

    let conditional = entries
        .iter()
        .filter(|e| e["request"].get("ifNoneExist").is_some())
        .count();
    let unconditional = entries.len() - conditional;
    // Encounter, three statements and five observations
    assert_eq!(unconditional, 9);
}

#[test]
fn test_add_conditional_is_idempotent_per_key() {
    let mapper = MimicMapper::new();
    let mut assembler = BundleAssembler::new(IdStrategy::Uuid);

    let first = mapper.facility(ResourceId::random());
    let second = mapper.facility(ResourceId::random());
    let rejected = second.id.clone();

    let kept = assembler.add_conditional(ConditionalSlot::keyed(first.clone()).unwrap());
    let again = assembler.add_conditional(ConditionalSlot::keyed(second).unwrap());

    assert_eq!(kept, first.id);
    assert_eq!(again, kept);
    assert_ne!(again, rejected);
    assert_eq!(assembler.len(), 1);
    assert_eq!(assembler.discarded(), 1);
    assert_eq!(assembler.finalize().len(), 1);
}
