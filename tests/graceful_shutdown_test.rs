//! Integration tests for graceful shutdown functionality
//!
//! These tests verify that:
//! - No patient is taken once the shutdown signal is set
//! - Patients in flight when the signal arrives are still written
//! - Workers that outlive the grace period are aborted

use async_trait::async_trait;
use medbundle::adapters::{ClinicalDataSource, FixtureSource};
use medbundle::config::{parse_config, MedBundleConfig};
use medbundle::core::export::{BundleSink, DirectorySink, ExportCoordinator, ExportErrorType};
use medbundle::domain::{CaregiverId, CaregiverRecord, PatientId, PatientRecord, Result, WardId, WardRecord};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

/// Fixture source that takes `delay` to load each patient
struct SlowSource {
    inner: FixtureSource,
    delay: Duration,
}

impl SlowSource {
    fn new(patients: usize, delay: Duration) -> Self {
        let patients: Vec<String> = (1..=patients)
            .map(|id| {
                format!(
                    r#"{{"row_id": {id}, "subject_id": {id}, "gender": "F",
                        "admissions": [{{"hadm_id": {id}, "admit_time": "2101-10-20T19:08:00"}}]}}"#
                )
            })
            .collect();
        let json = format!(r#"{{"patients": [{}]}}"#, patients.join(","));
        Self {
            inner: FixtureSource::from_json(&json).unwrap(),
            delay,
        }
    }
}

#[async_trait]
impl ClinicalDataSource for SlowSource {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn list_patient_ids(&self) -> Result<Vec<PatientId>> {
        self.inner.list_patient_ids().await
    }

    async fn load_patient(&self, id: PatientId) -> Result<Option<PatientRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.load_patient(id).await
    }

    async fn preload_caregivers(&self) -> Result<HashMap<CaregiverId, CaregiverRecord>> {
        self.inner.preload_caregivers().await
    }

    async fn preload_wards(&self) -> Result<HashMap<WardId, WardRecord>> {
        self.inner.preload_wards().await
    }
}

fn config(output_dir: &Path, workers: usize, shutdown_timeout_secs: u64) -> MedBundleConfig {
    let mut config = parse_config(
        r#"
source = "fixture"

[fixture]
path = "unused.json"
"#,
    )
    .unwrap();
    config.export.output_dir = output_dir.display().to_string();
    config.export.workers = workers;
    config.export.shutdown_timeout_secs = shutdown_timeout_secs;
    config
}

async fn coordinator(
    dir: &Path,
    source: SlowSource,
    workers: usize,
    shutdown_timeout_secs: u64,
    rx: watch::Receiver<bool>,
) -> ExportCoordinator {
    let sink: Arc<dyn BundleSink> = Arc::new(DirectorySink::create(dir).await.unwrap());
    ExportCoordinator::with_parts(
        config(dir, workers, shutdown_timeout_secs),
        Arc::new(source),
        sink,
        rx,
    )
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_shutdown_signal_propagation() {
    let (shutdown_tx, shutdown_rx1) = watch::channel(false);
    let shutdown_rx2 = shutdown_rx1.clone();

    assert!(!*shutdown_rx1.borrow());
    assert!(!*shutdown_rx2.borrow());

    shutdown_tx.send(true).unwrap();

    assert!(*shutdown_rx1.borrow());
    assert!(*shutdown_rx2.borrow());
}

#[tokio::test]
async fn test_signal_before_start_takes_nothing() {
    let temp = TempDir::new().unwrap();
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let coordinator = coordinator(temp.path(), SlowSource::new(5, Duration::ZERO), 2, 5, rx).await;
    let summary = coordinator.execute_export().await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.patients_taken, 0);
    assert_eq!(file_count(temp.path()), 0);
}

#[tokio::test]
async fn test_in_flight_patients_finish_after_signal() {
    let temp = TempDir::new().unwrap();
    let (tx, rx) = watch::channel(false);
    let source = SlowSource::new(40, Duration::from_millis(50));
    let coordinator = coordinator(temp.path(), source, 2, 30, rx).await;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(175)).await;
        let _ = tx.send(true);
    });

    let summary = coordinator.execute_export().await.unwrap();

    assert!(summary.interrupted);
    assert!(summary.patients_taken > 0);
    assert!(summary.patients_taken < 40);
    // Every patient that was taken was completed and written
    assert_eq!(summary.documents_written, summary.patients_taken);
    assert_eq!(summary.failed, 0);
    assert_eq!(file_count(temp.path()), summary.documents_written);
}

#[tokio::test]
async fn test_workers_aborted_after_grace_period() {
    let temp = TempDir::new().unwrap();
    let (tx, rx) = watch::channel(false);
    let source = SlowSource::new(4, Duration::from_secs(60));
    let coordinator = coordinator(temp.path(), source, 2, 1, rx).await;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = tx.send(true);
    });

    let summary = tokio::time::timeout(Duration::from_secs(10), coordinator.execute_export())
        .await
        .expect("export returns once the grace period elapses")
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.documents_written, 0);
    assert_eq!(
        summary
            .errors
            .iter()
            .filter(|e| e.error_type == ExportErrorType::Worker)
            .count(),
        2
    );
    assert_eq!(file_count(temp.path()), 0);
}
