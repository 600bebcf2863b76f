//! Export coordinator - main orchestrator for the export process
//!
//! The coordinator seeds a [`WorkQueue`] with patient ids, preloads the
//! reference data once and runs a pool of workers. Each worker owns its own
//! [`PatientAssemblyEngine`]; only the queue is shared for mutation.

use crate::adapters::source::{create_data_source, ClinicalDataSource};
use crate::config::MedBundleConfig;
use crate::core::assembly::{PatientAssemblyEngine, ReferenceData};
use crate::core::export::sink::{BundleSink, DirectorySink, DryRunSink};
use crate::core::export::summary::{ExportError, ExportErrorType, ExportSummary};
use crate::core::mapping::MimicMapper;
use crate::core::queue::WorkQueue;
use crate::domain::errors::MedBundleError;
use crate::domain::ids::PatientId;
use crate::domain::Result;
use crate::{log_error_with_context, log_export_progress};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Progress is logged every this many patients
const PROGRESS_INTERVAL: usize = 100;

/// Export coordinator
pub struct ExportCoordinator {
    config: MedBundleConfig,
    source: Arc<dyn ClinicalDataSource>,
    sink: Arc<dyn BundleSink>,
    shutdown: watch::Receiver<bool>,
}

impl ExportCoordinator {
    /// Create a coordinator from configuration
    ///
    /// Opens and tests the configured data source, then prepares the output
    /// directory (or a discarding sink in dry-run mode).
    pub async fn new(config: MedBundleConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let source = create_data_source(&config).await?;
        source.test_connection().await?;

        let sink: Arc<dyn BundleSink> = if config.application.dry_run {
            Arc::new(DryRunSink)
        } else {
            Arc::new(DirectorySink::create(&config.export.output_dir).await?)
        };

        Ok(Self::with_parts(config, source, sink, shutdown))
    }

    /// Create a coordinator around an existing source and sink
    pub fn with_parts(
        config: MedBundleConfig,
        source: Arc<dyn ClinicalDataSource>,
        sink: Arc<dyn BundleSink>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
            shutdown,
        }
    }

    /// Execute the export
    ///
    /// This is the main entry point for the export process. It:
    /// 1. Determines the patient ids (allow-list or the whole source)
    /// 2. Preloads caregivers and wards and creates the facility anchor
    /// 3. Runs the worker pool until the queue is drained, the limit is
    ///    reached or a shutdown is requested
    /// 4. Merges the per-worker summaries
    ///
    /// Per-patient failures are recorded in the summary; only failures that
    /// prevent the run from starting are returned as errors.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut summary = ExportSummary {
            dry_run: self.config.application.dry_run,
            ..ExportSummary::default()
        };

        tracing::info!(
            source = self.source.name(),
            output = %self.sink.describe(),
            "Starting export process"
        );

        let strategy = self
            .config
            .export
            .parsed_id_strategy()
            .map_err(MedBundleError::Configuration)?;

        let ids = self.patient_ids().await?;
        summary.patients_queued = ids.len();
        if ids.is_empty() {
            tracing::warn!("No patients to export");
            return Ok(summary.with_duration(start_time.elapsed()));
        }

        let queue = Arc::new(WorkQueue::new(ids));
        let mapper = MimicMapper::new();
        let reference = Arc::new(ReferenceData::load(self.source.as_ref(), &mapper).await?);

        let worker_count = self.config.export.workers.clamp(1, queue.len());
        let budget = Arc::new(AtomicUsize::new(
            self.config.export.limit.unwrap_or(usize::MAX),
        ));
        let progress = Arc::new(AtomicUsize::new(0));

        tracing::info!(
            patients = summary.patients_queued,
            workers = worker_count,
            limit = ?self.config.export.limit,
            "Processing patients"
        );

        let handles: Vec<JoinHandle<ExportSummary>> = (0..worker_count)
            .map(|index| {
                let worker = Worker {
                    index,
                    queue: Arc::clone(&queue),
                    source: Arc::clone(&self.source),
                    sink: Arc::clone(&self.sink),
                    engine: PatientAssemblyEngine::new(mapper, Arc::clone(&reference), strategy)
                        .with_pretty_print(self.config.export.pretty_print),
                    budget: Arc::clone(&budget),
                    progress: Arc::clone(&progress),
                    total: summary.patients_queued,
                    shutdown: self.shutdown.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        for (index, result) in self.join_workers(handles).await.into_iter().enumerate() {
            match result {
                Ok(worker_summary) => summary.merge(worker_summary),
                Err(e) => {
                    tracing::error!(worker = index, error = %e, "Worker task ended abnormally");
                    summary.interrupted |= e.is_cancelled();
                    summary.add_error(
                        ExportError::new(
                            ExportErrorType::Worker,
                            format!("Worker task ended abnormally: {e}"),
                        )
                        .with_context(format!("worker={index}")),
                    );
                }
            }
        }

        if *self.shutdown.borrow() && !queue.is_empty() {
            summary.interrupted = true;
        }

        summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();

        Ok(summary)
    }

    /// Configured allow-list, or every patient the source knows
    async fn patient_ids(&self) -> Result<Vec<PatientId>> {
        if let Some(ids) = &self.config.export.patient_ids {
            tracing::info!(count = ids.len(), "Using configured patient ids");
            return ids
                .iter()
                .map(|&id| PatientId::new(id).map_err(MedBundleError::Configuration))
                .collect();
        }

        let ids = self.source.list_patient_ids().await?;
        tracing::info!(count = ids.len(), "Fetched patient ids from source");
        Ok(ids)
    }

    /// Wait for every worker; after a shutdown signal, wait at most the grace period
    async fn join_workers(
        &self,
        handles: Vec<JoinHandle<ExportSummary>>,
    ) -> Vec<std::result::Result<ExportSummary, JoinError>> {
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        let joined = futures::future::join_all(handles);
        tokio::pin!(joined);

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            results = &mut joined => results,
            () = wait_for_shutdown(&mut shutdown) => {
                let grace = Duration::from_secs(self.config.export.shutdown_timeout_secs);
                tracing::info!(
                    timeout_secs = grace.as_secs(),
                    "Shutdown requested, waiting for in-flight assemblies"
                );
                match tokio::time::timeout(grace, &mut joined).await {
                    Ok(results) => results,
                    Err(_) => {
                        tracing::warn!("Shutdown timeout elapsed, aborting workers");
                        for handle in &aborts {
                            handle.abort();
                        }
                        joined.await
                    }
                }
            }
        }
    }
}

/// Resolves once the shutdown flag is set; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

/// Take one unit from the patient budget
fn reserve(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// One pool member and everything it owns
struct Worker {
    index: usize,
    queue: Arc<WorkQueue>,
    source: Arc<dyn ClinicalDataSource>,
    sink: Arc<dyn BundleSink>,
    engine: PatientAssemblyEngine<MimicMapper>,
    budget: Arc<AtomicUsize>,
    progress: Arc<AtomicUsize>,
    total: usize,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) -> ExportSummary {
        let mut summary = ExportSummary::new();
        tracing::debug!(worker = self.index, "Worker started");

        loop {
            let stop = *self.shutdown.borrow();
            if stop {
                tracing::debug!(worker = self.index, "Shutdown requested, worker stopping");
                summary.interrupted = true;
                break;
            }
            if !reserve(&self.budget) {
                tracing::debug!(worker = self.index, "Patient limit reached");
                break;
            }
            let Some(patient_id) = self.queue.take() else {
                break;
            };

            summary.patients_taken += 1;
            self.process(patient_id, &mut summary).await;

            let done = self.progress.fetch_add(1, Ordering::SeqCst) + 1;
            if done % PROGRESS_INTERVAL == 0 || done == self.total {
                log_export_progress!(done, self.total);
            }
        }

        tracing::debug!(
            worker = self.index,
            taken = summary.patients_taken,
            "Worker finished"
        );
        summary
    }

    async fn process(&mut self, patient_id: PatientId, summary: &mut ExportSummary) {
        let document = match self.engine.assemble(patient_id, self.source.as_ref()).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                summary.not_found += 1;
                return;
            }
            Err(e) => {
                summary.record_failure(patient_id, &e);
                return;
            }
        };

        match self.sink.write(&document).await {
            Ok(()) => {
                summary.documents_written += 1;
                summary.resources_written += document.resources();
            }
            Err(e) => {
                let context = format!("writing document for patient {patient_id}");
                log_error_with_context!(e, context.as_str());
                summary.record_failure(patient_id, &e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::FixtureSource;
    use crate::config::schema::{FixtureConfig, SourceKind};
    use tempfile::TempDir;

    const DATASET: &str = r#"{
        "patients": [
            {"row_id": 1, "subject_id": 10, "gender": "F",
             "admissions": [{"hadm_id": 100, "admit_time": "2101-10-20T19:08:00"}]},
            {"row_id": 2, "subject_id": 20, "gender": "M"},
            {"row_id": 3, "subject_id": 30, "gender": "M",
             "admissions": [{"hadm_id": 300, "admit_time": "2102-01-02T08:00:00"}]}
        ]
    }"#;

    fn config(output_dir: &str) -> MedBundleConfig {
        let mut config = MedBundleConfig {
            application: Default::default(),
            source: SourceKind::Fixture,
            postgresql: None,
            fixture: Some(FixtureConfig {
                path: "unused.json".to_string(),
            }),
            export: Default::default(),
            logging: Default::default(),
        };
        config.export.output_dir = output_dir.to_string();
        config.export.workers = 2;
        config
    }

    async fn coordinator(config: MedBundleConfig) -> ExportCoordinator {
        let (_tx, rx) = watch::channel(false);
        let source = Arc::new(FixtureSource::from_json(DATASET).unwrap());
        let sink = Arc::new(DirectorySink::create(&config.export.output_dir).await.unwrap());
        ExportCoordinator::with_parts(config, source, sink, rx)
    }

    #[tokio::test]
    async fn test_exports_every_patient() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(config(temp.path().to_str().unwrap())).await;

        let summary = coordinator.execute_export().await.unwrap();

        assert_eq!(summary.patients_queued, 3);
        assert_eq!(summary.patients_taken, 3);
        assert_eq!(summary.documents_written, 3);
        assert!(summary.is_successful());
        assert!(temp.path().join("patient_2.json").exists());
    }

    #[tokio::test]
    async fn test_limit_caps_patients_taken() {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path().to_str().unwrap());
        config.export.limit = Some(2);

        let summary = coordinator(config).await.execute_export().await.unwrap();

        assert_eq!(summary.patients_taken, 2);
        assert_eq!(summary.documents_written, 2);
        assert!(!summary.interrupted);
    }

    #[tokio::test]
    async fn test_allow_list_with_unknown_patient() {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path().to_str().unwrap());
        config.export.patient_ids = Some(vec![3, 99]);

        let summary = coordinator(config).await.execute_export().await.unwrap();

        assert_eq!(summary.patients_queued, 2);
        assert_eq!(summary.documents_written, 1);
        assert_eq!(summary.not_found, 1);
        assert!(summary.is_successful());
        assert!(temp.path().join("patient_3.json").exists());
        assert!(!temp.path().join("patient_1.json").exists());
    }

    #[tokio::test]
    async fn test_invalid_id_strategy() {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path().to_str().unwrap());
        config.export.id_strategy = "counter".to_string();

        let result = coordinator(config).await.execute_export().await;
        assert!(matches!(result, Err(MedBundleError::Configuration(_))));
    }

    #[test]
    fn test_reserve_budget() {
        let budget = AtomicUsize::new(2);
        assert!(reserve(&budget));
        assert!(reserve(&budget));
        assert!(!reserve(&budget));
        assert_eq!(budget.load(Ordering::SeqCst), 0);
    }
}
