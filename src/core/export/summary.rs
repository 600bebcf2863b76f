//! Export summary and reporting
//!
//! Each worker keeps its own [`ExportSummary`]; the coordinator merges them
//! once the pool has drained.

use crate::domain::errors::MedBundleError;
use crate::domain::ids::PatientId;
use std::time::Duration;

/// Summary of an export operation
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Patient ids placed on the work queue
    pub patients_queued: usize,

    /// Patient ids taken from the queue
    pub patients_taken: usize,

    /// Documents assembled and handed to the sink
    pub documents_written: usize,

    /// Patients the source did not have
    pub not_found: usize,

    /// Patients whose assembly or write failed
    pub failed: usize,

    /// Resources across all written documents
    pub resources_written: usize,

    /// Duration of the export
    pub duration: Duration,

    /// Errors encountered during export
    pub errors: Vec<ExportError>,

    /// A shutdown signal stopped the run before the queue was drained
    pub interrupted: bool,

    /// Documents were assembled but not written
    pub dry_run: bool,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Record a failed patient
    pub fn record_failure(&mut self, patient_id: PatientId, error: &MedBundleError) {
        self.failed += 1;
        self.add_error(
            ExportError::new(ExportErrorType::from_error(error), error.to_string())
                .with_context(format!("patient_id={patient_id}")),
        );
    }

    /// Fold a worker's counters into this summary
    pub fn merge(&mut self, other: ExportSummary) {
        self.patients_taken += other.patients_taken;
        self.documents_written += other.documents_written;
        self.not_found += other.not_found;
        self.failed += other.failed;
        self.resources_written += other.resources_written;
        self.interrupted |= other.interrupted;
        self.errors.extend(other.errors);
    }

    /// Check if the export was successful (no failures)
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }

    /// Share of taken patients that produced a document, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.patients_taken.saturating_sub(self.not_found);
        if attempted == 0 {
            return 100.0;
        }
        (self.documents_written as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            queued = self.patients_queued,
            taken = self.patients_taken,
            written = self.documents_written,
            not_found = self.not_found,
            failed = self.failed,
            resources = self.resources_written,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            interrupted = self.interrupted,
            dry_run = self.dry_run,
            "Export completed"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "Export error"
                );
            }
        }
    }
}

/// Type of export error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorType {
    /// Data source could not be reached or queried
    Source,
    /// A record could not be mapped
    Mapping,
    /// The assembled bundle was inconsistent
    Bundle,
    /// The document could not be written
    Output,
    /// Configuration error
    Configuration,
    /// A worker task ended abnormally
    Worker,
    /// Unknown error
    Unknown,
}

impl ExportErrorType {
    pub fn from_error(error: &MedBundleError) -> Self {
        match error {
            MedBundleError::Source(_) | MedBundleError::Database(_) => Self::Source,
            MedBundleError::Mapping(_) => Self::Mapping,
            MedBundleError::Bundle(_) | MedBundleError::Serialization(_) => Self::Bundle,
            MedBundleError::Output(_) | MedBundleError::Io(_) => Self::Output,
            MedBundleError::Configuration(_) => Self::Configuration,
            MedBundleError::Validation(_) | MedBundleError::Other(_) => Self::Unknown,
        }
    }
}

/// Export error with context
#[derive(Debug, Clone)]
pub struct ExportError {
    /// Type of error
    pub error_type: ExportErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g., patient id)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}
