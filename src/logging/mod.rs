//! Logging and observability
//!
//! Structured logging built on `tracing`:
//! - console output for operators
//! - optional JSON file logs with daily or hourly rotation
//! - helper macros for the recurring assembly events
//!
//! # Example
//!
//! ```no_run
//! use medbundle::logging::init_logging;
//! use medbundle::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{effective_log_level, init_logging, init_logging_from_config, LoggingGuard};

/// Log the start of one patient's assembly
///
/// # Example
///
/// ```no_run
/// use medbundle::log_assembly_start;
/// use medbundle::domain::PatientId;
///
/// let patient_id = PatientId::new(42).unwrap();
/// log_assembly_start!(patient_id);
/// ```
#[macro_export]
macro_rules! log_assembly_start {
    ($patient_id:expr) => {
        tracing::debug!(patient_id = %$patient_id, "Assembling patient document");
    };
}

/// Log a finished patient document
///
/// # Example
///
/// ```no_run
/// use medbundle::log_assembly_complete;
/// use medbundle::domain::PatientId;
/// use std::time::Duration;
///
/// let patient_id = PatientId::new(42).unwrap();
/// log_assembly_complete!(patient_id, 17, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_assembly_complete {
    ($patient_id:expr, $resources:expr, $duration:expr) => {
        tracing::debug!(
            patient_id = %$patient_id,
            resources = $resources,
            duration_ms = $duration.as_millis(),
            "Patient document assembled"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use medbundle::log_error_with_context;
/// use medbundle::domain::MedBundleError;
///
/// let error = MedBundleError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log export progress
///
/// # Example
///
/// ```no_run
/// use medbundle::log_export_progress;
///
/// log_export_progress!(100, 1000);
/// ```
#[macro_export]
macro_rules! log_export_progress {
    ($current:expr, $total:expr) => {
        tracing::info!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Export progress"
        );
    };
}
