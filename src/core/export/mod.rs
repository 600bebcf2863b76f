//! Export orchestration
//!
//! This module provides the export side of MedBundle:
//! - Export coordination over a pool of assembly workers
//! - Sinks that receive finished documents
//! - Summary and reporting

pub mod coordinator;
pub mod sink;
pub mod summary;

pub use coordinator::ExportCoordinator;
pub use sink::{BundleSink, DirectorySink, DryRunSink};
pub use summary::{ExportError, ExportErrorType, ExportSummary};
