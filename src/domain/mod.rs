//! Domain models and types for MedBundle.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`PatientId`], [`CaregiverId`], [`WardId`], [`ResourceId`])
//! - **Source records** ([`PatientRecord`], [`AdmissionRecord`] and its children)
//! - **Document resources** ([`Resource`] and the typed FHIR resources it wraps)
//! - **Error types** ([`MedBundleError`], [`SourceError`], [`MappingError`], [`BundleError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Source identifiers and synthetic document identifiers are distinct types,
//! so a row id can never end up inside a reference:
//!
//! ```rust
//! use medbundle::domain::{PatientId, ResourceId};
//!
//! let patient = PatientId::new(42).unwrap();
//! let resource = ResourceId::random();
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: ResourceId = patient;
//! # let _ = (patient, resource);
//! ```

pub mod errors;
pub mod ids;
pub mod records;
pub mod resource;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{BundleError, MappingError, MedBundleError, SourceError};
pub use ids::{CaregiverId, PatientId, ResourceId, WardId};
pub use records::{
    AdmissionRecord, CaregiverRecord, ChartEventRecord, DiagnosisRecord, LabEventRecord,
    NoteEventRecord, PatientRecord, PrescriptionRecord, ProcedureRecord, TransferRecord,
    WardRecord,
};
pub use resource::{NaturalKey, Reference, Resource, ResourceKind};
pub use result::Result;
