//! Domain error types
//!
//! This module defines the error hierarchy for MedBundle. A patient that does
//! not exist in the source is *not* an error: assembly reports it as an empty
//! result. Likewise an exhausted work queue is a normal termination signal.

use crate::domain::ids::{CaregiverId, WardId};
use thiserror::Error;

/// Main MedBundle error type
#[derive(Debug, Error)]
pub enum MedBundleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Clinical data source errors
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    /// A record could not be turned into a document resource
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// The assembled bundle is internally inconsistent
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Database-related errors (generic)
    #[error("Database error: {0}")]
    Database(String),

    /// Errors writing finished documents
    #[error("Output error: {0}")]
    Output(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Clinical data source errors
///
/// These errors don't expose the database driver's types.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to connect to the source database
    #[error("Failed to connect to source: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A row could not be decoded into a record
    #[error("Invalid row in {table}: {message}")]
    InvalidRow { table: String, message: String },

    /// A fixture dataset could not be read
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),
}

/// Resource mapping errors
///
/// Raised when a collaborator cannot produce a document resource for a source
/// record. These surface to the caller of `assemble` after the per-document
/// reset has run.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A transfer referenced a ward that was not preloaded
    #[error("Unknown ward: {0}")]
    UnknownWard(WardId),

    /// An event referenced a caregiver that was not preloaded
    #[error("Unknown caregiver: {0}")]
    UnknownCaregiver(CaregiverId),

    /// A required field was empty
    #[error("Missing field '{field}' in {record}")]
    MissingField { record: String, field: String },

    /// A field value could not be interpreted
    #[error("Invalid value '{value}' for field '{field}' in {record}")]
    InvalidValue {
        record: String,
        field: String,
        value: String,
    },
}

/// Bundle consistency errors
#[derive(Debug, Error)]
pub enum BundleError {
    /// A resource references an id that is not present in the bundle
    #[error("Dangling reference from {from} to {reference}")]
    DanglingReference { from: String, reference: String },

    /// The bundle could not be serialized
    #[error("Failed to serialize bundle: {0}")]
    Serialization(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for MedBundleError {
    fn from(err: std::io::Error) -> Self {
        MedBundleError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MedBundleError {
    fn from(err: serde_json::Error) -> Self {
        MedBundleError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MedBundleError {
    fn from(err: toml::de::Error) -> Self {
        MedBundleError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medbundle_error_display() {
        let err = MedBundleError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_source_error_conversion() {
        let source_err = SourceError::QueryFailed("timeout".to_string());
        let err: MedBundleError = source_err.into();
        assert!(matches!(err, MedBundleError::Source(_)));
    }

    #[test]
    fn test_mapping_error_conversion() {
        let mapping_err = MappingError::UnknownWard(WardId::new(52));
        let err: MedBundleError = mapping_err.into();
        assert!(matches!(err, MedBundleError::Mapping(_)));
        assert_eq!(err.to_string(), "Mapping error: Unknown ward: 52");
    }

    #[test]
    fn test_bundle_error_display() {
        let err = BundleError::DanglingReference {
            from: "Observation urn:uuid:a".to_string(),
            reference: "urn:uuid:b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Dangling reference from Observation urn:uuid:a to urn:uuid:b"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: MedBundleError = io_err.into();
        assert!(matches!(err, MedBundleError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: MedBundleError = json_err.into();
        assert!(matches!(err, MedBundleError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: MedBundleError = toml_err.into();
        assert!(matches!(err, MedBundleError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let _: &dyn std::error::Error = &MedBundleError::Validation("x".to_string());
        let _: &dyn std::error::Error = &SourceError::ConnectionFailed("x".to_string());
        let _: &dyn std::error::Error = &MappingError::UnknownWard(WardId::new(1));
    }
}
