// MedBundle - MIMIC-III to FHIR transaction bundles
// Copyright (c) 2025 MedBundle Contributors
// Licensed under the MIT License

//! # MedBundle - MIMIC-III to FHIR transaction bundles
//!
//! MedBundle reads patients from a MIMIC-III database and writes one FHIR R4
//! transaction bundle per patient, with every cross-reference resolved inside
//! the bundle.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Reading** patients, admissions and their child tables from a source
//! - **Mapping** source rows to typed FHIR resources
//! - **Assembling** one self-consistent bundle per patient, deduplicating
//!   shared resources (wards, caregivers, medications) with per-document caches
//! - **Exporting** bundles concurrently from a shared work queue
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Work queue, caches, bundle assembly, mapping, export
//! - [`adapters`] - Data sources (PostgreSQL, JSON fixture)
//! - [`domain`] - Identifiers, source records, resources, errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medbundle::config::load_config;
//! use medbundle::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("medbundle.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//!     let summary = coordinator.execute_export().await?;
//!
//!     println!("Wrote {} documents", summary.documents_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Assembling a Single Patient
//!
//! ```rust,no_run
//! use medbundle::adapters::FixtureSource;
//! use medbundle::core::assembly::{PatientAssemblyEngine, ReferenceData};
//! use medbundle::core::bundle::IdStrategy;
//! use medbundle::core::mapping::MimicMapper;
//! use medbundle::domain::PatientId;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FixtureSource::from_path("data/mimic_sample.json").await?;
//! let mapper = MimicMapper::new();
//! let reference = Arc::new(ReferenceData::load(&source, &mapper).await?);
//!
//! let mut engine = PatientAssemblyEngine::new(mapper, reference, IdStrategy::Uuid);
//! if let Some(document) = engine.assemble(PatientId::new(1)?, &source).await? {
//!     println!("{} resources", document.resources());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The library returns [`domain::MedBundleError`]; the binary wraps it in
//! `anyhow` and maps failures to exit codes.
//!
//! ## Logging
//!
//! MedBundle uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(patient_id = 42, "Assembling patient");
//! warn!(ward_id = 7, "Unknown ward");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
