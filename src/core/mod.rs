//! Core business logic for MedBundle.
//!
//! This module contains the document assembly engine and the export
//! orchestration around it.
//!
//! # Modules
//!
//! - [`queue`] - Shared queue of patient ids
//! - [`cache`] - Per-document reference caches
//! - [`bundle`] - Bundle assembly with conditional and unconditional adds
//! - [`mapping`] - Source record to resource mapping
//! - [`assembly`] - Per-patient assembly state machine
//! - [`export`] - Worker pool, sinks and reporting
//!
//! # Export Workflow
//!
//! 1. **Seed**: Put the requested patient ids on the work queue
//! 2. **Preload**: Read caregivers and wards once, create the facility
//! 3. **Assemble**: Each worker takes ids and builds one bundle per patient
//! 4. **Write**: Hand each finished document to the sink
//! 5. **Report**: Merge worker summaries
//!
//! # Example
//!
//! ```rust,no_run
//! use medbundle::config::load_config;
//! use medbundle::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration
//! let config = load_config("medbundle.toml")?;
//!
//! // Create shutdown signal
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! // Create export coordinator
//! let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//!
//! // Execute export
//! let summary = coordinator.execute_export().await?;
//!
//! println!("Written: {}", summary.documents_written);
//! println!("Not found: {}", summary.not_found);
//! println!("Failed: {}", summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod assembly;
pub mod bundle;
pub mod cache;
pub mod export;
pub mod mapping;
pub mod queue;
