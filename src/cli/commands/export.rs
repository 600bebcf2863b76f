//! Export command implementation
//!
//! This module implements the `export` command, which assembles one FHIR
//! transaction bundle per patient and writes it to the output directory.

use crate::config::{load_config, MedBundleConfig};
use crate::core::export::ExportCoordinator;
use crate::domain::errors::MedBundleError;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Dry run mode - assemble documents without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Only export these patient(s) (comma-separated source row ids)
    #[arg(long)]
    pub patient_id: Option<String>,

    /// Stop after this many patients
    #[arg(long)]
    pub limit: Option<usize>,

    /// Override the output directory
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Override the number of assembly workers
    #[arg(long)]
    pub workers: Option<usize>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        // CLI flags win over the file; validate again afterwards
        if let Err(e) = self.apply_overrides(&mut config).and_then(|()| config.validate()) {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if config.application.dry_run {
            tracing::info!("Dry run mode enabled - no documents will be written");
            println!("🔍 DRY RUN MODE - No documents will be written");
            println!();
        }

        tracing::info!("Creating export coordinator");
        let coordinator = match ExportCoordinator::new(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(match e {
                    MedBundleError::Configuration(_) => 2,
                    _ => 4,
                });
            }
        };

        println!("🚀 Starting export...");
        println!();

        let summary = match coordinator.execute_export().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(match e {
                    MedBundleError::Configuration(_) => 2,
                    MedBundleError::Source(_) | MedBundleError::Database(_) => 4,
                    _ => 5,
                });
            }
        };

        println!();
        println!("📊 Export Summary:");
        println!("  Patients Queued: {}", summary.patients_queued);
        println!("  Patients Processed: {}", summary.patients_taken);
        println!("  Documents Written: {}", summary.documents_written);
        println!("  Not Found: {}", summary.not_found);
        println!("  Failed: {}", summary.failed);
        println!("  Resources: {}", summary.resources_written);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!("  Success Rate: {:.2}%", summary.success_rate());
        println!();

        if !summary.errors.is_empty() {
            println!("⚠️  Errors encountered:");
            for error in summary.errors.iter().take(20) {
                println!("  - {:?}: {}", error.error_type, error.message);
                if let Some(context) = &error.context {
                    println!("    Context: {context}");
                }
            }
            if summary.errors.len() > 20 {
                println!("  ... and {} more errors", summary.errors.len() - 20);
            }
            println!();
        }

        let exit_code = if summary.interrupted {
            println!("⚠️  Export interrupted. Patients not yet taken were skipped.");
            tracing::info!("Export interrupted by user signal");
            130
        } else if summary.failed > 0 {
            println!("⚠️  Export completed with failures");
            1
        } else {
            println!("✅ Export completed successfully!");
            0
        };

        Ok(exit_code)
    }

    /// Fold the command-line overrides into the loaded configuration
    fn apply_overrides(&self, config: &mut MedBundleConfig) -> Result<(), String> {
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Some(raw) = &self.patient_id {
            let ids = parse_patient_ids(raw)?;
            tracing::info!(patient_ids = ?ids, "Overriding patient ids from CLI");
            config.export.patient_ids = Some(ids);
        }

        if let Some(limit) = self.limit {
            tracing::info!(limit, "Overriding patient limit from CLI");
            config.export.limit = Some(limit);
        }

        if let Some(dir) = &self.output_dir {
            tracing::info!(output_dir = %dir, "Overriding output directory from CLI");
            config.export.output_dir = dir.clone();
        }

        if let Some(workers) = self.workers {
            tracing::info!(workers, "Overriding worker count from CLI");
            config.export.workers = workers;
        }

        Ok(())
    }
}

fn parse_patient_ids(raw: &str) -> Result<Vec<i64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| format!("Invalid patient id '{s}'"))
        })
        .collect()
}
