//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the MedBundle configuration file.

use crate::config::load_config;
use crate::config::schema::SourceKind;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// [`load_config`] already validates, so any error here is reported as a
    /// configuration error.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);

        match config.source {
            SourceKind::PostgreSQL => {
                if let Some(ref pg_config) = config.postgresql {
                    println!("  Source: PostgreSQL");
                    println!(
                        "  Connection: {}",
                        pg_config.connection_string.expose_secret().redacted_url()
                    );
                    println!("  Schema: {}", pg_config.schema);
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
            SourceKind::Fixture => {
                if let Some(ref fixture) = config.fixture {
                    println!("  Source: Fixture");
                    println!("  Dataset: {}", fixture.path);
                }
            }
        }

        println!("  Output Directory: {}", config.export.output_dir);
        println!("  Workers: {}", config.export.workers);
        println!("  Id Strategy: {}", config.export.id_strategy);
        match &config.export.patient_ids {
            Some(ids) => println!("  Patients: {ids:?}"),
            None => println!("  Patients: All"),
        }
        if let Some(limit) = config.export.limit {
            println!("  Limit: {limit}");
        }
        println!();
        Ok(0)
    }
}
