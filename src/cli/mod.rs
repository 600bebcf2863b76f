//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for MedBundle using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// MedBundle - per-patient FHIR transaction bundles from MIMIC-III
#[derive(Parser, Debug)]
#[command(name = "medbundle")]
#[command(version, about, long_about = None)]
#[command(author = "MedBundle Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "medbundle.toml", env = "MEDBUNDLE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MEDBUNDLE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble one bundle per patient and write them to the output directory
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
