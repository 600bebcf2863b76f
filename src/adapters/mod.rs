//! External system integrations for MedBundle.
//!
//! - [`source`] - the [`ClinicalDataSource`] trait and its factory
//! - [`postgresql`] - MIMIC-III over PostgreSQL
//! - [`fixture`] - JSON datasets held in memory
//!
//! # Design Pattern
//!
//! Adapters isolate storage from the assembly core. The engine only sees the
//! trait, so tests run against [`FixtureSource`] and production runs against
//! [`PostgresSource`] without any change to the core.
//!
//! ```rust,no_run
//! use medbundle::adapters::{create_data_source, ClinicalDataSource};
//! use medbundle::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("medbundle.toml")?;
//! let source = create_data_source(&config).await?;
//! let ids = source.list_patient_ids().await?;
//! println!("{} patients in {}", ids.len(), source.name());
//! # Ok(())
//! # }
//! ```

pub mod fixture;
pub mod postgresql;
pub mod source;

pub use fixture::FixtureSource;
pub use postgresql::{PostgreSQLClient, PostgresSource};
pub use source::{create_data_source, ClinicalDataSource};
