//! PostgreSQL (MIMIC-III) data source
//!
//! [`PostgreSQLClient`] owns the pool; [`PostgresSource`] issues the MIMIC
//! queries and decodes rows into source records.

pub mod client;
pub mod source;

pub use client::PostgreSQLClient;
pub use source::PostgresSource;
