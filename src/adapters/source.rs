//! Clinical data source abstraction
//!
//! The assembly engine reads patients through [`ClinicalDataSource`] and never
//! sees the storage behind it. The factory picks the implementation named by
//! the `source` key of the configuration.

use crate::adapters::fixture::FixtureSource;
use crate::adapters::postgresql::{PostgreSQLClient, PostgresSource};
use crate::config::schema::{MedBundleConfig, SourceKind};
use crate::domain::errors::MedBundleError;
use crate::domain::ids::{CaregiverId, PatientId, WardId};
use crate::domain::records::{CaregiverRecord, PatientRecord, WardRecord};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Read access to the relational clinical record store
///
/// Implementations must be shareable across worker tasks. A missing patient is
/// `Ok(None)`; errors are reserved for the source itself failing.
#[async_trait]
pub trait ClinicalDataSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Verify the source is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    /// All patient row ids, in source order
    async fn list_patient_ids(&self) -> Result<Vec<PatientId>>;

    /// Load one patient with every admission and the admissions' child records
    async fn load_patient(&self, id: PatientId) -> Result<Option<PatientRecord>>;

    /// All caregivers, keyed by id
    async fn preload_caregivers(&self) -> Result<HashMap<CaregiverId, CaregiverRecord>>;

    /// All wards, keyed by id
    async fn preload_wards(&self) -> Result<HashMap<WardId, WardRecord>>;
}

/// Create the data source selected by the configuration
///
/// # Errors
///
/// Returns a configuration error if the selected source has no settings
/// section, or the source's own error if it cannot be opened.
pub async fn create_data_source(config: &MedBundleConfig) -> Result<Arc<dyn ClinicalDataSource>> {
    match config.source {
        SourceKind::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                MedBundleError::Configuration(
                    "postgresql configuration is required when source = 'postgresql'".to_string(),
                )
            })?;

            tracing::info!(schema = %pg_config.schema, "Creating PostgreSQL source");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Ok(Arc::new(PostgresSource::new(client)) as Arc<dyn ClinicalDataSource>)
        }
        SourceKind::Fixture => {
            let fixture_config = config.fixture.as_ref().ok_or_else(|| {
                MedBundleError::Configuration(
                    "fixture configuration is required when source = 'fixture'".to_string(),
                )
            })?;

            tracing::info!(path = %fixture_config.path, "Loading fixture source");
            let source = FixtureSource::from_path(&fixture_config.path).await?;
            Ok(Arc::new(source) as Arc<dyn ClinicalDataSource>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FixtureConfig, PostgreSQLConfig};
    use crate::config::secret_string;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture_config(path: &str) -> MedBundleConfig {
        MedBundleConfig {
            application: Default::default(),
            source: SourceKind::Fixture,
            postgresql: None,
            fixture: Some(FixtureConfig {
                path: path.to_string(),
            }),
            export: Default::default(),
            logging: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_create_fixture_source() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"patients": [{"row_id": 3, "subject_id": 30}]}"#)
            .unwrap();
        file.flush().unwrap();

        let config = fixture_config(file.path().to_str().unwrap());
        let source = create_data_source(&config).await.unwrap();

        assert_eq!(source.name(), "fixture");
        assert_eq!(source.list_patient_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_source_without_section() {
        let mut config = fixture_config("unused.json");
        config.fixture = None;

        let result = create_data_source(&config).await;
        assert!(matches!(result, Err(MedBundleError::Configuration(_))));

        config.source = SourceKind::PostgreSQL;
        config.postgresql = None;
        let result = create_data_source(&config).await;
        assert!(matches!(result, Err(MedBundleError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_create_postgres_source_builds_pool_lazily() {
        let mut config = fixture_config("unused.json");
        config.source = SourceKind::PostgreSQL;
        config.postgresql = Some(PostgreSQLConfig {
            connection_string: secret_string("postgresql://mimic:pw@localhost:5432/mimic".into()),
            schema: "mimiciii".to_string(),
            max_connections: 2,
            connection_timeout_seconds: 1,
            statement_timeout_seconds: 5,
        });

        let source = create_data_source(&config).await.unwrap();
        assert_eq!(source.name(), "postgresql");
    }
}
