//! Destinations for finished documents

use crate::core::assembly::AssembledDocument;
use crate::domain::errors::MedBundleError;
use crate::domain::ids::PatientId;
use crate::domain::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Receives one serialized document per assembled patient
#[async_trait]
pub trait BundleSink: Send + Sync {
    /// Persist a document
    ///
    /// # Errors
    ///
    /// Returns [`MedBundleError::Output`] if the document cannot be stored.
    async fn write(&self, document: &AssembledDocument) -> Result<()>;

    /// Human-readable destination for logs
    fn describe(&self) -> String;
}

/// Writes `patient_<id>.json` files into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Use `dir` as the output directory, creating it if missing
    pub async fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            MedBundleError::Output(format!(
                "Failed to create output directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    /// File a patient's document is written to
    pub fn path_for(&self, patient_id: PatientId) -> PathBuf {
        self.dir.join(format!("patient_{patient_id}.json"))
    }
}

#[async_trait]
impl BundleSink for DirectorySink {
    async fn write(&self, document: &AssembledDocument) -> Result<()> {
        let path = self.path_for(document.patient_id);
        tokio::fs::write(&path, document.json.as_bytes())
            .await
            .map_err(|e| {
                MedBundleError::Output(format!("Failed to write {}: {e}", path.display()))
            })?;

        tracing::debug!(
            patient_id = %document.patient_id,
            path = %path.display(),
            bytes = document.json.len(),
            "Document written"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Discards documents; used for dry runs
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSink;

#[async_trait]
impl BundleSink for DryRunSink {
    async fn write(&self, document: &AssembledDocument) -> Result<()> {
        tracing::debug!(
            patient_id = %document.patient_id,
            resources = document.resources(),
            "Dry run: document not written"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "dry run (no output)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::Bundle;
    use tempfile::TempDir;

    fn document(id: i64) -> AssembledDocument {
        AssembledDocument {
            patient_id: PatientId::new(id).unwrap(),
            bundle: Bundle::default(),
            json: format!("{{\"resourceType\":\"Bundle\",\"id\":{id}}}"),
        }
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let temp = TempDir::new().unwrap();
        let sink = DirectorySink::create(temp.path().join("bundles"))
            .await
            .unwrap();

        sink.write(&document(17)).await.unwrap();

        let path = sink.path_for(PatientId::new(17).unwrap());
        assert!(path.ends_with("patient_17.json"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("\"id\":17"));
    }

    #[tokio::test]
    async fn test_directory_sink_overwrites() {
        let temp = TempDir::new().unwrap();
        let sink = DirectorySink::create(temp.path()).await.unwrap();

        sink.write(&document(1)).await.unwrap();
        let mut second = document(1);
        second.json = "{}".to_string();
        sink.write(&second).await.unwrap();

        let written = std::fs::read_to_string(sink.path_for(PatientId::new(1).unwrap())).unwrap();
        assert_eq!(written, "{}");
    }

    #[tokio::test]
    async fn test_dry_run_sink_writes_nothing() {
        let sink = DryRunSink;
        sink.write(&document(2)).await.unwrap();
        assert!(sink.describe().contains("dry run"));
    }
}
