// src/storage/mod.rs
use crate::pipeline::result::FilingResult;
use crate::utils::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// `<base>/<ENTITY>/<year>/`, created if missing.
    pub fn filing_dir(&self, result: &FilingResult) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(entity_key(result)).join(year_key(result));
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    /// Writes the full result (statements, reports, audit trail) as JSON.
    pub fn save_result(&self, result: &FilingResult) -> Result<PathBuf, StorageError> {
        let file_path = self
            .filing_dir(result)?
            .join(format!("{}_{}_statements.json", entity_key(result), year_key(result)));

        let body = serde_json::to_string_pretty(result).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, body).map_err(StorageError::IoError)?;

        tracing::info!("Saved statements to {}", file_path.display());
        Ok(file_path)
    }

    /// Writes a short summary of the run in JSON format
    pub fn save_metadata(&self, result: &FilingResult) -> Result<PathBuf, StorageError> {
        let file_path = self
            .filing_dir(result)?
            .join(format!("{}_{}_meta.json", entity_key(result), year_key(result)));

        let identity = &result.identity;
        let metadata = serde_json::json!({
            "company_name": identity.company_name(),
            "entity_id": identity.entity_id(),
            "form_type": identity.form_type(),
            "fiscal_year": identity.fiscal_year(),
            "source_document": identity.source_document(),
            "primary_year": result.primary_year,
            "stats": result.stats,
            "section_failures": result.section_failures,
            "failed_checks": result.failed_checks(),
            "linkage_advisories": result.linkage.as_ref().map(|l| l.advisories.clone()).unwrap_or_default(),
            "reclassifications": result.reclassifications.len(),
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str =
            serde_json::to_string_pretty(&metadata).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}

fn entity_key(result: &FilingResult) -> String {
    result.identity.entity_id().trim().to_uppercase().replace(['/', '\\', ' '], "_")
}

fn year_key(result: &FilingResult) -> String {
    result
        .primary_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
