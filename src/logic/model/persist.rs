//! Model Persistence
//!
//! A model file is a JSON envelope holding the payload (metadata, schema,
//! reducer and regressor state) next to the SHA-256 of the payload text. The
//! payload is kept as a raw JSON fragment so the hashed bytes are exactly the
//! bytes on disk. Loading refuses files whose checksum or schema hash does not
//! match.

use std::fs;
use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::estimator::Estimator;
use super::exploitability::ExploitabilityModel;
use super::reduction::Pca;
use super::regressor::Regressor;
use crate::logic::error::{Error, Result};
use crate::logic::features::FeatureSchema;

/// Bumped on incompatible payload changes
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub format_version: u32,
    pub model_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub app_version: String,
    pub schema_hash: u32,
    pub feature_count: usize,
    pub target_window_days: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelPayload {
    metadata: ModelMetadata,
    schema: FeatureSchema,
    reducer: Option<Pca>,
    estimator: Estimator,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    payload: Box<RawValue>,
    checksum: String,
}

/// Hex SHA-256 of the payload text
fn payload_checksum(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

impl ExploitabilityModel {
    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            format_version: FORMAT_VERSION,
            model_id: self.id,
            created_at: self.created_at,
            app_version: crate::constants::APP_VERSION.to_string(),
            schema_hash: self.schema.hash(),
            feature_count: self.schema.len(),
            target_window_days: self.target_window_days,
        }
    }

    pub fn save(&self, path: &Path) -> Result<ModelMetadata> {
        if !self.is_fitted() {
            return Err(Error::Validation("refusing to save an unfitted model".into()));
        }

        let metadata = self.metadata();
        let text = serde_json::to_string(&ModelPayload {
            metadata: metadata.clone(),
            schema: self.schema.clone(),
            reducer: self.reducer.clone(),
            estimator: self.estimator.clone(),
        })?;
        let checksum = payload_checksum(&text);
        let payload = RawValue::from_string(text)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&ModelFile { payload, checksum })?;
        fs::write(path, json)?;

        log::info!(
            "Saved {} model {} to {:?} ({} features)",
            self.kind(),
            metadata.model_id,
            path,
            metadata.feature_count
        );
        Ok(metadata)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let file: ModelFile = serde_json::from_str(&content)?;

        if payload_checksum(file.payload.get()) != file.checksum {
            return Err(Error::Checksum(path.display().to_string()));
        }

        let payload: ModelPayload = serde_json::from_str(file.payload.get())?;
        let metadata = payload.metadata;
        if metadata.format_version != FORMAT_VERSION {
            return Err(Error::Validation(format!(
                "unsupported model format version {} (expected {})",
                metadata.format_version, FORMAT_VERSION
            )));
        }
        payload.schema.validate(metadata.schema_hash)?;

        if let Some(pca) = &payload.reducer {
            if pca.input_dim() != payload.schema.len() {
                return Err(Error::Validation(format!(
                    "reducer expects {} features, schema has {}",
                    pca.input_dim(),
                    payload.schema.len()
                )));
            }
        }

        log::info!(
            "Loaded model {} from {:?} ({} features, schema {:08x})",
            metadata.model_id,
            path,
            payload.schema.len(),
            metadata.schema_hash
        );

        Ok(Self {
            id: metadata.model_id,
            created_at: metadata.created_at,
            schema: payload.schema,
            reducer: payload.reducer,
            estimator: payload.estimator,
            target_window_days: metadata.target_window_days,
        })
    }
}
