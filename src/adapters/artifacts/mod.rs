//! Artifact adapter: loads the pre-trained model bundle from disk.
//!
//! A model directory holds four JSON artifacts exported by the training
//! pipeline, plus an optional integrity manifest:
//!
//! - `feature_names.json`: ordered schema column list
//! - `label_encoder.json`: fitted categorical vocabularies
//! - `scaler.json`: fitted standard scaler
//! - `heart_model.json`: fitted classifier
//! - `manifest.json`: `{"version": 1, "files": {name: sha256-hex}}`
//!
//! # Failure model
//!
//! Everything here runs once at startup. Any missing, malformed or mutually
//! inconsistent artifact is a fatal [`ArtifactError`]; nothing is re-read per
//! request.

mod encoder;
mod logistic;
mod scaler;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::application::ModelArtifacts;
use crate::domain::schema::{categorical_columns, SURVEY_FIELDS};
use crate::domain::{DefaultTable, FeatureSchema, SchemaError};
use crate::ports::{Classifier, FeatureScaler};

pub use encoder::{ExportedLabelEncoder, LabelEncoder};
pub use logistic::{LogisticModel, LOGISTIC_REGRESSION};
pub use scaler::StandardScaler;

pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const ENCODER_FILE: &str = "label_encoder.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const CLASSIFIER_FILE: &str = "heart_model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Error type for artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Required artifact not found: {0:?}")]
    Missing(PathBuf),

    #[error("Failed to read artifact {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact {path:?}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Invalid feature schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Artifacts disagree: {0}")]
    Inconsistent(String),

    #[error("Integrity check failed for {file}: {message}")]
    Integrity { file: String, message: String },
}

/// Options controlling how strictly a model directory is checked.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Refuse to start without a `manifest.json` binding every artifact.
    pub require_manifest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn malformed(path: &Path, message: String) -> ArtifactError {
    ArtifactError::Malformed {
        path: path.to_path_buf(),
        message,
    }
}

/// Verify `manifest.json` against the files it lists.
///
/// Returns the number of files checked, or `None` when no manifest exists and
/// none is required.
fn verify_manifest(dir: &Path, options: &LoadOptions) -> Result<Option<usize>, ArtifactError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        if options.require_manifest {
            return Err(ArtifactError::Missing(manifest_path));
        }
        tracing::warn!(
            "No {MANIFEST_FILE} in {:?}; artifacts are loaded without integrity check",
            dir
        );
        return Ok(None);
    }

    let manifest: ArtifactManifest = read_json(&manifest_path)?;
    if manifest.version != 1 {
        return Err(malformed(
            &manifest_path,
            format!("unsupported manifest version {}", manifest.version),
        ));
    }
    if manifest.files.is_empty() {
        return Err(malformed(&manifest_path, "manifest lists no files".into()));
    }

    for required in [FEATURE_NAMES_FILE, ENCODER_FILE, SCALER_FILE, CLASSIFIER_FILE] {
        if !manifest.files.contains_key(required) {
            return Err(ArtifactError::Integrity {
                file: required.to_string(),
                message: "not bound by manifest".into(),
            });
        }
    }

    for (rel, expected) in &manifest.files {
        let bytes = read_bytes(&dir.join(rel))?;
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(ArtifactError::Integrity {
                file: rel.clone(),
                message: "sha256 mismatch".into(),
            });
        }
    }

    Ok(Some(manifest.files.len()))
}

fn check_names(
    artifact: &str,
    schema: &FeatureSchema,
    width: usize,
    names: Option<&[String]>,
) -> Result<(), ArtifactError> {
    if width != schema.len() {
        return Err(ArtifactError::Inconsistent(format!(
            "{artifact} expects {width} features but the schema has {}",
            schema.len()
        )));
    }
    if let Some(names) = names {
        if let Some(i) = names.iter().zip(schema.names()).position(|(a, b)| a != b) {
            return Err(ArtifactError::Inconsistent(format!(
                "{artifact} column {i} is '{}' but the schema has '{}'",
                names[i],
                schema.names()[i]
            )));
        }
    }
    Ok(())
}

/// Cross-check scaler and classifier against the schema.
///
/// # Errors
/// Returns `ArtifactError::Inconsistent` naming the first disagreement.
pub fn check_consistency(
    schema: &FeatureSchema,
    scaler: &dyn FeatureScaler,
    classifier: &dyn Classifier,
) -> Result<(), ArtifactError> {
    check_names("scaler", schema, scaler.n_features(), scaler.feature_names())?;
    check_names(
        "classifier",
        schema,
        classifier.n_features(),
        classifier.feature_names(),
    )
}

/// Load and cross-check the full artifact bundle from `dir`.
///
/// # Errors
/// Returns error if any artifact is missing, malformed, fails its integrity
/// check or disagrees with the schema.
pub fn load_model_dir(dir: &Path, options: &LoadOptions) -> Result<ModelArtifacts, ArtifactError> {
    if !dir.is_dir() {
        return Err(ArtifactError::Missing(dir.to_path_buf()));
    }

    let verified = verify_manifest(dir, options)?;

    let names: Vec<String> = read_json(&dir.join(FEATURE_NAMES_FILE))?;
    let schema = FeatureSchema::new(names)?;

    let encoder_path = dir.join(ENCODER_FILE);
    let exported: ExportedLabelEncoder = read_json(&encoder_path)?;
    let encoder = LabelEncoder::from_exported(exported).map_err(|e| malformed(&encoder_path, e))?;

    let scaler_path = dir.join(SCALER_FILE);
    let scaler: StandardScaler = read_json(&scaler_path)?;
    scaler.validate().map_err(|e| malformed(&scaler_path, e))?;

    let classifier_path = dir.join(CLASSIFIER_FILE);
    let classifier: LogisticModel = read_json(&classifier_path)?;
    classifier
        .validate()
        .map_err(|e| malformed(&classifier_path, e))?;

    check_consistency(&schema, &scaler, &classifier)?;

    let defaults = DefaultTable::standard();
    let zero_filled: Vec<&str> = schema
        .names()
        .iter()
        .map(String::as_str)
        .filter(|n| defaults.get(n).is_none() && !SURVEY_FIELDS.iter().any(|f| f.name == *n))
        .collect();
    if !zero_filled.is_empty() {
        tracing::warn!(
            "Schema fields with neither survey question nor default will be zero-filled: {}",
            zero_filled.join(", ")
        );
    }

    tracing::info!(
        "Loaded model artifacts from {:?} (features={}, classifier={}, manifest_files={})",
        dir,
        schema.len(),
        classifier.name(),
        verified.map_or_else(|| "none".to_string(), |n| n.to_string())
    );

    Ok(ModelArtifacts::new(
        schema,
        defaults,
        categorical_columns(),
        Arc::new(encoder),
        Arc::new(scaler),
        Arc::new(classifier),
    ))
}
