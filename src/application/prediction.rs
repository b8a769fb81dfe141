//! Prediction service: runs one survey submission through the pipeline.
//!
//! This service coordinates:
//! - Field completion against the schema and default table
//! - Categorical encoding
//! - Normalization with the fitted scaler
//! - Classifier inference
//!
//! The artifact bundle is built once at startup and shared read-only.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::pipeline::{complete_fields, encode_categoricals, infer, normalize, PipelineError};
use crate::domain::{
    CompletedRecord, DefaultTable, EncodedRecord, FeatureSchema, NormalizedVector,
    PredictionResult, SurveyAnswers,
};
use crate::ports::{CategoricalEncoder, Classifier, FeatureScaler};

/// Immutable bundle of everything the pipeline needs from training.
pub struct ModelArtifacts {
    schema: FeatureSchema,
    defaults: DefaultTable,
    categorical: BTreeSet<String>,
    encoder: Arc<dyn CategoricalEncoder>,
    scaler: Arc<dyn FeatureScaler>,
    classifier: Arc<dyn Classifier>,
}

impl ModelArtifacts {
    #[must_use]
    pub fn new(
        schema: FeatureSchema,
        defaults: DefaultTable,
        categorical: BTreeSet<String>,
        encoder: Arc<dyn CategoricalEncoder>,
        scaler: Arc<dyn FeatureScaler>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            schema,
            defaults,
            categorical,
            encoder,
            scaler,
            classifier,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub fn defaults(&self) -> &DefaultTable {
        &self.defaults
    }

    #[must_use]
    pub fn categorical(&self) -> &BTreeSet<String> {
        &self.categorical
    }

    #[must_use]
    pub fn encoder(&self) -> &dyn CategoricalEncoder {
        self.encoder.as_ref()
    }

    #[must_use]
    pub fn scaler(&self) -> &dyn FeatureScaler {
        self.scaler.as_ref()
    }

    #[must_use]
    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }
}

impl fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("features", &self.schema.len())
            .field("defaults", &self.defaults.len())
            .field("categorical", &self.categorical.len())
            .field("classifier", &self.classifier.name())
            .finish_non_exhaustive()
    }
}

/// Every intermediate record of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub completed: CompletedRecord,
    pub encoded: EncodedRecord,
    pub normalized: NormalizedVector,
    pub result: PredictionResult,
}

/// Service for turning survey answers into a prediction.
#[derive(Clone)]
pub struct PredictionService {
    artifacts: Arc<ModelArtifacts>,
}

impl PredictionService {
    /// Create a new prediction service over a loaded bundle.
    #[must_use]
    pub fn new(artifacts: Arc<ModelArtifacts>) -> Self {
        Self { artifacts }
    }

    #[must_use]
    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    /// Run the full pipeline, keeping every intermediate record.
    ///
    /// # Errors
    /// Returns error if normalization or inference fails.
    pub fn run(&self, answers: &SurveyAnswers) -> Result<PipelineRun, PipelineError> {
        let a = &self.artifacts;

        let completed = complete_fields(&a.schema, answers, &a.defaults);
        let zero_filled: Vec<&str> = completed.zero_filled().collect();
        if !zero_filled.is_empty() {
            tracing::warn!(
                "Zero-filled {} schema field(s) with no answer or default: {}",
                zero_filled.len(),
                zero_filled.join(", ")
            );
        }

        let encoded = encode_categoricals(&completed, &a.categorical, a.encoder());
        tracing::debug!(
            "Encoded {} fields ({} unknown categorical value(s) coded as 0)",
            encoded.len(),
            encoded.unknown_count()
        );

        let normalized = normalize(&encoded, &a.schema, a.scaler())?;
        let result = infer(&normalized, &a.schema, a.classifier())?;

        tracing::info!(
            "Prediction complete: prediction={}, probability={:.2}%, risk={}",
            result.prediction,
            result.positive_percent(),
            result.risk_level()
        );

        Ok(PipelineRun {
            completed,
            encoded,
            normalized,
            result,
        })
    }

    /// Run the pipeline and return only the result.
    ///
    /// # Errors
    /// Returns error if normalization or inference fails.
    pub fn predict(&self, answers: &SurveyAnswers) -> Result<PredictionResult, PipelineError> {
        self.run(answers).map(|run| run.result)
    }

    /// Coerce raw form fields and run the pipeline.
    ///
    /// # Errors
    /// Returns `PipelineError::Input` for bad form text, or a stage error.
    pub fn predict_form(
        &self,
        form: &HashMap<String, String>,
    ) -> Result<PredictionResult, PipelineError> {
        let answers = SurveyAnswers::from_form(form)?;
        self.predict(&answers)
    }
}
