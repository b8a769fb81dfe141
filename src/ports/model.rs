//! Model ports: Traits for the pre-fit artifacts.
//!
//! The encoder, scaler and classifier are produced elsewhere and treated as
//! black boxes. These traits are the only surface the pipeline sees.

/// Error returned by a scaler or classifier rejecting its input row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("non-finite value produced for feature {index}")]
    NonFinite { index: usize },

    #[error("{0}")]
    Invalid(String),
}

/// Maps categorical answers to the integer codes assigned at fit time.
pub trait CategoricalEncoder: Send + Sync {
    /// Look up the fitted code for `value` in `field`'s vocabulary.
    ///
    /// Returns `None` if the value (or the field) was never seen during fitting.
    fn encode(&self, field: &str, value: &str) -> Option<i64>;

    /// The fitted vocabulary for `field`, in code order, if known.
    fn vocabulary(&self, field: &str) -> Option<&[String]>;
}

/// Pre-fit per-column rescaling.
pub trait FeatureScaler: Send + Sync {
    /// Number of columns the scaler was fitted on.
    fn n_features(&self) -> usize;

    /// Column names seen at fit time, when the artifact recorded them.
    fn feature_names(&self) -> Option<&[String]>;

    /// Rescale one row.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` if the row width is wrong.
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// Binary classifier over the rescaled row.
pub trait Classifier: Send + Sync {
    /// Short identifier for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Number of columns the classifier was fitted on.
    fn n_features(&self) -> usize;

    /// Column names seen at fit time, when the artifact recorded them.
    fn feature_names(&self) -> Option<&[String]>;

    /// `[P(class 0), P(class 1)]` for one row.
    ///
    /// # Errors
    /// Returns error if the row is rejected.
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError>;

    /// Predicted class: the argmax of [`Classifier::predict_proba`], ties to 0.
    ///
    /// # Errors
    /// Returns error if the row is rejected.
    fn predict(&self, row: &[f64]) -> Result<u8, ModelError> {
        let [p0, p1] = self.predict_proba(row)?;
        Ok(u8::from(p1 > p0))
    }
}
