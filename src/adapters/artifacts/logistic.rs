//! Logistic-regression classifier loaded from `heart_model.json`.

use serde::{Deserialize, Serialize};

use crate::ports::{Classifier, ModelError};

/// Only classifier kind this adapter understands.
pub const LOGISTIC_REGRESSION: &str = "logistic_regression";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub kind: String,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    /// # Errors
    /// Returns error if the parameters are inconsistent.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, String> {
        let model = Self {
            kind: LOGISTIC_REGRESSION.to_string(),
            feature_names: None,
            coefficients,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    /// Sanity checks for a deserialized model.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.kind != LOGISTIC_REGRESSION {
            return Err(format!(
                "unsupported classifier kind '{}' (expected '{LOGISTIC_REGRESSION}')",
                self.kind
            ));
        }
        if self.coefficients.is_empty() {
            return Err("classifier has no coefficients".into());
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.coefficients.len() {
                return Err(format!(
                    "feature_names has {} entries but coefficients has {}",
                    names.len(),
                    self.coefficients.len()
                ));
            }
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("classifier parameters must be finite".into());
        }
        Ok(())
    }

    fn decision_function(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Numerically stable logistic function.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticModel {
    fn name(&self) -> &str {
        LOGISTIC_REGRESSION
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
        if row.len() != self.coefficients.len() {
            return Err(ModelError::FeatureCount {
                expected: self.coefficients.len(),
                got: row.len(),
            });
        }
        if let Some(index) = row.iter().position(|x| !x.is_finite()) {
            return Err(ModelError::NonFinite { index });
        }

        let p1 = sigmoid(self.decision_function(row));
        Ok([1.0 - p1, p1])
    }
}
