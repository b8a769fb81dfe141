//! Standard scaler loaded from `scaler.json`: `(x - mean) / scale` per column.

use serde::{Deserialize, Serialize};

use crate::ports::{FeatureScaler, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// # Errors
    /// Returns error if the parameter vectors disagree in length or hold
    /// non-finite values.
    pub fn new(
        mean: Vec<f64>,
        scale: Vec<f64>,
        feature_names: Option<Vec<String>>,
    ) -> Result<Self, String> {
        let scaler = Self {
            feature_names,
            mean,
            scale,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Sanity checks for a deserialized scaler.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.mean.len();
        if n == 0 {
            return Err("scaler has no columns".into());
        }
        if self.scale.len() != n {
            return Err(format!(
                "mean has {n} entries but scale has {}",
                self.scale.len()
            ));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != n {
                return Err(format!(
                    "feature_names has {} entries but mean has {n}",
                    names.len()
                ));
            }
        }
        if let Some(i) = self
            .mean
            .iter()
            .chain(&self.scale)
            .position(|v| !v.is_finite())
        {
            return Err(format!("non-finite parameter at index {}", i % n));
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.mean.len() {
            return Err(ModelError::FeatureCount {
                expected: self.mean.len(),
                got: row.len(),
            });
        }

        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(index, (x, (mean, scale)))| {
                // Constant columns were fitted with scale 0; they only get centred.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                let v = (x - mean) / scale;
                if v.is_finite() {
                    Ok(v)
                } else {
                    Err(ModelError::NonFinite { index })
                }
            })
            .collect()
    }
}
