//! Prediction result types.
//!
//! Represents the classifier output for one survey submission.

use serde::{Deserialize, Serialize};

/// Risk band shown next to the predicted percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low risk of heart disease
    Low,
    /// Moderate risk, monitoring recommended
    Moderate,
    /// High risk, consultation recommended
    High,
}

impl RiskLevel {
    /// Band for a positive-class probability in `[0, 1]`.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.3 {
            Self::Low
        } else if probability < 0.7 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - No significant indicators",
            Self::Moderate => "Moderate risk - Follow-up recommended",
            Self::High => "High risk - Consultation with a clinician advised",
        }
    }

    /// Associated display color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (16, 185, 129),      // Emerald (#10B981)
            Self::Moderate => (251, 191, 36), // Amber (#FBBF24)
            Self::High => (244, 63, 94),      // Rose (#F43F5E)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Classifier output for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Binary prediction (0 = no heart disease, 1 = heart disease)
    pub prediction: u8,

    /// `[P(negative), P(positive)]`
    pub probabilities: [f64; 2],

    /// When the prediction was computed
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionResult {
    /// Create a result from the classifier's class and probability pair.
    #[must_use]
    pub fn new(prediction: u8, probabilities: [f64; 2]) -> Self {
        Self {
            prediction,
            probabilities,
            created_at: chrono::Utc::now(),
        }
    }

    /// Create a result whose class is the argmax of the pair (ties go to 0).
    #[must_use]
    pub fn from_probabilities(probabilities: [f64; 2]) -> Self {
        let prediction = u8::from(probabilities[1] > probabilities[0]);
        Self::new(prediction, probabilities)
    }

    /// Probability of heart disease, in percent.
    #[must_use]
    pub fn positive_percent(&self) -> f64 {
        self.probabilities[1] * 100.0
    }

    /// Probability of no heart disease, in percent.
    #[must_use]
    pub fn negative_percent(&self) -> f64 {
        self.probabilities[0] * 100.0
    }

    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_probability(self.probabilities[1])
    }
}
