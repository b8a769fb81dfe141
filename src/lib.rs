//! # heartcheck
//!
//! Heart-disease risk survey served as a small web form.
//!
//! A partial survey is completed against a fixed feature schema and default
//! table, categorical answers are label-encoded, the row is rescaled with the
//! pre-fit scaler and the pre-fit classifier produces a risk probability.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (survey answers, schema, pipeline records, results)
//! - `ports`: Traits for the model artifacts and session storage
//! - `adapters`: Concrete implementations (JSON artifacts, memory/SQLite sessions, log redaction)
//! - `application`: The completion, encoding, normalization and inference pipeline
//! - `web`: axum routes and HTML pages

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod web;

pub use application::{PipelineError, PredictionService};
pub use config::Config;
pub use domain::{PredictionResult, RiskLevel, SurveyAnswers};

/// Result type for heartcheck operations
pub type Result<T> = std::result::Result<T, HeartcheckError>;

/// Main error type for heartcheck
#[derive(Debug, thiserror::Error)]
pub enum HeartcheckError {
    #[error("Model artifacts unavailable: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Prediction failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Session storage failed: {0}")]
    Session(#[from] ports::SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
