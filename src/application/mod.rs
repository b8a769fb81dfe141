//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the prediction use case.

mod pipeline;
mod prediction;

pub use pipeline::{
    complete_fields, encode_categoricals, infer, normalize, PipelineError, Stage,
};
pub use prediction::{ModelArtifacts, PipelineRun, PredictionService};
