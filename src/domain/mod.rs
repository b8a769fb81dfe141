//! Domain layer: Core business types and logic.
//!
//! Pure types describing the survey, the feature schema contract, the
//! records passed between pipeline stages and the prediction result.

mod prediction;
mod record;
pub mod schema;
mod session;
mod survey;

pub use prediction::{PredictionResult, RiskLevel};
pub use record::{
    CompletedField, CompletedRecord, EncodedField, EncodedRecord, EncodingOutcome, FieldSource,
    FieldValue, NormalizedVector,
};
pub use schema::{DefaultTable, FeatureSchema, FieldKind, SchemaError, SurveyField};
pub use session::SessionId;
pub use survey::{parse_number, InputError, SurveyAnswers};
