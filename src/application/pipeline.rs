//! Pipeline stages: Completion -> Encoding -> Normalization -> Inference.
//!
//! Each stage is a free function over the previous stage's record so the
//! stages can be tested in isolation. Only normalization and inference can
//! fail; encoding substitutes the fallback code instead of failing.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::{
    CompletedField, CompletedRecord, DefaultTable, EncodedField, EncodedRecord, EncodingOutcome,
    FeatureSchema, FieldSource, FieldValue, InputError, NormalizedVector, PredictionResult,
    SurveyAnswers,
};
use crate::ports::{CategoricalEncoder, Classifier, FeatureScaler};

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Completion,
    Normalization,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion => write!(f, "completion"),
            Self::Normalization => write!(f, "normalization"),
            Self::Inference => write!(f, "inference"),
        }
    }
}

/// Error surfaced to the submission boundary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },
}

impl PipelineError {
    fn at(stage: Stage, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
        }
    }

    /// The stage that failed. Input coercion belongs to completion.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Input(_) => Stage::Completion,
            Self::Stage { stage, .. } => *stage,
        }
    }

    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

/// Merge user answers, defaults and the zero fill into a schema-ordered row.
///
/// Answers for fields outside the schema are dropped.
#[must_use]
pub fn complete_fields(
    schema: &FeatureSchema,
    answers: &SurveyAnswers,
    defaults: &DefaultTable,
) -> CompletedRecord {
    let fields = schema
        .names()
        .iter()
        .map(|name| {
            let (value, source) = if let Some(value) = answers.get(name) {
                (value.clone(), FieldSource::Supplied)
            } else if let Some(default) = defaults.get(name) {
                (
                    FieldValue::Category(default.to_string()),
                    FieldSource::Defaulted,
                )
            } else {
                (FieldValue::Number(0.0), FieldSource::ZeroFilled)
            };
            CompletedField {
                name: name.clone(),
                value,
                source,
            }
        })
        .collect();

    CompletedRecord::new(fields)
}

/// Replace categorical values with their fitted codes.
///
/// A value the encoder never saw (including a zero-filled number sitting in a
/// categorical column) becomes [`EncodingOutcome::FALLBACK_CODE`].
#[must_use]
pub fn encode_categoricals(
    record: &CompletedRecord,
    categorical: &BTreeSet<String>,
    encoder: &dyn CategoricalEncoder,
) -> EncodedRecord {
    let fields = record
        .fields()
        .iter()
        .map(|field| {
            if !categorical.contains(&field.name) {
                return EncodedField {
                    name: field.name.clone(),
                    value: field.value.clone(),
                    outcome: EncodingOutcome::Numeric,
                };
            }

            let code = field
                .value
                .as_category()
                .and_then(|value| encoder.encode(&field.name, value));
            let (code, outcome) = match code {
                Some(code) => (code, EncodingOutcome::Known(code)),
                None => (EncodingOutcome::FALLBACK_CODE, EncodingOutcome::Unknown),
            };

            EncodedField {
                name: field.name.clone(),
                value: FieldValue::Number(code as f64),
                outcome,
            }
        })
        .collect();

    EncodedRecord::new(fields)
}

fn check_order(
    stage: Stage,
    artifact: &str,
    actual: &[&str],
    expected: &[String],
) -> Result<(), PipelineError> {
    if actual.len() != expected.len() {
        return Err(PipelineError::at(
            stage,
            format!(
                "{artifact} expects {} columns, record has {}",
                expected.len(),
                actual.len()
            ),
        ));
    }
    if let Some(i) = actual.iter().zip(expected).position(|(a, e)| *a != e.as_str()) {
        return Err(PipelineError::at(
            stage,
            format!(
                "column {i} is '{}' but {artifact} expects '{}'",
                actual[i], expected[i]
            ),
        ));
    }
    Ok(())
}

/// Rescale the encoded row in schema order.
///
/// # Errors
/// Returns a normalization-stage error on any column set/order mismatch or a
/// non-numeric value left in the row.
pub fn normalize(
    record: &EncodedRecord,
    schema: &FeatureSchema,
    scaler: &dyn FeatureScaler,
) -> Result<NormalizedVector, PipelineError> {
    let stage = Stage::Normalization;
    let names: Vec<&str> = record.names().collect();

    check_order(stage, "schema", &names, schema.names())?;
    if let Some(expected) = scaler.feature_names() {
        check_order(stage, "scaler", &names, expected)?;
    }

    let row = record.to_row().map_err(|field| {
        PipelineError::at(
            stage,
            format!(
                "could not convert '{}' in column {} to a number",
                field.value, field.name
            ),
        )
    })?;

    let scaled = scaler
        .transform(&row)
        .map_err(|e| PipelineError::at(stage, format!("scaler rejected row: {e}")))?;
    if scaled.len() != schema.len() {
        return Err(PipelineError::at(
            stage,
            format!(
                "scaler returned {} columns, schema has {}",
                scaled.len(),
                schema.len()
            ),
        ));
    }

    Ok(NormalizedVector::new(scaled))
}

/// Run the classifier on the normalized row.
///
/// # Errors
/// Returns an inference-stage error if the classifier rejects the row or
/// returns an unusable probability pair.
pub fn infer(
    vector: &NormalizedVector,
    schema: &FeatureSchema,
    classifier: &dyn Classifier,
) -> Result<PredictionResult, PipelineError> {
    let stage = Stage::Inference;

    if classifier.n_features() != vector.len() {
        return Err(PipelineError::at(
            stage,
            format!(
                "classifier expects {} features, vector has {}",
                classifier.n_features(),
                vector.len()
            ),
        ));
    }
    if let Some(expected) = classifier.feature_names() {
        let names: Vec<&str> = schema.names().iter().map(String::as_str).collect();
        check_order(stage, "classifier", &names, expected)?;
    }

    let probabilities = classifier
        .predict_proba(vector.as_slice())
        .map_err(|e| PipelineError::at(stage, format!("classifier rejected row: {e}")))?;
    if probabilities
        .iter()
        .any(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
    {
        return Err(PipelineError::at(
            stage,
            format!("classifier returned invalid probabilities {probabilities:?}"),
        ));
    }

    let prediction = classifier
        .predict(vector.as_slice())
        .map_err(|e| PipelineError::at(stage, format!("classifier rejected row: {e}")))?;

    Ok(PredictionResult::new(prediction, probabilities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifacts::{LabelEncoder, LogisticModel, StandardScaler};
    use std::collections::BTreeMap;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            "State".into(),
            "Sex".into(),
            "BMI".into(),
            "Unlisted".into(),
        ])
        .expect("valid schema")
    }

    fn categorical() -> BTreeSet<String> {
        ["State", "Sex"].iter().map(|s| (*s).to_string()).collect()
    }

    fn encoder() -> LabelEncoder {
        let mut fields = BTreeMap::new();
        fields.insert("State".to_string(), vec!["Alabama".into(), "Alaska".into()]);
        fields.insert("Sex".to_string(), vec!["Female".into(), "Male".into()]);
        LabelEncoder::per_field(fields).expect("valid encoder")
    }

    fn answers() -> SurveyAnswers {
        SurveyAnswers::from_values([
            ("Sex", FieldValue::Category("Male".into())),
            ("BMI", FieldValue::Number(22.9)),
            ("NotInSchema", FieldValue::Number(1.0)),
        ])
    }

    #[test]
    fn test_completion_three_tier_fallback() {
        let defaults = DefaultTable::from_entries([("State", "Alabama")]);
        let record = complete_fields(&schema(), &answers(), &defaults);

        let sources: Vec<FieldSource> = record.fields().iter().map(|f| f.source).collect();
        assert_eq!(
            sources,
            vec![
                FieldSource::Defaulted,
                FieldSource::Supplied,
                FieldSource::Supplied,
                FieldSource::ZeroFilled
            ]
        );
        assert_eq!(
            record.get("Unlisted").map(|f| f.value.clone()),
            Some(FieldValue::Number(0.0))
        );
        assert!(record.get("NotInSchema").is_none());
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn test_completion_is_deterministic() {
        let defaults = DefaultTable::standard();
        let a = complete_fields(&schema(), &answers(), &defaults);
        let b = complete_fields(&schema(), &answers(), &defaults);
        assert_eq!(a, b);
    }

    #[test]
    fn test_encoding_known_unknown_and_passthrough() {
        let defaults = DefaultTable::from_entries([("State", "Atlantis")]);
        let record = complete_fields(&schema(), &answers(), &defaults);
        let encoded = encode_categoricals(&record, &categorical(), &encoder());

        let state = encoded.get("State").expect("State");
        assert_eq!(state.outcome, EncodingOutcome::Unknown);
        assert_eq!(state.value, FieldValue::Number(0.0));

        let sex = encoded.get("Sex").expect("Sex");
        assert_eq!(sex.outcome, EncodingOutcome::Known(1));
        assert_eq!(sex.value, FieldValue::Number(1.0));

        let bmi = encoded.get("BMI").expect("BMI");
        assert_eq!(bmi.outcome, EncodingOutcome::Numeric);
        assert_eq!(bmi.value, FieldValue::Number(22.9));

        assert_eq!(encoded.unknown_count(), 1);
    }

    #[test]
    fn test_zero_filled_categorical_encodes_as_unknown() {
        let schema = FeatureSchema::new(vec!["Sex".into()]).expect("schema");
        let record = complete_fields(&schema, &SurveyAnswers::default(), &DefaultTable::default());
        let encoded = encode_categoricals(&record, &categorical(), &encoder());
        assert_eq!(encoded.fields()[0].outcome, EncodingOutcome::Unknown);
        assert_eq!(encoded.fields()[0].value, FieldValue::Number(0.0));
    }

    #[test]
    fn test_normalize_width_and_order() {
        let defaults = DefaultTable::from_entries([("State", "Alaska")]);
        let record = complete_fields(&schema(), &answers(), &defaults);
        let encoded = encode_categoricals(&record, &categorical(), &encoder());
        let scaler =
            StandardScaler::new(vec![0.0, 0.5, 20.0, 0.0], vec![1.0, 0.5, 2.0, 1.0], None)
                .expect("scaler");

        let vector = normalize(&encoded, &schema(), &scaler).expect("normalize");
        assert_eq!(vector.len(), schema().len());
        assert!((vector.as_slice()[0] - 1.0).abs() < 1e-12);
        assert!((vector.as_slice()[1] - 1.0).abs() < 1e-12);
        assert!((vector.as_slice()[2] - 1.45).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_reports_scaler_width_mismatch() {
        let record = complete_fields(&schema(), &answers(), &DefaultTable::default());
        let encoded = encode_categoricals(&record, &categorical(), &encoder());
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3], None).expect("scaler");

        let err = normalize(&encoded, &schema(), &scaler).expect_err("width");
        assert_eq!(err.stage(), Stage::Normalization);
        assert!(err.to_string().starts_with("normalization stage failed"));
    }

    #[test]
    fn test_normalize_reports_scaler_order_mismatch() {
        let record = complete_fields(&schema(), &answers(), &DefaultTable::default());
        let encoded = encode_categoricals(&record, &categorical(), &encoder());
        let scaler = StandardScaler::new(
            vec![0.0; 4],
            vec![1.0; 4],
            Some(vec![
                "Sex".into(),
                "State".into(),
                "BMI".into(),
                "Unlisted".into(),
            ]),
        )
        .expect("scaler");

        let err = normalize(&encoded, &schema(), &scaler).expect_err("order");
        assert!(err.to_string().contains("column 0 is 'State'"));
    }

    #[test]
    fn test_normalize_rejects_text_in_numeric_column() {
        let schema = FeatureSchema::new(vec!["BMI".into()]).expect("schema");
        let defaults = DefaultTable::from_entries([("BMI", "No")]);
        let record = complete_fields(&schema, &SurveyAnswers::default(), &defaults);
        let encoded = encode_categoricals(&record, &BTreeSet::new(), &encoder());
        let scaler = StandardScaler::new(vec![0.0], vec![1.0], None).expect("scaler");

        let err = normalize(&encoded, &schema, &scaler).expect_err("text");
        assert_eq!(err.stage(), Stage::Normalization);
        assert!(err.to_string().contains("'No'"));
    }

    #[test]
    fn test_infer_probabilities_and_argmax() {
        let classifier = LogisticModel::new(vec![0.5, -0.25, 1.0, 0.0], -0.1).expect("model");
        let vector = NormalizedVector::new(vec![1.0, 1.0, 1.45, 0.0]);

        let result = infer(&vector, &schema(), &classifier).expect("infer");
        let [p0, p1] = result.probabilities;
        assert!((p0 + p1 - 1.0).abs() < 1e-6);
        assert_eq!(result.prediction, u8::from(p1 > p0));
    }

    #[test]
    fn test_infer_reports_width_mismatch() {
        let classifier = LogisticModel::new(vec![0.5, -0.25], 0.0).expect("model");
        let vector = NormalizedVector::new(vec![1.0, 1.0, 1.45, 0.0]);

        let err = infer(&vector, &schema(), &classifier).expect_err("width");
        assert_eq!(err.stage(), Stage::Inference);
    }
}
