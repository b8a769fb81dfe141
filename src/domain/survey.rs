//! Survey answers submitted through the form (the partial input).
//!
//! Answers arrive as text. Numeric questions are coerced to `f64` here so a
//! bad value is reported before any pipeline stage runs.

use std::collections::{BTreeMap, HashMap};

use super::record::FieldValue;
use super::schema::{FieldKind, SURVEY_FIELDS};

/// Errors raised while coercing raw form text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("could not convert {field} value '{value}' to a number")]
    NotNumeric { field: String, value: String },

    #[error("{field} value '{value}' is not a finite number")]
    NotFinite { field: String, value: String },
}

/// The subset of schema fields collected from the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyAnswers {
    values: BTreeMap<String, FieldValue>,
}

impl SurveyAnswers {
    /// Coerce the 12 survey answers from submitted form fields.
    ///
    /// Extra form fields are ignored.
    ///
    /// # Errors
    /// Returns the first missing or non-numeric answer, in form order.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, InputError> {
        let values = SURVEY_FIELDS
            .iter()
            .map(|field| {
                let raw = form
                    .get(field.name)
                    .ok_or_else(|| InputError::MissingField(field.name.to_string()))?;

                let value = match field.kind {
                    FieldKind::Numeric => FieldValue::Number(parse_number(field.name, raw)?),
                    FieldKind::Categorical => FieldValue::Category(raw.clone()),
                };
                Ok((field.name, value))
            })
            .collect::<Result<Vec<_>, InputError>>()?;

        Ok(Self::from_values(values))
    }

    /// Build answers from already-typed values.
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse a numeric answer, tolerating surrounding whitespace.
///
/// # Errors
/// Returns `NotNumeric` for unparsable text and `NotFinite` for NaN/inf.
pub fn parse_number(field: &str, raw: &str) -> Result<f64, InputError> {
    let parsed: f64 = raw.trim().parse().map_err(|_| InputError::NotNumeric {
        field: field.to_string(),
        value: raw.to_string(),
    })?;

    if !parsed.is_finite() {
        return Err(InputError::NotFinite {
            field: field.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(parsed)
}
