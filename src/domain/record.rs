//! Record types flowing through the prediction pipeline.
//!
//! Each stage keeps per-field provenance so the silent fallbacks (default
//! answers, zero-fill, unknown categories) stay visible to callers and tests.

use std::fmt;

/// A single field value before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Category(String),
}

impl FieldValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Category(_) => None,
        }
    }

    #[must_use]
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Category(s) => Some(s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Category(s) => write!(f, "{s}"),
        }
    }
}

/// Where a completed field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Submitted by the user
    Supplied,
    /// Taken from the default table
    Defaulted,
    /// Neither supplied nor defaulted; filled with numeric zero
    ZeroFilled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedField {
    pub name: String,
    pub value: FieldValue,
    pub source: FieldSource,
}

/// One schema-ordered row with every field populated.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRecord {
    fields: Vec<CompletedField>,
}

impl CompletedRecord {
    #[must_use]
    pub fn new(fields: Vec<CompletedField>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[CompletedField] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CompletedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of fields that fell through to the zero fill.
    pub fn zero_filled(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.source == FieldSource::ZeroFilled)
            .map(|f| f.name.as_str())
    }
}

/// Result of looking a field up in the fitted encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingOutcome {
    /// Not a categorical column; value passed through
    Numeric,
    /// Value was seen at fit time and got this code
    Known(i64),
    /// Value was never seen at fit time; coded as 0
    Unknown,
}

impl EncodingOutcome {
    /// Code substituted for values the encoder never saw.
    pub const FALLBACK_CODE: i64 = 0;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedField {
    pub name: String,
    pub value: FieldValue,
    pub outcome: EncodingOutcome,
}

/// A completed record with categorical columns replaced by integer codes.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord {
    fields: Vec<EncodedField>,
}

impl EncodedRecord {
    #[must_use]
    pub fn new(fields: Vec<EncodedField>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[EncodedField] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EncodedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Number of categorical values that fell back to the unknown code.
    #[must_use]
    pub fn unknown_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.outcome == EncodingOutcome::Unknown)
            .count()
    }

    /// Flatten to the raw numeric row.
    ///
    /// # Errors
    /// Returns the offending field if a non-numeric value is still present.
    pub fn to_row(&self) -> Result<Vec<f64>, &EncodedField> {
        self.fields
            .iter()
            .map(|f| f.value.as_number().ok_or(f))
            .collect()
    }
}

/// The rescaled row handed to the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedVector {
    values: Vec<f64>,
}

impl NormalizedVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
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
