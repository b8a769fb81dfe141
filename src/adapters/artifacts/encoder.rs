//! Fitted label encoder loaded from `label_encoder.json`.
//!
//! Two layouts are accepted:
//! - `{"classes": [...]}`: one vocabulary shared by every categorical column
//! - `{"fields": {"<column>": [...]}}`: one vocabulary per column
//!
//! In both, a value's code is its index in the (sorted, fit-time) class list.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ports::CategoricalEncoder;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportedLabelEncoder {
    PerField { fields: BTreeMap<String, Vec<String>> },
    Shared { classes: Vec<String> },
}

#[derive(Debug, Clone)]
struct Vocabulary {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
}

impl Vocabulary {
    fn new(classes: Vec<String>) -> Result<Self, String> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            let code = i64::try_from(i).map_err(|_| "vocabulary too large".to_string())?;
            if codes.insert(class.clone(), code).is_some() {
                return Err(format!("class '{class}' listed more than once"));
            }
        }
        Ok(Self { classes, codes })
    }
}

/// Label encoder with either a shared or per-column vocabulary.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    shared: Option<Vocabulary>,
    fields: BTreeMap<String, Vocabulary>,
}

impl LabelEncoder {
    /// Encoder with a single vocabulary used for every column.
    ///
    /// # Errors
    /// Returns error if a class is listed twice.
    pub fn shared(classes: Vec<String>) -> Result<Self, String> {
        Ok(Self {
            shared: Some(Vocabulary::new(classes)?),
            fields: BTreeMap::new(),
        })
    }

    /// Encoder with one vocabulary per column.
    ///
    /// # Errors
    /// Returns error if a column lists a class twice.
    pub fn per_field(fields: BTreeMap<String, Vec<String>>) -> Result<Self, String> {
        let fields = fields
            .into_iter()
            .map(|(name, classes)| {
                Vocabulary::new(classes)
                    .map(|v| (name.clone(), v))
                    .map_err(|e| format!("{name}: {e}"))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self {
            shared: None,
            fields,
        })
    }

    /// Build from the exported JSON shape.
    ///
    /// # Errors
    /// Returns error if a vocabulary repeats a class.
    pub fn from_exported(exported: ExportedLabelEncoder) -> Result<Self, String> {
        match exported {
            ExportedLabelEncoder::PerField { fields } => Self::per_field(fields),
            ExportedLabelEncoder::Shared { classes } => Self::shared(classes),
        }
    }

    fn vocabulary_for(&self, field: &str) -> Option<&Vocabulary> {
        self.fields.get(field).or(self.shared.as_ref())
    }

    /// Number of columns with their own vocabulary (0 for the shared layout).
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl CategoricalEncoder for LabelEncoder {
    fn encode(&self, field: &str, value: &str) -> Option<i64> {
        self.vocabulary_for(field)?.codes.get(value).copied()
    }

    fn vocabulary(&self, field: &str) -> Option<&[String]> {
        self.vocabulary_for(field).map(|v| v.classes.as_slice())
    }
}
