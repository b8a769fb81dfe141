//! Feature schema contract shared with the trained artifacts.
//!
//! Column names, the categorical column list and the default table must stay
//! in lockstep with whatever produced the classifier, encoder and scaler.

use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Columns that were label-encoded when the classifier was fitted.
pub const CATEGORICAL_COLUMNS: [&str; 33] = [
    "State",
    "Sex",
    "GeneralHealth",
    "LastCheckupTime",
    "PhysicalActivities",
    "RemovedTeeth",
    "HadAngina",
    "HadStroke",
    "HadAsthma",
    "HadSkinCancer",
    "HadCOPD",
    "HadDepressiveDisorder",
    "HadKidneyDisease",
    "HadArthritis",
    "HadDiabetes",
    "DeafOrHardOfHearing",
    "BlindOrVisionDifficulty",
    "DifficultyConcentrating",
    "DifficultyWalking",
    "DifficultyDressingBathing",
    "DifficultyErrands",
    "SmokerStatus",
    "ECigaretteUsage",
    "ChestScan",
    "RaceEthnicityCategory",
    "AgeCategory",
    "AlcoholDrinkers",
    "HIVTesting",
    "FluVaxLast12",
    "PneumoVaxEver",
    "TetanusLast10Tdap",
    "HighRiskLastYear",
    "CovidPos",
];

/// Fallback answers for every categorical column the survey does not ask.
const STANDARD_DEFAULTS: [(&str, &str); 27] = [
    ("State", "Alabama"),
    (
        "LastCheckupTime",
        "Within past year (anytime less than 12 months ago)",
    ),
    ("RemovedTeeth", "None of them"),
    ("HadAngina", "No"),
    ("HadStroke", "No"),
    ("HadAsthma", "No"),
    ("HadSkinCancer", "No"),
    ("HadCOPD", "No"),
    ("HadDepressiveDisorder", "No"),
    ("HadKidneyDisease", "No"),
    ("HadArthritis", "No"),
    ("DeafOrHardOfHearing", "No"),
    ("BlindOrVisionDifficulty", "No"),
    ("DifficultyConcentrating", "No"),
    ("DifficultyWalking", "No"),
    ("DifficultyDressingBathing", "No"),
    ("DifficultyErrands", "No"),
    (
        "ECigaretteUsage",
        "Never used e-cigarettes in my entire life",
    ),
    ("ChestScan", "No"),
    ("RaceEthnicityCategory", "White only, Non-Hispanic"),
    ("AlcoholDrinkers", "No"),
    ("HIVTesting", "No"),
    ("FluVaxLast12", "No"),
    ("PneumoVaxEver", "No"),
    (
        "TetanusLast10Tdap",
        "No, did not receive any tetanus shot in the past 10 years",
    ),
    ("HighRiskLastYear", "No"),
    ("CovidPos", "No"),
];

/// How a survey answer must be coerced before it enters the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Parsed as floating point.
    Numeric,
    /// Kept as the submitted text.
    Categorical,
}

/// One question on the survey form.
#[derive(Debug, Clone, Copy)]
pub struct SurveyField {
    /// Schema column the answer fills
    pub name: &'static str,
    /// Coercion applied to the raw text
    pub kind: FieldKind,
    /// Human-readable question label
    pub label: &'static str,
}

/// The 12 fields collected from the user, in form order.
pub const SURVEY_FIELDS: [SurveyField; 12] = [
    SurveyField {
        name: "PhysicalHealthDays",
        kind: FieldKind::Numeric,
        label: "Days of poor physical health (past 30 days)",
    },
    SurveyField {
        name: "MentalHealthDays",
        kind: FieldKind::Numeric,
        label: "Days of poor mental health (past 30 days)",
    },
    SurveyField {
        name: "SleepHours",
        kind: FieldKind::Numeric,
        label: "Average hours of sleep",
    },
    SurveyField {
        name: "HeightInMeters",
        kind: FieldKind::Numeric,
        label: "Height (m)",
    },
    SurveyField {
        name: "WeightInKilograms",
        kind: FieldKind::Numeric,
        label: "Weight (kg)",
    },
    SurveyField {
        name: "BMI",
        kind: FieldKind::Numeric,
        label: "Body mass index",
    },
    SurveyField {
        name: "Sex",
        kind: FieldKind::Categorical,
        label: "Sex",
    },
    SurveyField {
        name: "GeneralHealth",
        kind: FieldKind::Categorical,
        label: "General health",
    },
    SurveyField {
        name: "PhysicalActivities",
        kind: FieldKind::Categorical,
        label: "Physical activity in the past month",
    },
    SurveyField {
        name: "HadDiabetes",
        kind: FieldKind::Categorical,
        label: "Ever told you had diabetes",
    },
    SurveyField {
        name: "SmokerStatus",
        kind: FieldKind::Categorical,
        label: "Smoking status",
    },
    SurveyField {
        name: "AgeCategory",
        kind: FieldKind::Categorical,
        label: "Age category",
    },
];

/// The categorical column list as an owned set.
#[must_use]
pub fn categorical_columns() -> BTreeSet<String> {
    CATEGORICAL_COLUMNS.iter().map(|c| (*c).to_string()).collect()
}

/// Errors raised while building a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("feature schema is empty")]
    Empty,

    #[error("feature schema has a blank name at position {0}")]
    BlankName(usize),

    #[error("feature schema lists '{0}' more than once")]
    Duplicate(String),
}

/// Ordered column list the classifier was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from the trained column order.
    ///
    /// # Errors
    /// Returns error if the list is empty, has blank entries or repeats a name.
    pub fn new(names: Vec<String>) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SchemaError::BlankName(i));
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names })
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Static fallback values for schema fields the user is not asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultTable {
    entries: BTreeMap<String, String>,
}

impl DefaultTable {
    /// The default table matching the shipped survey.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_entries(STANDARD_DEFAULTS)
    }

    /// Build a table from arbitrary `(field, value)` pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
