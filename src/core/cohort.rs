//! Core data model for the screening pipeline.
//!
//! The cohort is a roster of exams; each exam carries one feature set per MRI
//! modality plus the patient metadata needed downstream. The types here are
//! plain in-memory containers — all invariants between them are enforced at
//! aggregation time (see [`crate::core::aggregate`]).

use chrono::NaiveDate;
use indexmap::IndexMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ScreenError};

/// One MRI acquisition type. DIFF covers both "diff" and "dwi" file suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Gadolinium-enhanced T1
    Gado,
    /// Diffusion-weighted (DIFF/DWI)
    Diff,
    /// T1-weighted
    T1,
    /// T2-weighted
    T2,
}

impl Modality {
    /// The fixed default ordering used when building the feature index.
    pub const DEFAULT_ORDER: [Modality; 4] = [Self::Gado, Self::Diff, Self::T1, Self::T2];

    /// Lowercase token used as the composite-key prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gado => "gado",
            Self::Diff => "diff",
            Self::T1 => "t1",
            Self::T2 => "t2",
        }
    }

    /// Uppercase token used in per-exam file names (`<examId>_<MODALITY>.csv`).
    pub fn file_token(self) -> &'static str {
        match self {
            Self::Gado => "GADO",
            Self::Diff => "DIFF",
            Self::T1 => "T1",
            Self::T2 => "T2",
        }
    }

    /// Parse a lowercase composite-key prefix back into a modality.
    pub fn from_prefix(prefix: &str) -> Result<Self> {
        match prefix {
            "gado" => Ok(Self::Gado),
            "diff" => Ok(Self::Diff),
            "t1" => Ok(Self::T1),
            "t2" => Ok(Self::T2),
            other => Err(ScreenError::classification(format!(
                "'{other}' is not a modality prefix"
            ))),
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the study roster. Source of truth for cohort membership;
/// immutable once loaded. Sex and the labels are numerically coded in the
/// roster, so every field except the id is carried as `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    /// Exam identifier, also the stem of the per-modality file names
    pub exam_id: String,
    /// Patient sex (coded)
    pub sex: f64,
    /// Patient age in years
    pub age: f64,
    /// Scanner field strength in tesla
    pub tesla: f64,
    /// Multiclass diagnosis label
    pub multiclass_label: f64,
    /// Binary diagnosis label (0/1)
    pub binary_label: f64,
}

/// Label column selector for matrix formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelField {
    /// Binary 0/1 label (default)
    Binary,
    /// Multiclass label
    Multiclass,
}

/// Metadata covariate selector for matrix formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaField {
    /// Patient sex
    Sex,
    /// Patient age
    Age,
    /// Scanner field strength
    Tesla,
}

impl MetaField {
    /// The default metadata vector layout: sex, age, tesla.
    pub const DEFAULT_ORDER: [MetaField; 3] = [Self::Sex, Self::Age, Self::Tesla];
}

impl MetadataRow {
    /// Read the requested label off the row.
    pub fn label(&self, field: LabelField) -> f64 {
        match field {
            LabelField::Binary => self.binary_label,
            LabelField::Multiclass => self.multiclass_label,
        }
    }

    /// Read the requested metadata covariate off the row.
    pub fn meta(&self, field: MetaField) -> f64 {
        match field {
            MetaField::Sex => self.sex,
            MetaField::Age => self.age,
            MetaField::Tesla => self.tesla,
        }
    }
}

/// Feature name → value mapping for one modality of one exam.
///
/// Backed by an [`IndexMap`] because the file order of the keys seeds the
/// column layout of the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet(IndexMap<String, f64>);

impl FeatureSet {
    /// Create an empty feature set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature value
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Get a feature value by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Number of features in the set
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the set holds no features
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Feature names in file order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Feature names sorted lexicographically, for set comparisons
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl FromIterator<(String, f64)> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One fully-loaded exam: metadata, the shared exam date, and one feature set
/// per included modality (in inclusion order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamRecord {
    /// Roster row this exam was loaded for
    pub meta: MetadataRow,
    /// Exam date shared by all modality files (validated at aggregation)
    pub exam_date: NaiveDate,
    /// Per-modality feature sets, keyed in inclusion order
    pub features: IndexMap<Modality, FeatureSet>,
    /// Feature keys shared by every modality, in the file order of the
    /// first included modality
    pub feature_keys: Vec<String>,
}

impl ExamRecord {
    /// Get one modality's feature set.
    pub fn feature_set(&self, modality: Modality) -> Option<&FeatureSet> {
        self.features.get(&modality)
    }

    /// Exam identifier shorthand.
    pub fn exam_id(&self) -> &str {
        &self.meta.exam_id
    }
}

/// The per-modality feature-key schema of the run.
///
/// Computed once from the first loaded exam and validated against every
/// subsequent exam, so a divergent exam fails the run loudly instead of
/// silently corrupting the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    keys: Vec<String>,
}

impl FeatureSchema {
    /// Derive the schema from the first loaded exam.
    pub fn from_record(record: &ExamRecord) -> Self {
        Self {
            keys: record.feature_keys.clone(),
        }
    }

    /// Feature keys in natural (seed-exam file) order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Number of per-modality feature keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the schema holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check a record against the schema; key-set divergence is a hard error.
    pub fn validate(&self, record: &ExamRecord) -> Result<()> {
        let mut expected: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        expected.sort_unstable();
        let mut actual: Vec<&str> = record.feature_keys.iter().map(String::as_str).collect();
        actual.sort_unstable();

        if expected != actual {
            return Err(ScreenError::validation_for(
                format!(
                    "feature keys diverge from the cohort schema ({} keys vs {})",
                    actual.len(),
                    expected.len()
                ),
                record.exam_id().to_string(),
            ));
        }
        Ok(())
    }
}

/// Bidirectional mapping between composite keys (`"<modality>_<feature>"`)
/// and dense column indices. Built once per run; stable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureIndex {
    key_to_id: IndexMap<String, usize>,
    id_to_key: Vec<String>,
}

impl FeatureIndex {
    /// Build the index from a schema, iterating modalities in the given
    /// order and within each modality in schema key order.
    pub fn from_schema(schema: &FeatureSchema, modalities: &[Modality]) -> Self {
        let mut key_to_id = IndexMap::with_capacity(modalities.len() * schema.len());
        let mut id_to_key = Vec::with_capacity(modalities.len() * schema.len());

        for modality in modalities {
            for key in schema.keys() {
                let composite = format!("{modality}_{key}");
                key_to_id.insert(composite.clone(), id_to_key.len());
                id_to_key.push(composite);
            }
        }

        Self { key_to_id, id_to_key }
    }

    /// Total number of columns (modalities × schema keys).
    pub fn len(&self) -> usize {
        self.id_to_key.len()
    }

    /// True if the index holds no columns
    pub fn is_empty(&self) -> bool {
        self.id_to_key.is_empty()
    }

    /// Column index for a composite key.
    pub fn id_for(&self, composite_key: &str) -> Option<usize> {
        self.key_to_id.get(composite_key).copied()
    }

    /// Composite key for a column index.
    pub fn key_for(&self, id: usize) -> Option<&str> {
        self.id_to_key.get(id).map(String::as_str)
    }

    /// Composite keys in column order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.id_to_key.iter().map(String::as_str)
    }

    /// Split a composite key into its modality and feature-name parts.
    ///
    /// Only the first underscore delimits the modality prefix; feature names
    /// are free to contain underscores themselves.
    pub fn split_composite(composite_key: &str) -> Result<(Modality, &str)> {
        let (prefix, feature) = composite_key.split_once('_').ok_or_else(|| {
            ScreenError::validation(format!("composite key '{composite_key}' has no modality prefix"))
        })?;
        Ok((Modality::from_prefix(prefix)?, feature))
    }
}

/// Projection of one exam into the fixed-length vectors consumed by the
/// significance screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedExam {
    /// Label scalar for the requested label field
    pub label: f64,
    /// Feature vector, length = feature-index size
    pub features: Array1<f64>,
    /// Metadata vector, length = number of requested meta fields
    pub meta: Array1<f64>,
}
