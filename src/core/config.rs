//! Configuration types for the screening pipeline.
//!
//! One top-level [`ScreenConfig`] with serde-derived sections, loadable from
//! YAML. Defaults reproduce the study's fixed layout: `overview.csv` roster
//! next to an `exams/` directory, all four modalities in gado/diff/t1/t2
//! order, the binary label, and sex/age/tesla covariates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::cohort::{LabelField, MetaField, Modality};
use crate::core::errors::{Result, ScreenError};

/// Main configuration for a screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Input-data locations
    #[serde(default)]
    pub data: DataConfig,

    /// Cohort assembly settings
    #[serde(default)]
    pub cohort: CohortConfig,

    /// Significance screen and selection settings
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// Where the pipeline reads its inputs from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory of the study data
    pub data_dir: PathBuf,

    /// Subdirectory of `data_dir` holding the per-exam feature files
    #[serde(default = "default_exams_subdir")]
    pub exams_subdir: String,

    /// Roster file name, relative to `data_dir`
    #[serde(default = "default_roster_file")]
    pub roster_file: String,
}

/// Which exams fields and modalities feed the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortConfig {
    /// Modalities to include, in index order
    #[serde(default = "default_modalities")]
    pub modalities: Vec<Modality>,

    /// Label column for the screens
    #[serde(default = "default_label_field")]
    pub label_field: LabelField,

    /// Metadata covariates, in vector order
    #[serde(default = "default_meta_fields")]
    pub meta_fields: Vec<MetaField>,
}

/// Which screen drives selection, and how many features survive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Significance screen used for the ranking
    #[serde(default)]
    pub method: ScreenMethod,

    /// Number of features to select
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Gradient-descent learning rate of the built-in logistic regression
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Gradient-descent iterations of the built-in logistic regression
    #[serde(default = "default_n_iterations")]
    pub n_iterations: usize,
}

/// The two univariate screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenMethod {
    /// Rank by single-feature classifier AUC (higher is better)
    #[default]
    Auc,
    /// Rank by two-sample t-test p-value (lower is better)
    TTest,
}

impl ScreenMethod {
    /// Whether a higher score is a better score for this screen.
    pub fn descending(self) -> bool {
        matches!(self, Self::Auc)
    }
}

fn default_exams_subdir() -> String {
    "exams".to_string()
}

fn default_roster_file() -> String {
    "overview.csv".to_string()
}

fn default_modalities() -> Vec<Modality> {
    Modality::DEFAULT_ORDER.to_vec()
}

fn default_label_field() -> LabelField {
    LabelField::Binary
}

fn default_meta_fields() -> Vec<MetaField> {
    MetaField::DEFAULT_ORDER.to_vec()
}

fn default_top_n() -> usize {
    10
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_n_iterations() -> usize {
    500
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            exams_subdir: default_exams_subdir(),
            roster_file: default_roster_file(),
        }
    }
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            modalities: default_modalities(),
            label_field: default_label_field(),
            meta_fields: default_meta_fields(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            method: ScreenMethod::default(),
            top_n: default_top_n(),
            learning_rate: default_learning_rate(),
            n_iterations: default_n_iterations(),
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            cohort: CohortConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

impl ScreenConfig {
    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| ScreenError::io(format!("failed to read {}", path.display()), err))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no run can work with.
    pub fn validate(&self) -> Result<()> {
        if self.cohort.modalities.is_empty() {
            return Err(ScreenError::config_field(
                "at least one modality must be included",
                "cohort.modalities",
            ));
        }
        for (i, modality) in self.cohort.modalities.iter().enumerate() {
            if self.cohort.modalities[..i].contains(modality) {
                return Err(ScreenError::config_field(
                    format!("modality '{modality}' is listed twice"),
                    "cohort.modalities",
                ));
            }
        }
        if self.selection.top_n == 0 {
            return Err(ScreenError::config_field(
                "top_n must be at least 1",
                "selection.top_n",
            ));
        }
        if self.selection.learning_rate <= 0.0 {
            return Err(ScreenError::config_field(
                "learning_rate must be positive",
                "selection.learning_rate",
            ));
        }
        if self.selection.n_iterations == 0 {
            return Err(ScreenError::config_field(
                "n_iterations must be at least 1",
                "selection.n_iterations",
            ));
        }
        Ok(())
    }

    /// Directory holding the per-exam feature files.
    pub fn exams_dir(&self) -> PathBuf {
        self.data.data_dir.join(&self.data.exams_subdir)
    }

    /// Path of the roster table.
    pub fn roster_path(&self) -> PathBuf {
        self.data.data_dir.join(&self.data.roster_file)
    }
}
