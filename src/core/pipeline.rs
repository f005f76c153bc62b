//! The end-to-end screening pipeline: roster → aggregation → cohort matrix →
//! significance screens → top-N selection.
//!
//! Each stage is usable on its own; the pipeline just runs them in order with
//! the settings from one [`ScreenConfig`] and collects a serializable report.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::aggregate::{aggregate_exams, SkippedExam};
use crate::core::classifier::{LogisticRegression, ProbabilisticClassifier};
use crate::core::config::{ScreenConfig, ScreenMethod};
use crate::core::errors::Result;
use crate::core::matrix::format_cohort;
use crate::core::significance::{
    feature_auc, feature_t_test, select_top_n, SignificanceResult,
};
use crate::io::tables::load_metadata;

/// What one full run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningReport {
    /// Roster rows read
    pub n_roster_rows: usize,
    /// Exams that loaded completely
    pub n_loaded: usize,
    /// Exams dropped for missing files
    pub skipped: Vec<SkippedExam>,
    /// Total feature columns (modalities × per-modality keys)
    pub n_features: usize,
    /// Per-feature AUC scores, in column order
    pub auc: SignificanceResult,
    /// Per-feature t-test p-values, in column order
    pub p_values: SignificanceResult,
    /// Screen that drove the selection
    pub method: ScreenMethod,
    /// Selected composite keys, best first
    pub selected_keys: Vec<String>,
    /// Selected column indices, best first
    pub selected_columns: Vec<usize>,
}

/// Batch screening pipeline over one study directory.
#[derive(Debug)]
pub struct ScreeningPipeline {
    config: ScreenConfig,
}

impl ScreeningPipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: ScreenConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Run the pipeline with the built-in logistic regression as the AUC
    /// screen's classifier.
    pub fn run(&self) -> Result<ScreeningReport> {
        let mut classifier = LogisticRegression::new(
            self.config.selection.learning_rate,
            self.config.selection.n_iterations,
        );
        self.run_with_classifier(&mut classifier)
    }

    /// Run the pipeline with a caller-supplied classifier.
    pub fn run_with_classifier(
        &self,
        classifier: &mut dyn ProbabilisticClassifier,
    ) -> Result<ScreeningReport> {
        let roster_path = self.config.roster_path();
        info!(path = %roster_path.display(), "loading roster");
        let rows = load_metadata(&roster_path)?;

        let aggregation = aggregate_exams(
            &rows,
            &self.config.exams_dir(),
            &self.config.cohort.modalities,
        )?;

        let cohort = format_cohort(
            &aggregation.records,
            &aggregation.index,
            self.config.cohort.label_field,
            &self.config.cohort.meta_fields,
        )?;
        info!(
            exams = cohort.n_exams(),
            columns = cohort.n_features(),
            "cohort matrix assembled"
        );

        let auc = feature_auc(
            &cohort.features,
            &cohort.labels,
            &aggregation.index,
            classifier,
        )?;
        let p_values = feature_t_test(&cohort.features, &cohort.labels, &aggregation.index)?;

        let method = self.config.selection.method;
        let scores = match method {
            ScreenMethod::Auc => &auc,
            ScreenMethod::TTest => &p_values,
        };
        let selected_columns = select_top_n(
            scores,
            self.config.selection.top_n,
            &aggregation.index,
            method.descending(),
        )?;
        let selected_keys = selected_columns
            .iter()
            .map(|&id| {
                aggregation
                    .index
                    .key_for(id)
                    .expect("selected columns come from the index")
                    .to_string()
            })
            .collect();

        info!(selected = selected_columns.len(), ?method, "screen complete");

        Ok(ScreeningReport {
            n_roster_rows: rows.len(),
            n_loaded: aggregation.records.len(),
            skipped: aggregation.skipped,
            n_features: aggregation.index.len(),
            auc,
            p_values,
            method,
            selected_keys,
            selected_columns,
        })
    }
}
