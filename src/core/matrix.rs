//! Projection of exam records into fixed-length numeric vectors and the
//! stacked cohort matrix consumed by the significance screens.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::core::cohort::{
    ExamRecord, FeatureIndex, FormattedExam, LabelField, MetaField,
};
use crate::core::errors::{Result, ScreenError};

/// Format one exam against the run-wide column index.
///
/// Every composite key in the index is resolved against the exam's
/// corresponding modality feature set and written at its mapped position, so
/// position `i` of the output always holds the value of composite key `i`.
/// Neither the record nor the index is mutated.
pub fn format_exam(
    record: &ExamRecord,
    index: &FeatureIndex,
    label_field: LabelField,
    meta_fields: &[MetaField],
) -> Result<FormattedExam> {
    let mut features = Array1::zeros(index.len());

    for (id, composite_key) in index.keys().enumerate() {
        let (modality, feature) = FeatureIndex::split_composite(composite_key)?;

        let set = record.feature_set(modality).ok_or_else(|| {
            ScreenError::validation_for(
                format!("record has no {modality} feature set"),
                record.exam_id().to_string(),
            )
        })?;
        let value = set.get(feature).ok_or_else(|| {
            ScreenError::validation_for(
                format!("record has no value for '{composite_key}'"),
                record.exam_id().to_string(),
            )
        })?;

        features[id] = value;
    }

    let meta = meta_fields
        .iter()
        .map(|&field| record.meta.meta(field))
        .collect();

    Ok(FormattedExam {
        label: record.meta.label(label_field),
        features,
        meta,
    })
}

/// The whole cohort, stacked: one row per exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortMatrix {
    /// Exam ids, one per row
    pub exam_ids: Vec<String>,
    /// Feature matrix, shape (exams, index columns)
    pub features: Array2<f64>,
    /// Label vector, one per exam
    pub labels: Array1<f64>,
    /// Metadata covariates, shape (exams, meta fields)
    pub meta: Array2<f64>,
}

impl CohortMatrix {
    /// Number of exams (rows).
    pub fn n_exams(&self) -> usize {
        self.features.nrows()
    }

    /// Number of feature columns.
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}

/// Format every record against the index and stack the results.
pub fn format_cohort(
    records: &[ExamRecord],
    index: &FeatureIndex,
    label_field: LabelField,
    meta_fields: &[MetaField],
) -> Result<CohortMatrix> {
    let mut features = Array2::zeros((records.len(), index.len()));
    let mut labels = Array1::zeros(records.len());
    let mut meta = Array2::zeros((records.len(), meta_fields.len()));
    let mut exam_ids = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        let formatted = format_exam(record, index, label_field, meta_fields)?;
        features.row_mut(row).assign(&formatted.features);
        meta.row_mut(row).assign(&formatted.meta);
        labels[row] = formatted.label;
        exam_ids.push(record.exam_id().to_string());
    }

    Ok(CohortMatrix {
        exam_ids,
        features,
        labels,
        meta,
    })
}
