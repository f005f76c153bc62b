//! Exam aggregation: per-roster-row loading, intra-exam validation, and
//! construction of the run-wide feature schema and column index.
//!
//! Missing or incomplete exams are expected cohort attrition and are skipped
//! with a diagnostic; anything else a loaded exam gets wrong (date drift
//! between modalities, divergent feature keys) is corrupted input and aborts
//! the run.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::cohort::{
    ExamRecord, FeatureIndex, FeatureSchema, FeatureSet, MetadataRow, Modality,
};
use crate::core::errors::{Result, ScreenError};
use crate::io::features::parse_feature_file;

/// Outcome of loading one roster row.
#[derive(Debug)]
pub enum ExamOutcome {
    /// All modality files present and mutually consistent
    Loaded(Box<ExamRecord>),
    /// A modality file was missing; the exam is dropped from the cohort
    Skipped {
        /// Roster exam id
        exam_id: String,
        /// What was missing
        reason: String,
    },
}

/// One skipped exam, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedExam {
    /// Roster exam id
    pub exam_id: String,
    /// What was missing
    pub reason: String,
}

/// Result of aggregating the whole roster.
#[derive(Debug)]
pub struct Aggregation {
    /// Successfully loaded exams, in roster order
    pub records: Vec<ExamRecord>,
    /// Exams dropped for missing files, in roster order
    pub skipped: Vec<SkippedExam>,
    /// Per-modality feature-key schema (from the first loaded exam)
    pub schema: FeatureSchema,
    /// Composite-key ↔ column mapping for the run
    pub index: FeatureIndex,
}

/// Load one exam: parse every included modality file (with its date) and
/// cross-validate the results.
///
/// Pure with respect to the cohort: the function reads files for this one
/// exam and returns a value; accumulation policy lives in
/// [`aggregate_exams`].
pub fn load_exam(
    row: &MetadataRow,
    exams_dir: &Path,
    modalities: &[Modality],
) -> Result<ExamOutcome> {
    if modalities.is_empty() {
        return Err(ScreenError::config_field(
            "at least one modality must be included",
            "modalities",
        ));
    }

    let mut features: IndexMap<Modality, FeatureSet> = IndexMap::with_capacity(modalities.len());
    let mut dates = Vec::with_capacity(modalities.len());

    for &modality in modalities {
        match parse_feature_file(exams_dir, &row.exam_id, modality, true) {
            Ok((set, date)) => {
                // include_date was requested, so the date is always present
                dates.push((modality, date.expect("date requested from parser")));
                features.insert(modality, set);
            }
            Err(err) if err.is_not_found() => {
                return Ok(ExamOutcome::Skipped {
                    exam_id: row.exam_id.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    // Sanity check 1: one exam date across all modality files.
    let (first_modality, first_date) = dates[0];
    for &(modality, date) in &dates[1..] {
        if date != first_date {
            return Err(ScreenError::validation_for(
                format!(
                    "exam dates differ across modalities: {first_modality} has {first_date}, \
                     {modality} has {date}"
                ),
                row.exam_id.clone(),
            ));
        }
    }

    // Sanity check 2: identical feature-key sets across all modality files.
    let reference = &features[0];
    let reference_keys = reference.sorted_keys();
    for (&modality, set) in features.iter().skip(1) {
        if set.sorted_keys() != reference_keys {
            return Err(ScreenError::validation_for(
                format!(
                    "feature keys differ between {first_modality} ({} keys) and {modality} ({} keys)",
                    reference.len(),
                    set.len()
                ),
                row.exam_id.clone(),
            ));
        }
    }

    let feature_keys: Vec<String> = reference.keys().map(str::to_string).collect();

    Ok(ExamOutcome::Loaded(Box::new(ExamRecord {
        meta: row.clone(),
        exam_date: first_date,
        features,
        feature_keys,
    })))
}

/// Aggregate the whole roster into exam records plus the run-wide schema and
/// column index.
///
/// The schema is seeded from the first loaded exam and enforced against every
/// later one, so a cohort with drifting feature keys fails on the first
/// divergent exam instead of producing a silently misaligned matrix.
pub fn aggregate_exams(
    rows: &[MetadataRow],
    exams_dir: &Path,
    modalities: &[Modality],
) -> Result<Aggregation> {
    if modalities.is_empty() {
        return Err(ScreenError::config_field(
            "at least one modality must be included",
            "modalities",
        ));
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    let mut schema: Option<FeatureSchema> = None;

    for row in rows {
        match load_exam(row, exams_dir, modalities)? {
            ExamOutcome::Loaded(record) => {
                match &schema {
                    Some(schema) => schema.validate(&record)?,
                    None => {
                        debug!(
                            exam_id = %record.exam_id(),
                            keys = record.feature_keys.len(),
                            "seeding feature schema from first loaded exam"
                        );
                        schema = Some(FeatureSchema::from_record(&record));
                    }
                }
                records.push(*record);
            }
            ExamOutcome::Skipped { exam_id, reason } => {
                warn!(%exam_id, %reason, "exam wasn't found or incomplete, skipping");
                skipped.push(SkippedExam { exam_id, reason });
            }
        }
    }

    let schema = schema.ok_or_else(|| {
        ScreenError::validation(format!(
            "no exam could be loaded out of {} roster rows; nothing to seed the feature index",
            rows.len()
        ))
    })?;

    let index = FeatureIndex::from_schema(&schema, modalities);

    info!(
        loaded = records.len(),
        skipped = skipped.len(),
        columns = index.len(),
        "aggregated cohort"
    );

    Ok(Aggregation {
        records,
        skipped,
        schema,
        index,
    })
}
