//! Exam-date parsing, anonymized-identity resolution, and modality
//! classification.
//!
//! These are the normalizers the aggregator leans on: the per-exam files
//! carry a free-text date header, the overview table maps anonymized ids back
//! to canonical ones, and raw image filenames encode their modality in the
//! final underscore token.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::cohort::Modality;
use crate::core::errors::{Result, ScreenError};

/// Fixed English month abbreviations; case-sensitive exact match required.
const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse the exam date out of a semicolon-delimited header line whose second
/// field is `"<day> <MonthAbbrev> <year>"`.
pub fn parse_exam_date(raw_line: &str) -> Result<NaiveDate> {
    let field = raw_line.split(';').nth(1).ok_or_else(|| {
        ScreenError::format_with_raw("header line has no second semicolon field", raw_line)
    })?;

    let mut parts = field.split_whitespace();
    let (day, month, year) = match (parts.next(), parts.next(), parts.next()) {
        (Some(d), Some(m), Some(y)) => (d, m, y),
        _ => {
            return Err(ScreenError::format_with_raw(
                "date field is not '<day> <Mon> <year>'",
                field.trim(),
            ))
        }
    };

    let month_number = MONTH_ABBREVS
        .iter()
        .position(|abbrev| *abbrev == month)
        .map(|i| i as u32 + 1)
        .ok_or_else(|| {
            ScreenError::format_with_raw(format!("unknown month abbreviation '{month}'"), field.trim())
        })?;

    let day: u32 = day
        .parse()
        .map_err(|_| ScreenError::format_with_raw(format!("non-numeric day '{day}'"), field.trim()))?;
    let year: i32 = year
        .parse()
        .map_err(|_| ScreenError::format_with_raw(format!("non-numeric year '{year}'"), field.trim()))?;

    NaiveDate::from_ymd_opt(year, month_number, day).ok_or_else(|| {
        ScreenError::format_with_raw(
            format!("impossible calendar date {year}-{month_number:02}-{day:02}"),
            field.trim(),
        )
    })
}

/// One row of the overview identity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRow {
    /// Canonical study identifier
    pub canonical_id: String,
    /// Anonymized identifier as recorded (free text)
    pub anonymized_id: String,
    /// Exam date recorded for this row
    pub exam_date: NaiveDate,
}

/// The overview identity lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewTable {
    /// Data rows (header already stripped by the loader)
    pub rows: Vec<OverviewRow>,
}

/// Outcome of an identity lookup. The lookup itself takes no policy stance;
/// callers decide what an ambiguous match means to them.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityMatch {
    /// No overview row matched the id/date pair
    NotFound,
    /// Exactly one row matched
    Unique(String),
    /// Several rows matched; all candidate canonical ids, in table order
    Ambiguous(Vec<String>),
}

/// Normalize an anonymized id for matching: spaces stripped, lowercased.
fn normalize_anon_id(anon_id: &str) -> String {
    anon_id
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Look up the canonical id for an anonymized id and exam date.
///
/// A row matches when its anonymized id equals the query after
/// normalization AND its date column equals the given date.
pub fn lookup_canonical_id(
    anon_id: &str,
    date: NaiveDate,
    overview: &OverviewTable,
) -> IdentityMatch {
    let wanted = normalize_anon_id(anon_id);

    let mut matches: Vec<String> = overview
        .rows
        .iter()
        .filter(|row| row.exam_date == date && normalize_anon_id(&row.anonymized_id) == wanted)
        .map(|row| row.canonical_id.clone())
        .collect();

    match matches.len() {
        0 => IdentityMatch::NotFound,
        1 => IdentityMatch::Unique(matches.remove(0)),
        _ => IdentityMatch::Ambiguous(matches),
    }
}

/// Policy wrapper over [`lookup_canonical_id`]: a unique match resolves, a
/// miss is a `NotFound` error, and duplicate `(id, date)` rows are refused
/// rather than silently picking the first.
pub fn resolve_canonical_id(
    anon_id: &str,
    date: NaiveDate,
    overview: &OverviewTable,
) -> Result<String> {
    match lookup_canonical_id(anon_id, date, overview) {
        IdentityMatch::Unique(canonical_id) => Ok(canonical_id),
        IdentityMatch::NotFound => Err(ScreenError::not_found(format!(
            "'{anon_id}' at {date} has no overview row"
        ))),
        IdentityMatch::Ambiguous(candidates) => Err(ScreenError::validation(format!(
            "'{anon_id}' at {date} matches {} overview rows: {}",
            candidates.len(),
            candidates.join(", ")
        ))),
    }
}

/// Classify a raw image filename into a modality by inspecting its final
/// underscore-delimited token (case-insensitive substring match).
///
/// Fixed priority: T2, then T1, then GADO, then DIFF/DWI — the first
/// matching substring wins.
pub fn classify_image_type(filename: &str) -> Result<Modality> {
    let suffix = filename
        .rsplit('_')
        .next()
        .unwrap_or(filename)
        .to_lowercase();

    if suffix.contains("t2") {
        Ok(Modality::T2)
    } else if suffix.contains("t1") {
        Ok(Modality::T1)
    } else if suffix.contains("gado") {
        Ok(Modality::Gado)
    } else if suffix.contains("diff") || suffix.contains("dwi") {
        Ok(Modality::Diff)
    } else {
        Err(ScreenError::classification(format!(
            "'{filename}' couldn't be classified into a modality"
        )))
    }
}
