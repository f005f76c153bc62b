//! Per-exam feature file parsing.
//!
//! One file per `(examId, modality)` pair, named `<examId>_<MODALITY>.csv`,
//! semicolon-delimited. The exporter writes a fixed layout: feature rows live
//! on lines 19–126 (1-indexed) and line 7 carries the exam date in its second
//! semicolon field. Files may or may not end rows with a trailing delimiter;
//! both shapes are accepted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::core::cohort::{FeatureSet, Modality};
use crate::core::errors::{Result, ScreenError};
use crate::core::identity::parse_exam_date;

/// First feature row, 0-indexed.
const FEATURE_ROWS_START: usize = 18;
/// Number of feature rows in the fixed layout.
const FEATURE_ROWS_LEN: usize = 108;
/// Header line carrying the exam date, 0-indexed.
const DATE_LINE: usize = 6;

/// Expected path of one modality's feature file.
pub fn feature_file_path(dir: &Path, exam_id: &str, modality: Modality) -> PathBuf {
    dir.join(format!("{exam_id}_{}.csv", modality.file_token()))
}

/// Parse one modality's feature file for one exam.
///
/// Returns the name → value mapping and, when `include_date` is set, the exam
/// date from the header. A missing file surfaces as a `NotFound` error (the
/// aggregator's skip condition); non-numeric feature values are hard `Parse`
/// errors.
pub fn parse_feature_file(
    dir: &Path,
    exam_id: &str,
    modality: Modality,
    include_date: bool,
) -> Result<(FeatureSet, Option<NaiveDate>)> {
    let path = feature_file_path(dir, exam_id, modality);

    let content = fs::read_to_string(&path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            ScreenError::not_found(format!("feature file {}", path.display()))
        } else {
            ScreenError::io(format!("failed to read {}", path.display()), err)
        }
    })?;

    let mut features = FeatureSet::new();

    for (line_idx, line) in content
        .lines()
        .enumerate()
        .skip(FEATURE_ROWS_START)
        .take(FEATURE_ROWS_LEN)
    {
        let fields: Vec<&str> = line.split(';').collect();
        let name: String = fields[0].split_whitespace().collect();

        // Last field, unless the row ends with a trailing delimiter.
        let raw_value = match fields.as_slice() {
            [.., value] if !value.trim().is_empty() => value,
            [.., value, _empty] => value,
            _ => {
                return Err(ScreenError::parse(
                    &path,
                    "feature row has no value field",
                    Some(line_idx + 1),
                ))
            }
        };

        let value: f64 = raw_value.trim().parse().map_err(|_| {
            ScreenError::parse(
                &path,
                format!("non-numeric value '{}' for feature '{name}'", raw_value.trim()),
                Some(line_idx + 1),
            )
        })?;

        features.insert(name, value);
    }

    let date = if include_date {
        let header_line = content.lines().nth(DATE_LINE).ok_or_else(|| {
            ScreenError::parse(&path, "file has no date header line", Some(DATE_LINE + 1))
        })?;
        Some(parse_exam_date(header_line)?)
    } else {
        None
    };

    Ok((features, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::TempDir;

    /// Write a feature file in the fixed exporter layout: 18 header lines
    /// (date on line 7), then one row per feature, then a footer.
    fn write_feature_file(
        dir: &Path,
        exam_id: &str,
        modality: Modality,
        date: &str,
        rows: &[(&str, &str)],
        trailing_delimiter: bool,
    ) {
        let path = feature_file_path(dir, exam_id, modality);
        let mut file = fs::File::create(path).unwrap();
        for i in 0..FEATURE_ROWS_START {
            if i == DATE_LINE {
                writeln!(file, "Study date:;{date};").unwrap();
            } else {
                writeln!(file, "header line {i};").unwrap();
            }
        }
        for (name, value) in rows {
            if trailing_delimiter {
                writeln!(file, "{name};{value};").unwrap();
            } else {
                writeln!(file, "{name};{value}").unwrap();
            }
        }
    }

    #[test]
    fn test_parse_feature_file_basic() {
        let tmp = TempDir::new().unwrap();
        write_feature_file(
            tmp.path(),
            "P001",
            Modality::T2,
            "12 Jan 2004",
            &[("Volume", "1523.5"), ("Mean ", "80.25")],
            false,
        );

        let (features, date) =
            parse_feature_file(tmp.path(), "P001", Modality::T2, true).unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features.get("Volume"), Some(1523.5));
        // whitespace is stripped out of feature names
        assert_eq!(features.get("Mean"), Some(80.25));
        assert_eq!(date, Some(NaiveDate::from_ymd_opt(2004, 1, 12).unwrap()));
    }

    #[test]
    fn test_parse_feature_file_tolerates_trailing_delimiter() {
        let tmp = TempDir::new().unwrap();
        write_feature_file(
            tmp.path(),
            "P002",
            Modality::Gado,
            "3 Jun 2005",
            &[("Kurtosis", "2.75")],
            true,
        );

        let (features, date) =
            parse_feature_file(tmp.path(), "P002", Modality::Gado, false).unwrap();
        assert_eq!(features.get("Kurtosis"), Some(2.75));
        assert_eq!(date, None);
    }

    #[test]
    fn test_parse_feature_file_skips_header_and_footer_margin() {
        let tmp = TempDir::new().unwrap();
        let path = feature_file_path(tmp.path(), "P003", Modality::T1);
        let mut file = fs::File::create(path).unwrap();
        for i in 0..FEATURE_ROWS_START {
            writeln!(file, "not;a;feature;row;{i}").unwrap();
        }
        for i in 0..FEATURE_ROWS_LEN {
            writeln!(file, "feat{i};{}.0", i).unwrap();
        }
        // footer beyond line 126 must be ignored even when non-numeric
        writeln!(file, "footer;not a number").unwrap();

        let (features, _) = parse_feature_file(tmp.path(), "P003", Modality::T1, false).unwrap();
        assert_eq!(features.len(), FEATURE_ROWS_LEN);
        assert_eq!(features.get("feat0"), Some(0.0));
        assert_eq!(features.get("feat107"), Some(107.0));
        assert_eq!(features.get("footer"), None);
    }

    #[test]
    fn test_parse_feature_file_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = parse_feature_file(tmp.path(), "P404", Modality::Diff, true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_feature_file_non_numeric_is_hard_error() {
        let tmp = TempDir::new().unwrap();
        write_feature_file(
            tmp.path(),
            "P005",
            Modality::Diff,
            "1 Mar 2006",
            &[("Volume", "NULL")],
            false,
        );

        let err = parse_feature_file(tmp.path(), "P005", Modality::Diff, false).unwrap_err();
        assert!(matches!(err, ScreenError::Parse { line: Some(19), .. }));
    }
}
