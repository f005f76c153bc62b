//! Readers for the study roster and the overview identity table.
//!
//! Both are semicolon-delimited tables with a header row. Column layout is
//! fixed by the export convention, so fields are read by position rather than
//! by header name.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};

use crate::core::cohort::MetadataRow;
use crate::core::errors::{Result, ScreenError};
use crate::core::identity::{OverviewRow, OverviewTable};

/// Date format of the overview table's exam-date column.
const OVERVIEW_DATE_FORMAT: &str = "%Y-%m-%d";

fn open_table(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            ScreenError::not_found(format!("table {}", path.display()))
        } else {
            ScreenError::io(format!("failed to open {}", path.display()), err)
        }
    })?;

    Ok(ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

fn field<'r>(record: &'r StringRecord, column: usize, path: &Path, row: usize) -> Result<&'r str> {
    record.get(column).ok_or_else(|| {
        ScreenError::parse(
            path,
            format!("row has no column {column}"),
            Some(row),
        )
    })
}

fn numeric_field(record: &StringRecord, column: usize, path: &Path, row: usize) -> Result<f64> {
    let raw = field(record, column, path, row)?;
    raw.trim().parse().map_err(|_| {
        ScreenError::parse(
            path,
            format!("non-numeric value '{}' in column {column}", raw.trim()),
            Some(row),
        )
    })
}

/// Load the study roster.
///
/// Six fixed columns: exam id, sex, age, tesla, multiclass label, binary
/// label. The roster is the source of truth for cohort membership.
pub fn load_metadata(path: &Path) -> Result<Vec<MetadataRow>> {
    let mut reader = open_table(path)?;
    let mut rows = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // header occupies line 1
        let line = i + 2;

        rows.push(MetadataRow {
            exam_id: field(&record, 0, path, line)?.trim().to_string(),
            sex: numeric_field(&record, 1, path, line)?,
            age: numeric_field(&record, 2, path, line)?,
            tesla: numeric_field(&record, 3, path, line)?,
            multiclass_label: numeric_field(&record, 4, path, line)?,
            binary_label: numeric_field(&record, 5, path, line)?,
        });
    }

    Ok(rows)
}

/// Load the overview identity table.
///
/// Column 0 is the canonical id, column 1 the anonymized id (free text,
/// normalized at lookup time), column 5 the exam date as `YYYY-MM-DD`.
pub fn load_overview(path: &Path) -> Result<OverviewTable> {
    let mut reader = open_table(path)?;
    let mut rows = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;

        let raw_date = field(&record, 5, path, line)?.trim().to_string();
        let exam_date = NaiveDate::parse_from_str(&raw_date, OVERVIEW_DATE_FORMAT)
            .map_err(|_| ScreenError::format_with_raw("overview date is not YYYY-MM-DD", raw_date))?;

        rows.push(OverviewRow {
            canonical_id: field(&record, 0, path, line)?.trim().to_string(),
            anonymized_id: field(&record, 1, path, line)?.trim().to_string(),
            exam_date,
        });
    }

    Ok(OverviewTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::TempDir;

    #[test]
    fn test_load_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("overview.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "id;sex;age;tesla;multiclass;binary").unwrap();
        writeln!(file, "P001;1;54;3;2;1").unwrap();
        writeln!(file, "P002;0;61.5;1.5;0;0").unwrap();

        let rows = load_metadata(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].exam_id, "P001");
        assert_eq!(rows[0].binary_label, 1.0);
        assert_eq!(rows[1].age, 61.5);
        assert_eq!(rows[1].tesla, 1.5);
    }

    #[test]
    fn test_load_metadata_rejects_non_numeric_labels() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("overview.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "id;sex;age;tesla;multiclass;binary").unwrap();
        writeln!(file, "P001;1;54;3;2;yes").unwrap();

        let err = load_metadata(&path).unwrap_err();
        assert!(matches!(err, ScreenError::Parse { line: Some(2), .. }));
    }

    #[test]
    fn test_load_metadata_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load_metadata(&tmp.path().join("nope.csv")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_overview_reads_columns_0_1_5() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("overview_complet.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "canonical;anon;a;b;c;date").unwrap();
        writeln!(file, "P001;IGR 042;x;y;z;2004-01-12").unwrap();

        let table = load_overview(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].canonical_id, "P001");
        assert_eq!(table.rows[0].anonymized_id, "IGR 042");
        assert_eq!(
            table.rows[0].exam_date,
            NaiveDate::from_ymd_opt(2004, 1, 12).unwrap()
        );
    }

    #[test]
    fn test_load_overview_rejects_bad_date_cell() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("overview_complet.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "canonical;anon;a;b;c;date").unwrap();
        writeln!(file, "P001;IGR 042;x;y;z;12 Jan 2004").unwrap();

        let err = load_overview(&path).unwrap_err();
        assert!(matches!(err, ScreenError::Format { .. }));
    }
}
