//! Error types for the parotid-screen library.
//!
//! One structured error enum covers the whole pipeline. The taxonomy follows
//! the run policy: a missing per-exam file is the only recoverable condition
//! (the aggregator skips the exam), everything else aborts the run because it
//! indicates corrupted input that needs human investigation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main result type for parotid-screen operations.
pub type Result<T> = std::result::Result<T, ScreenError>;

/// Error type for all pipeline operations.
#[derive(Error, Debug)]
pub enum ScreenError {
    /// Unparsable exam-date header field
    #[error("Date format error: {message}")]
    Format {
        /// Error description
        message: String,
        /// Raw text that failed to parse
        raw: Option<String>,
    },

    /// Non-numeric content in a feature file
    #[error("Parse error in {}: {message}", .path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Error description
        message: String,
        /// 1-indexed line number (if available)
        line: Option<usize>,
    },

    /// Missing file or identity-lookup miss
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked up
        message: String,
    },

    /// Filename suffix that maps to no known modality
    #[error("Classification error: {message}")]
    Classification {
        /// Error description
        message: String,
    },

    /// Data-integrity violation (date mismatch, schema divergence, empty cohort)
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Exam or field the violation belongs to
        subject: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// I/O errors other than a missing feature file
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ScreenError {
    /// Create a new date-format error
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
            raw: None,
        }
    }

    /// Create a new date-format error carrying the offending text
    pub fn format_with_raw(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
            raw: Some(raw.into()),
        }
    }

    /// Create a new parse error with file context
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>, line: Option<usize>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line,
        }
    }

    /// Create a new not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new classification error
    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            subject: None,
        }
    }

    /// Create a new validation error scoped to an exam or field
    pub fn validation_for(message: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            subject: Some(subject.into()),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// True for the one condition the aggregator treats as skip-and-continue.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<io::Error> for ScreenError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for ScreenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for ScreenError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML deserialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<csv::Error> for ScreenError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization {
            message: format!("CSV read failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ScreenError::format("unknown month abbreviation");
        assert!(matches!(err, ScreenError::Format { .. }));

        let err = ScreenError::classification("no modality suffix");
        assert!(matches!(err, ScreenError::Classification { .. }));
    }

    #[test]
    fn test_not_found_is_the_only_skippable_error() {
        assert!(ScreenError::not_found("exam P012").is_not_found());
        assert!(!ScreenError::validation("date mismatch").is_not_found());
        assert!(!ScreenError::format("bad month").is_not_found());
    }

    #[test]
    fn test_parse_error_display_carries_path() {
        let err = ScreenError::parse("/data/exams/P001_T2.csv", "non-numeric value", Some(42));
        let display = format!("{err}");
        assert!(display.contains("P001_T2.csv"));
        assert!(display.contains("non-numeric value"));
    }

    #[test]
    fn test_validation_for_subject() {
        let err = ScreenError::validation_for("exam dates differ across modalities", "P007");
        if let ScreenError::Validation { subject, .. } = err {
            assert_eq!(subject, Some("P007".to_string()));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: ScreenError = io_err.into();
        assert!(matches!(err, ScreenError::Io { .. }));
    }
}
