// error.rs - Error types shared by the statistics and cleaning engines

use crate::stats::SeriesKind;
use thiserror::Error;

/// Why a set of sibling alignments cannot be compared column by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparesetMismatch {
    /// The alignment holds a different number of sequences than the first one
    SequenceCount { expected: usize, found: usize },
    /// The alignment names a sequence the first one does not contain
    SequenceNames { missing: String },
}

impl std::fmt::Display for ComparesetMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparesetMismatch::SequenceCount { expected, found } => {
                write!(f, "expected {} sequences, found {}", expected, found)
            }
            ComparesetMismatch::SequenceNames { missing } => {
                write!(f, "sequence '{}' is not shared by every alignment", missing)
            }
        }
    }
}

/// Main error type for trimming operations
#[derive(Error, Debug)]
pub enum TrimError {
    /// A half window larger than a quarter of the alignment length
    #[error("{kind} window half-size {half_window} exceeds the limit of {limit} columns")]
    WindowTooBig {
        kind: SeriesKind,
        half_window: usize,
        limit: usize,
    },

    /// Conservation scoring was requested without a substitution matrix
    #[error("no substitution matrix available for conservation scoring")]
    MissingSubstitutionMatrix,

    /// Sibling alignments do not describe the same sequences
    #[error("alignment #{index} in the compareset is inconsistent: {mismatch}")]
    InconsistentCompareset {
        index: usize,
        mismatch: ComparesetMismatch,
    },

    /// Consistency scoring without any alignment to compare
    #[error("the compareset does not contain any alignment")]
    EmptyCompareset,

    /// Too little left of the alignment for the requested pass
    #[error("alignment too small for {operation}: {sequences} sequences, {residues} columns")]
    DegenerateAlignment {
        operation: &'static str,
        sequences: usize,
        residues: usize,
    },

    /// User-supplied terminal boundaries out of order or out of range
    #[error("invalid terminal boundaries: left {left}, right {right} (alignment has {residues} columns)")]
    InvalidBoundaries {
        left: usize,
        right: usize,
        residues: usize,
    },

    /// Parameter outside of its accepted range
    #[error("invalid value for {name}: {message}")]
    InvalidParameter { name: String, message: String },

    /// Malformed alignment content (unaligned rows, empty input, bad records)
    #[error("alignment format error: {message}")]
    Format { message: String },

    /// Malformed substitution matrix file
    #[error("substitution matrix error at line {line}: {message}")]
    InvalidSubstitutionMatrix { line: usize, message: String },

    /// Configuration file problems
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Type alias for Results using TrimError
pub type Result<T> = std::result::Result<T, TrimError>;

impl TrimError {
    /// Create a format error
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a substitution matrix parse error
    pub fn matrix(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidSubstitutionMatrix {
            line,
            message: message.into(),
        }
    }

    pub fn degenerate(operation: &'static str, sequences: usize, residues: usize) -> Self {
        Self::DegenerateAlignment {
            operation,
            sequences,
            residues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_error_message() {
        let err = TrimError::WindowTooBig {
            kind: SeriesKind::Gaps,
            half_window: 9,
            limit: 2,
        };
        assert_eq!(
            err.to_string(),
            "gaps window half-size 9 exceeds the limit of 2 columns"
        );
    }

    #[test]
    fn test_compareset_message_names_alignment() {
        let err = TrimError::InconsistentCompareset {
            index: 2,
            mismatch: ComparesetMismatch::SequenceCount {
                expected: 4,
                found: 3,
            },
        };
        let message = err.to_string();
        assert!(message.contains("#2"));
        assert!(message.contains("expected 4 sequences, found 3"));
    }
}
