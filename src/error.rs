//! Unified error types for colloquy-logs.
//!
//! This module provides a single [`LogError`] enum that covers every failure
//! the conversion and merge pipelines can report.
//!
//! # Error Taxonomy
//!
//! | Kind | Variants | Handling |
//! |------|----------|----------|
//! | Structural mismatch | [`StructuralMismatch`](LogError::StructuralMismatch) | Skipped with a warning in lenient mode |
//! | Timestamp parse failure | [`InvalidTimestamp`](LogError::InvalidTimestamp), [`UnorderableLine`](LogError::UnorderableLine) | Governed by [`UnparsedPolicy`](crate::config::UnparsedPolicy) |
//! | Filesystem | [`Io`](LogError::Io), [`Filesystem`](LogError::Filesystem), [`Walk`](LogError::Walk), [`MissingDirectory`](LogError::MissingDirectory) | Fatal, never retried |

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A specialized [`Result`] type for colloquy-logs operations.
///
/// # Example
///
/// ```rust
/// use colloquy_logs::error::Result;
///
/// fn count_pairs() -> Result<usize> {
///     Ok(0)
/// }
/// ```
pub type Result<T> = std::result::Result<T, LogError>;

/// The error type for all colloquy-logs operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogError {
    /// An I/O error occurred without a known path.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An I/O error occurred while touching a specific file or directory.
    #[error("IO error on {}: {source}", path.display())]
    Filesystem {
        /// The file or directory being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed.
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// A root directory given to the locator or converter does not exist.
    #[error("Directory not found: {}", path.display())]
    MissingDirectory {
        /// The directory that was expected
        path: PathBuf,
    },

    /// A bracketed timestamp could not be parsed as a date-time.
    #[error("Invalid timestamp '{input}'. Expected format: {expected}")]
    InvalidTimestamp {
        /// The timestamp text between the brackets
        input: String,
        /// Expected format description
        expected: &'static str,
    },

    /// A line without a usable timestamp reached a comparison while the merge
    /// runs with [`UnparsedPolicy::Fail`](crate::config::UnparsedPolicy::Fail).
    #[error("Cannot order line {line_number}{}: {line}", path.as_ref().map(|p| format!(" of {}", p.display())).unwrap_or_default())]
    UnorderableLine {
        /// The file the line came from, if known
        path: Option<PathBuf>,
        /// 1-based line number within that file
        line_number: usize,
        /// The raw line
        line: String,
    },

    /// A transcript element has an unrecognized shape or misses a required field.
    #[error("Unexpected <{element}> in {}: {message}", path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "transcript".to_string()))]
    StructuralMismatch {
        /// The transcript being converted, if known
        path: Option<PathBuf>,
        /// The offending element name
        element: String,
        /// What is wrong with it
        message: String,
    },

    /// A transcript file name does not follow `<name> <MM-DD-YY>`.
    #[error("Invalid transcript name '{name}'. Expected: {expected}")]
    TranscriptName {
        /// The file stem that failed to parse
        name: String,
        /// Expected naming pattern
        expected: &'static str,
    },

    /// The transcript is not well-formed XML.
    #[cfg(feature = "convert")]
    #[error("Malformed transcript XML{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Xml {
        /// The transcript file, if known
        path: Option<PathBuf>,
        /// The underlying XML error
        #[source]
        source: quick_xml::Error,
    },
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl LogError {
    /// Wraps an I/O error with the path it happened on.
    pub fn fs(path: impl AsRef<Path>, source: io::Error) -> Self {
        LogError::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a missing directory error.
    pub fn missing_directory(path: impl AsRef<Path>) -> Self {
        LogError::MissingDirectory {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates an invalid timestamp error.
    pub fn invalid_timestamp(input: impl Into<String>) -> Self {
        LogError::InvalidTimestamp {
            input: input.into(),
            expected: "MM/DD/YYYY -:- HH:MM:SS AM|PM",
        }
    }

    /// Creates a structural mismatch error.
    pub fn structural(
        path: Option<PathBuf>,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LogError::StructuralMismatch {
            path,
            element: element.into(),
            message: message.into(),
        }
    }

    /// Creates a transcript naming error.
    pub fn transcript_name(name: impl Into<String>) -> Self {
        LogError::TranscriptName {
            name: name.into(),
            expected: "<name> <MM-DD-YY>.colloquyTranscript",
        }
    }

    /// Creates an XML error for the given transcript.
    #[cfg(feature = "convert")]
    pub fn xml(source: quick_xml::Error, path: Option<PathBuf>) -> Self {
        LogError::Xml { path, source }
    }

    /// Returns `true` if this is a filesystem-level error.
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            LogError::Io(_)
                | LogError::Filesystem { .. }
                | LogError::Walk(_)
                | LogError::MissingDirectory { .. }
        )
    }

    /// Returns `true` if this error comes from an unparseable timestamp.
    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            LogError::InvalidTimestamp { .. } | LogError::UnorderableLine { .. }
        )
    }

    /// Returns `true` if this is a transcript structure error.
    pub fn is_structural(&self) -> bool {
        matches!(self, LogError::StructuralMismatch { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = LogError::from(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        let display = err.to_string();
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_filesystem_error_includes_path() {
        let err = LogError::fs(
            "/logs/Channels/foo/2024-01-01.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = err.to_string();
        assert!(display.contains("/logs/Channels/foo/2024-01-01.txt"));
        assert!(display.contains("denied"));
        assert!(err.is_filesystem());
    }

    #[test]
    fn test_invalid_timestamp_display() {
        let err = LogError::invalid_timestamp("13/45/2024 -:- 99:00:00 AM");
        let display = err.to_string();
        assert!(display.contains("13/45/2024"));
        assert!(display.contains("MM/DD/YYYY"));
        assert!(err.is_timestamp());
    }

    #[test]
    fn test_unorderable_line_with_and_without_path() {
        let err = LogError::UnorderableLine {
            path: Some(PathBuf::from("a/b/c.txt")),
            line_number: 7,
            line: "garbage".into(),
        };
        assert!(err.to_string().contains("line 7 of a/b/c.txt"));

        let err = LogError::UnorderableLine {
            path: None,
            line_number: 3,
            line: "garbage".into(),
        };
        assert!(err.to_string().contains("line 3: garbage"));
        assert!(err.is_timestamp());
    }

    #[test]
    fn test_structural_mismatch_display() {
        let err = LogError::structural(None, "envelope", "missing <sender>");
        let display = err.to_string();
        assert!(display.contains("<envelope>"));
        assert!(display.contains("missing <sender>"));
        assert!(err.is_structural());
        assert!(!err.is_filesystem());
    }

    #[test]
    fn test_transcript_name_display() {
        let err = LogError::transcript_name("nodate");
        assert!(err.to_string().contains("nodate"));
        assert!(err.to_string().contains("MM-DD-YY"));
    }

    #[test]
    fn test_missing_directory() {
        let err = LogError::missing_directory("/nope");
        assert!(err.is_filesystem());
        assert!(err.to_string().contains("/nope"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;
        let err = LogError::fs("x", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());

        let err = LogError::invalid_timestamp("bad");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_error_debug() {
        let err = LogError::invalid_timestamp("bad");
        assert!(format!("{:?}", err).contains("InvalidTimestamp"));
    }
}
