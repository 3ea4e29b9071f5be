//! Error types for the keyed reader.
//!
//! - [`KeyedError`] - fatal errors raised while reading a header or a row
//! - [`WarningSet`] - non-fatal report of duplicate rows dropped by a collection pass
//!
//! `KeyedError::EndOfData` is the normal termination signal of
//! [`crate::KeyedReader::read`]; it never escapes [`crate::read_all`].

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::SortKey;

// =============================================================================
// Reader Errors
// =============================================================================

/// Errors raised by [`crate::KeyedReader`] and [`crate::RecordSource`] implementations.
#[derive(Debug, Error)]
pub enum KeyedError {
    /// Two header columns share the same name.
    #[error("Multiple columns with the same name '{0}'")]
    DuplicateHeaderName(String),

    /// A requested key column is not part of the header.
    #[error("No key '{0}' in the header")]
    UnknownKey(String),

    /// Rows were requested before a header was read.
    #[error("No header read")]
    HeaderNotRead,

    /// `read_header` was called on a reader that already has a header.
    #[error("Header already read")]
    HeaderAlreadyRead,

    /// The source ended before a header record.
    #[error("Input is empty, no header record")]
    EmptyInput,

    /// The underlying source could not split a record.
    #[error("Malformed record{}: {message}", fmt_line(.line))]
    MalformedRecord { line: Option<u64>, message: String },

    /// Failed to open or read the input.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the input bytes.
    #[error("Failed to decode input: {0}")]
    Encoding(String),

    /// Invalid reader configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The source is exhausted.
    #[error("End of data")]
    EndOfData,
}

fn fmt_line(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" at line {}", line),
        None => String::new(),
    }
}

impl KeyedError {
    /// Whether this is the end-of-data signal rather than a failure.
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, KeyedError::EndOfData)
    }

    /// Build a [`KeyedError::MalformedRecord`].
    pub fn malformed(line: Option<u64>, message: impl Into<String>) -> Self {
        KeyedError::MalformedRecord {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for KeyedError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            if let csv::ErrorKind::Io(io) = err.into_kind() {
                return KeyedError::Io(io);
            }
            return KeyedError::Io(std::io::Error::other("csv I/O error"));
        }
        let line = err.position().map(|pos| pos.line());
        KeyedError::malformed(line, err.to_string())
    }
}

// =============================================================================
// Warnings
// =============================================================================

/// A row discarded because an earlier row had the same sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRow {
    /// Line of the discarded record in the source.
    pub line: u64,
    /// The sort key shared with the row that was kept.
    pub sort_key: SortKey,
    /// Human-readable contents of the discarded row.
    pub description: String,
}

impl fmt::Display for DuplicateRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Duplicate rows dropped during a single collection pass.
///
/// Returned next to the collected rows, never instead of them. Callers
/// usually log it and carry on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("WARN: duplicated: {}", join_descriptions(.duplicates))]
pub struct WarningSet {
    duplicates: Vec<DuplicateRow>,
}

fn join_descriptions(duplicates: &[DuplicateRow]) -> String {
    duplicates
        .iter()
        .map(|d| d.description.as_str())
        .collect::<Vec<_>>()
        .join("\n      ")
}

impl WarningSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discarded row.
    pub fn add(&mut self, duplicate: DuplicateRow) {
        self.duplicates.push(duplicate);
    }

    /// Number of discarded rows.
    pub fn len(&self) -> usize {
        self.duplicates.len()
    }

    /// Whether no row was discarded.
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }

    /// Discarded rows in input order.
    pub fn duplicates(&self) -> &[DuplicateRow] {
        &self.duplicates
    }

    /// Iterate over discarded rows in input order.
    pub fn iter(&self) -> impl Iterator<Item = &DuplicateRow> {
        self.duplicates.iter()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for reader operations.
pub type KeyedResult<T> = Result<T, KeyedError>;
