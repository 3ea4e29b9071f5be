//! Domain models for keyed table reading.
//!
//! - [`Header`] - column names of a table, unique
//! - [`KeySet`] - key columns chosen by the caller, resolved against the header
//! - [`SortKey`] - composite key of a row, used for deduplication and ordering
//! - [`Row`] - one record mapped by column name

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{KeyedError, KeyedResult};

/// Separator used by [`SortKey::joined`].
pub const KEY_SEPARATOR: &str = "\n";

// =============================================================================
// Header
// =============================================================================

/// Ordered, duplicate-free column names read from the first record.
///
/// Serialized as a plain list of names; deserialization goes through
/// [`Header::new`] so a repeated name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    /// Build a header, failing on the first repeated name.
    pub fn new(names: Vec<String>) -> KeyedResult<Self> {
        let mut defined = HashSet::with_capacity(names.len());
        for name in &names {
            if !defined.insert(name.as_str()) {
                return Err(KeyedError::DuplicateHeaderName(name.clone()));
            }
        }
        Ok(Self { names })
    }

    /// Column names in header order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the header has no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a column by exact name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl TryFrom<Vec<String>> for Header {
    type Error = KeyedError;

    fn try_from(names: Vec<String>) -> KeyedResult<Self> {
        Self::new(names)
    }
}

impl From<Header> for Vec<String> {
    fn from(header: Header) -> Self {
        header.names
    }
}

// =============================================================================
// Key Set
// =============================================================================

/// Key columns in caller order, each resolved to its header position.
///
/// Only [`KeySet::resolve`] builds one, so positions always match a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySet {
    names: Vec<String>,
    positions: Vec<usize>,
}

impl KeySet {
    /// Resolve `names` against `header`; the first missing one is reported.
    pub fn resolve<S: AsRef<str>>(header: &Header, names: &[S]) -> KeyedResult<Self> {
        let mut resolved = Vec::with_capacity(names.len());
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let pos = header
                .position(name)
                .ok_or_else(|| KeyedError::UnknownKey(name.to_string()))?;
            resolved.push(name.to_string());
            positions.push(pos);
        }
        Ok(Self {
            names: resolved,
            positions,
        })
    }

    /// Key column names in caller order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Header positions, parallel to [`KeySet::names`].
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of key columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no key column was requested.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Extract the sort key of a raw record. Missing fields become empty values.
    pub fn sort_key(&self, fields: &[String]) -> SortKey {
        SortKey(
            self.positions
                .iter()
                .map(|&pos| fields.get(pos).cloned().unwrap_or_default())
                .collect(),
        )
    }
}

// =============================================================================
// Sort Key
// =============================================================================

/// Key-column values of a row, in key order.
///
/// Ordering is lexicographic field by field, so a value containing
/// [`KEY_SEPARATOR`] cannot collide with a neighbouring key. Only the
/// [`SortKey::joined`] rendering is ambiguous in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKey(Vec<String>);

impl SortKey {
    /// Wrap key values given in key order.
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// Key values in key order.
    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Values joined with [`KEY_SEPARATOR`].
    pub fn joined(&self) -> String {
        self.0.join(KEY_SEPARATOR)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for SortKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Row
// =============================================================================

/// One record of the table, mapped by column name.
///
/// Built only by [`Row::from_record`], so the sort key always matches the
/// key columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    columns: BTreeMap<String, String>,
    sort_key: SortKey,
    line: u64,
}

impl Row {
    /// Zip header names with field values and attach the record's sort key.
    ///
    /// Fields past the header length have no name and are dropped.
    pub fn from_record(header: &Header, keys: &KeySet, fields: &[String], line: u64) -> Self {
        let columns = header
            .names()
            .iter()
            .zip(fields)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            columns,
            sort_key: keys.sort_key(fields),
            line,
        }
    }

    /// Value of a column, if the header has it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// All columns, ordered by name.
    pub fn columns(&self) -> &BTreeMap<String, String> {
        &self.columns
    }

    /// Composite key derived from the key columns.
    pub fn sort_key(&self) -> &SortKey {
        &self.sort_key
    }

    /// Line of the record in the source (1-based).
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Take the column map, dropping the key and line.
    pub fn into_columns(self) -> BTreeMap<String, String> {
        self.columns
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {{", self.line)?;
        for (i, (name, value)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        f.write_str("}")
    }
}
