//! Collect a keyed table into deduplicated, sorted rows.
//!
//! Two tables collected this way can be merge-compared in a single
//! synchronized scan, since both come out in ascending [`SortKey`] order.
//!
//! ```text
//! input order             seen keys          output (sorted)
//! ┌──────────────┐       ┌──────────┐       ┌──────────────┐
//! │ 2, BBB       │  →    │ 2        │       │ 1, aaa       │
//! │ 1, aaa       │  →    │ 2, 1     │  →    │ 2, BBB       │
//! │ 2, BBB-again │  ✗    │          │       └──────────────┘
//! └──────────────┘       └──────────┘       warning: 1 duplicate
//! ```

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{DuplicateRow, KeyedError, KeyedResult, WarningSet};
use crate::models::{Row, SortKey};
use crate::reader::KeyedReader;
use crate::source::RecordSource;

/// Rows surviving a collection pass, plus the duplicates that were dropped.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Unique rows in ascending sort-key order.
    pub rows: Vec<Row>,
    /// Rows dropped because their key was already taken.
    pub warnings: WarningSet,
}

impl Collected {
    /// The duplicate report, if any row was dropped.
    pub fn warning(&self) -> Option<&WarningSet> {
        if self.warnings.is_empty() {
            None
        } else {
            Some(&self.warnings)
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split into rows and an optional non-fatal warning.
    pub fn into_parts(self) -> (Vec<Row>, Option<WarningSet>) {
        let warning = if self.warnings.is_empty() {
            None
        } else {
            Some(self.warnings)
        };
        (self.rows, warning)
    }
}

/// Drain `reader` into unique rows sorted by sort key.
///
/// The first row seen for a key is kept; later rows with the same key are
/// dropped and reported in [`Collected::warnings`]. Any read error other than
/// end of data aborts the pass.
pub fn read_all<S: RecordSource>(reader: &mut KeyedReader<S>) -> KeyedResult<Collected> {
    if !reader.has_header() {
        return Err(KeyedError::HeaderNotRead);
    }

    let mut seen: HashSet<SortKey> = HashSet::new();
    let mut collected = Collected::default();

    loop {
        let row = match reader.read() {
            Ok(row) => row,
            Err(KeyedError::EndOfData) => break,
            Err(err) => return Err(err),
        };

        if seen.contains(row.sort_key()) {
            warn!(line = row.line(), key = %row.sort_key(), "duplicated key, row dropped");
            collected.warnings.add(DuplicateRow {
                line: row.line(),
                sort_key: row.sort_key().clone(),
                description: row.to_string(),
            });
        } else {
            seen.insert(row.sort_key().clone());
            collected.rows.push(row);
        }
    }

    sort_rows(&mut collected.rows);

    debug!(
        rows = collected.rows.len(),
        duplicates = collected.warnings.len(),
        "collected keyed rows"
    );
    Ok(collected)
}

/// Stable ascending sort by sort key.
pub fn sort_rows(rows: &mut [Row]) {
    rows.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
}
