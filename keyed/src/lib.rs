//! # keyed-csv - CSV tables keyed by columns
//!
//! Reads a delimited table, validates its header against a set of key
//! columns, and collects its rows deduplicated and sorted by the composite
//! key. Two tables collected this way can be diffed with a lockstep scan.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV bytes  │────▶│   Source    │────▶│ KeyedReader │────▶│  Collector  │
//! │  (any enc)  │     │ (csv crate) │     │ (header+key)│     │(dedup+sort) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use keyed_csv::{KeyedReader, ReaderConfig};
//!
//! let data = "id,name\n2,bbb\n1,aaa\n2,BBB\n";
//! let mut reader = KeyedReader::from_reader(data.as_bytes(), &ReaderConfig::default()).unwrap();
//! reader.read_header(&["id"]).unwrap();
//!
//! let collected = reader.read_all().unwrap();
//! assert_eq!(collected.rows.len(), 2);
//! assert_eq!(collected.rows[0].get("name"), Some("aaa"));
//! assert_eq!(collected.warning().map(|w| w.len()), Some(1));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Fatal errors and the duplicate-row warning
//! - [`config`] - Reader configuration
//! - [`models`] - Header, key set, sort key and row
//! - [`source`] - Record sources and input detection
//! - [`reader`] - Keyed reader
//! - [`collector`] - Deduplicating, sorting collection pass

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Reading
pub mod source;
pub mod reader;

// Collection
pub mod collector;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{DuplicateRow, KeyedError, KeyedResult, WarningSet};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ConfigError, ReaderConfig};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Header, KeySet, Row, SortKey, KEY_SEPARATOR};

// =============================================================================
// Re-exports - Sources
// =============================================================================

pub use source::{
    CsvSource,
    MemorySource,
    RawRecord,
    RecordSource,
    decode_content,
    decode_detected,
    detect_delimiter,
    detect_encoding,
};

// =============================================================================
// Re-exports - Reader & Collector
// =============================================================================

pub use reader::{KeyedReader, Rows};
pub use collector::{read_all, sort_rows, Collected};
