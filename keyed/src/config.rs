//! Reader configuration.
//!
//! [`ReaderConfig`] controls how [`crate::CsvSource`] splits records. It can
//! be built in code, deserialized, or loaded from `KEYED_CSV_*` environment
//! variables (a `.env` file is honoured).

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

pub const ENV_DELIMITER: &str = "KEYED_CSV_DELIMITER";
pub const ENV_ENCODING: &str = "KEYED_CSV_ENCODING";
pub const ENV_TRIM: &str = "KEYED_CSV_TRIM";
pub const ENV_QUOTING: &str = "KEYED_CSV_QUOTING";

/// Invalid configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Delimiter must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(String),

    #[error("Invalid boolean for {name}: '{value}'")]
    InvalidBool { name: String, value: String },
}

/// Options for splitting a delimited text stream into records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Field delimiter. `None` means `,` for streams and auto-detection for byte input.
    pub delimiter: Option<char>,

    /// Input encoding. `None` means auto-detection for byte input.
    pub encoding: Option<String>,

    /// Trim whitespace around every field.
    pub trim: bool,

    /// Honour double-quoted fields.
    pub quoting: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: None,
            trim: false,
            quoting: true,
        }
    }
}

impl ReaderConfig {
    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set the input encoding label.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Trim whitespace around fields.
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Honour or ignore double quotes.
    pub fn with_quoting(mut self, quoting: bool) -> Self {
        self.quoting = quoting;
        self
    }

    /// Load from `KEYED_CSV_*` variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DELIMITER) {
            config.delimiter = Some(parse_delimiter(&raw)?);
        }
        if let Some(raw) = lookup(ENV_ENCODING) {
            if !raw.trim().is_empty() {
                config.encoding = Some(raw.trim().to_string());
            }
        }
        if let Some(raw) = lookup(ENV_TRIM) {
            config.trim = parse_bool(ENV_TRIM, &raw)?;
        }
        if let Some(raw) = lookup(ENV_QUOTING) {
            config.quoting = parse_bool(ENV_QUOTING, &raw)?;
        }

        Ok(config)
    }

    /// Delimiter as the byte the csv reader expects, `,` when unset.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter {
            None => Ok(b','),
            Some(c) if c.is_ascii() => Ok(c as u8),
            Some(c) => Err(ConfigError::InvalidDelimiter(c.to_string())),
        }
    }
}

fn parse_delimiter(raw: &str) -> Result<char, ConfigError> {
    if raw == "\\t" || raw.eq_ignore_ascii_case("tab") {
        return Ok('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(ConfigError::InvalidDelimiter(raw.to_string())),
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}
