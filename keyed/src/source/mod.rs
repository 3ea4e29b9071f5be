//! Record sources: the field-splitting layer below [`crate::KeyedReader`].
//!
//! A [`RecordSource`] yields ordered field values one record at a time.
//! [`CsvSource`] is the stock implementation on top of the `csv` crate, with
//! encoding and delimiter auto-detection for raw byte input.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use encoding_rs::Encoding;
use tracing::debug;

use crate::config::ReaderConfig;
use crate::error::{KeyedError, KeyedResult};

/// One record as split by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line where the record starts.
    pub line: u64,
    /// Field values in column order.
    pub fields: Vec<String>,
}

/// Sequential source of records.
///
/// `Ok(None)` means the source is exhausted. Split failures are reported as
/// [`KeyedError::MalformedRecord`].
pub trait RecordSource {
    fn read_record(&mut self) -> KeyedResult<Option<RawRecord>>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn read_record(&mut self) -> KeyedResult<Option<RawRecord>> {
        (**self).read_record()
    }
}

/// Records that are already split, held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    records: std::vec::IntoIter<Vec<String>>,
    line: u64,
}

impl MemorySource {
    pub fn new(records: Vec<Vec<String>>) -> Self {
        Self {
            records: records.into_iter(),
            line: 0,
        }
    }
}

impl From<Vec<Vec<String>>> for MemorySource {
    fn from(records: Vec<Vec<String>>) -> Self {
        Self::new(records)
    }
}

impl RecordSource for MemorySource {
    fn read_record(&mut self) -> KeyedResult<Option<RawRecord>> {
        Ok(self.records.next().map(|fields| {
            self.line += 1;
            RawRecord {
                line: self.line,
                fields,
            }
        }))
    }
}

// =============================================================================
// CSV Source
// =============================================================================

/// [`RecordSource`] over a `csv::Reader`.
///
/// The header is not treated specially: it is simply the first record.
/// Records whose field count differs from the first record are reported as
/// malformed.
pub struct CsvSource<R> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R, config: &ReaderConfig) -> KeyedResult<Self> {
        let trim = if config.trim {
            csv::Trim::All
        } else {
            csv::Trim::None
        };
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(config.delimiter_byte()?)
            .quoting(config.quoting)
            .trim(trim)
            .from_reader(reader);
        Ok(Self {
            reader,
            record: csv::StringRecord::new(),
        })
    }
}

impl CsvSource<File> {
    /// Open a file with the configured delimiter (`,` when unset).
    pub fn from_path<P: AsRef<Path>>(path: P, config: &ReaderConfig) -> KeyedResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file, config)
    }
}

impl CsvSource<Cursor<Vec<u8>>> {
    /// Decode raw bytes and split them.
    ///
    /// Encoding and delimiter come from `config` when set, otherwise they are
    /// detected from the content.
    pub fn from_bytes(bytes: &[u8], config: &ReaderConfig) -> KeyedResult<Self> {
        let (encoding, content) = match &config.encoding {
            Some(label) => (label.clone(), decode_content(bytes, label)?),
            None => {
                let label = detect_encoding(bytes);
                let content = decode_detected(bytes, &label);
                (label, content)
            }
        };
        let delimiter = config
            .delimiter
            .unwrap_or_else(|| detect_delimiter(&content));
        debug!(%encoding, delimiter = %delimiter.escape_debug(), "decoded csv input");

        let resolved = ReaderConfig {
            delimiter: Some(delimiter),
            encoding: Some(encoding),
            ..config.clone()
        };
        Self::from_reader(Cursor::new(content.into_bytes()), &resolved)
    }
}

impl<R: Read> RecordSource for CsvSource<R> {
    fn read_record(&mut self) -> KeyedResult<Option<RawRecord>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        let line = self.record.position().map(|pos| pos.line()).unwrap_or(0);
        Ok(Some(RawRecord {
            line,
            fields: self.record.iter().map(String::from).collect(),
        }))
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Detect the encoding of raw bytes, normalized to a WHATWG label.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "maccyrillic" => "x-mac-cyrillic".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using an encoding label given by the caller.
///
/// UTF-8 input with invalid sequences is decoded lossily and a leading BOM is
/// dropped. Unknown labels, and labels that only map to the replacement
/// decoder, are rejected.
pub fn decode_content(bytes: &[u8], encoding: &str) -> KeyedResult<String> {
    let label = encoding.trim().to_lowercase();
    if matches!(label.as_str(), "utf-8" | "utf8" | "ascii") {
        return Ok(decode_utf8_lossy(bytes));
    }

    match Encoding::for_label(label.as_bytes()) {
        Some(enc) if enc != encoding_rs::REPLACEMENT => {
            let (decoded, _, _) = enc.decode(bytes);
            Ok(decoded.into_owned())
        }
        _ => Err(KeyedError::Encoding(format!("unknown encoding '{}'", encoding))),
    }
}

/// Decode bytes using a label produced by [`detect_encoding`].
///
/// Labels encoding_rs cannot decode fall back to lossy UTF-8.
pub fn decode_detected(bytes: &[u8], encoding: &str) -> String {
    decode_content(bytes, encoding).unwrap_or_else(|_| {
        debug!(%encoding, "unsupported detected encoding, decoding as utf-8");
        decode_utf8_lossy(bytes)
    })
}

fn decode_utf8_lossy(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Detect the delimiter by counting candidates in the first line.
///
/// Ties go to the earlier candidate; `,` wins when nothing matches.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn collect<S: RecordSource>(mut source: S) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        while let Some(record) = source.read_record().unwrap() {
            out.push(record.fields);
        }
        out
    }

    #[test]
    fn test_csv_source_reads_header_as_record() {
        let source = CsvSource::from_reader("id,name\n1,aaa\n".as_bytes(), &ReaderConfig::default())
            .unwrap();
        assert_eq!(collect(source), vec![vec!["id", "name"], vec!["1", "aaa"]]);
    }

    #[test]
    fn test_csv_source_line_numbers() {
        let mut source =
            CsvSource::from_reader("a,b\n1,2\n4,5\n".as_bytes(), &ReaderConfig::default()).unwrap();

        let lines: Vec<u64> = std::iter::from_fn(|| source.read_record().unwrap())
            .map(|r| r.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_csv_source_ragged_record_is_malformed() {
        let mut source =
            CsvSource::from_reader("a,b,c\n1,2\n".as_bytes(), &ReaderConfig::default()).unwrap();

        source.read_record().unwrap();
        let err = source.read_record().unwrap_err();
        assert!(matches!(err, KeyedError::MalformedRecord { line: Some(2), .. }));
    }

    #[test]
    fn test_csv_source_trim_and_delimiter() {
        let config = ReaderConfig::default().with_delimiter(';').with_trim(true);
        let source = CsvSource::from_reader("a ; b\n 1;2 \n".as_bytes(), &config).unwrap();
        assert_eq!(collect(source), vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_csv_source_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id|name\n1|aaa\n").unwrap();

        let config = ReaderConfig::default().with_delimiter('|');
        let source = CsvSource::from_path(file.path(), &config).unwrap();
        assert_eq!(collect(source).len(), 2);
    }

    #[test]
    fn test_csv_source_missing_file() {
        let err = CsvSource::from_path("/nonexistent/keyed.csv", &ReaderConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, KeyedError::Io(_)));
    }

    #[test]
    fn test_from_bytes_detects_delimiter() {
        let source =
            CsvSource::from_bytes(b"name;age\nAlice;30\n", &ReaderConfig::default()).unwrap();
        assert_eq!(collect(source), vec![vec!["name", "age"], vec!["Alice", "30"]]);
    }

    #[test]
    fn test_from_bytes_latin1() {
        // "id;nom\n1;Soci\xe9t\xe9\n" in ISO-8859-1
        let bytes: &[u8] = b"id;nom\n1;Soci\xe9t\xe9\n";
        let config = ReaderConfig::default().with_encoding("iso-8859-1");
        let source = CsvSource::from_bytes(bytes, &config).unwrap();
        assert_eq!(collect(source)[1][1], "Soci\u{e9}t\u{e9}");
    }

    #[test]
    fn test_decode_unknown_encoding() {
        let err = decode_content(b"abc", "klingon").unwrap_err();
        assert!(matches!(err, KeyedError::Encoding(_)));
    }

    #[test]
    fn test_decode_rejects_replacement_label() {
        let err = decode_content(b"id,name", "iso-2022-kr").unwrap_err();
        assert!(matches!(err, KeyedError::Encoding(_)));
    }

    #[test]
    fn test_detected_unsupported_label_falls_back_to_utf8() {
        assert_eq!(decode_detected(b"id,name\n1,a\n", "ibm855"), "id,name\n1,a\n");
        assert_eq!(decode_detected(b"id,name", "iso-2022-cn"), "id,name");
        assert_eq!(decode_detected(b"id,name", "x-mac-cyrillic"), "id,name");
    }

    #[test]
    fn test_configured_unknown_label_is_an_error() {
        let config = ReaderConfig::default().with_encoding("ibm855");
        let err = CsvSource::from_bytes(b"id\n1\n", &config).err().unwrap();
        assert!(matches!(err, KeyedError::Encoding(_)));
    }

    #[test]
    fn test_bom_is_dropped() {
        let bytes = b"\xef\xbb\xbfid,name\n1,aaa\n";
        let source = CsvSource::from_bytes(bytes, &ReaderConfig::default()).unwrap();
        assert_eq!(collect(source)[0], vec!["id", "name"]);

        assert_eq!(decode_content(b"\xef\xbb\xbfid", "utf-8").unwrap(), "id");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_memory_source_counts_lines() {
        let mut source = MemorySource::new(vec![vec!["id".to_string()], vec!["1".to_string()]]);

        assert_eq!(source.read_record().unwrap().unwrap().line, 1);
        assert_eq!(source.read_record().unwrap().unwrap().line, 2);
        assert!(source.read_record().unwrap().is_none());
    }
}
