//! Keyed reader: header validation and per-row key extraction.
//!
//! # Example
//!
//! ```
//! use keyed_csv::{KeyedReader, ReaderConfig};
//!
//! let data = "id,name\n2,bbb\n1,aaa\n";
//! let mut reader = KeyedReader::from_reader(data.as_bytes(), &ReaderConfig::default()).unwrap();
//! reader.read_header(&["id"]).unwrap();
//!
//! let row = reader.read().unwrap();
//! assert_eq!(row.get("name"), Some("bbb"));
//! assert_eq!(row.sort_key().joined(), "2");
//! ```

use std::io::Read;

use tracing::debug;

use crate::collector::{self, Collected};
use crate::config::ReaderConfig;
use crate::error::{KeyedError, KeyedResult};
use crate::models::{Header, KeySet, Row};
use crate::source::{CsvSource, RecordSource};

/// Wraps a [`RecordSource`] and turns its records into [`Row`]s.
///
/// [`KeyedReader::read_header`] must succeed once before any row is read.
pub struct KeyedReader<S> {
    source: S,
    layout: Option<(Header, KeySet)>,
}

impl<R: Read> KeyedReader<CsvSource<R>> {
    /// Reader over a delimited text stream.
    pub fn from_reader(reader: R, config: &ReaderConfig) -> KeyedResult<Self> {
        Ok(Self::new(CsvSource::from_reader(reader, config)?))
    }
}

impl<S: RecordSource> KeyedReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            layout: None,
        }
    }

    /// Read the first record as the header and resolve `keys` against it.
    ///
    /// Header names must be unique and every key must name a header column.
    /// Consumes exactly one record.
    pub fn read_header<K: AsRef<str>>(&mut self, keys: &[K]) -> KeyedResult<()> {
        if self.layout.is_some() {
            return Err(KeyedError::HeaderAlreadyRead);
        }
        let record = self
            .source
            .read_record()?
            .ok_or(KeyedError::EmptyInput)?;

        let header = Header::new(record.fields)?;
        let keys = KeySet::resolve(&header, keys)?;
        debug!(
            columns = header.len(),
            keys = ?keys.names(),
            "header read"
        );

        self.layout = Some((header, keys));
        Ok(())
    }

    /// Read the next row.
    ///
    /// Returns [`KeyedError::EndOfData`] once the source is exhausted.
    pub fn read(&mut self) -> KeyedResult<Row> {
        let (header, keys) = self.layout.as_ref().ok_or(KeyedError::HeaderNotRead)?;
        let record = self
            .source
            .read_record()?
            .ok_or(KeyedError::EndOfData)?;
        Ok(Row::from_record(header, keys, &record.fields, record.line))
    }

    /// Iterate over the remaining rows, stopping at end of data.
    pub fn rows(&mut self) -> Rows<'_, S> {
        Rows {
            reader: self,
            done: false,
        }
    }

    /// Drain the reader into deduplicated rows sorted by key.
    ///
    /// See [`collector::read_all`].
    pub fn read_all(&mut self) -> KeyedResult<Collected> {
        collector::read_all(self)
    }

    pub fn header(&self) -> Option<&Header> {
        self.layout.as_ref().map(|(header, _)| header)
    }

    pub fn keys(&self) -> Option<&KeySet> {
        self.layout.as_ref().map(|(_, keys)| keys)
    }

    pub fn has_header(&self) -> bool {
        self.layout.is_some()
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

/// Iterator returned by [`KeyedReader::rows`].
///
/// Yields at most one error, after which it is exhausted.
pub struct Rows<'a, S> {
    reader: &'a mut KeyedReader<S>,
    done: bool,
}

impl<S: RecordSource> Iterator for Rows<'_, S> {
    type Item = KeyedResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read() {
            Ok(row) => Some(Ok(row)),
            Err(KeyedError::EndOfData) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    const FILE1: &str = "id,name,date
1,aaa,20180101
2,bbb,20180102
3,ccc,20180103
4,ddd,20180104
5,eee,20180105
";

    const FILE2: &str = "id,name,date
1,aaa,20180101
2,BBB,20180102
6,fff,20180106
3,ccc,20180103
5,eee,20180105
";

    fn reader(data: &'static str) -> KeyedReader<CsvSource<&'static [u8]>> {
        KeyedReader::from_reader(data.as_bytes(), &ReaderConfig::default()).unwrap()
    }

    fn memory(records: &[&[&str]]) -> KeyedReader<MemorySource> {
        let records = records
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        KeyedReader::new(MemorySource::new(records))
    }

    #[test]
    fn test_read_header() {
        let mut r1 = reader(FILE1);
        r1.read_header(&["id"]).unwrap();
        assert_eq!(r1.header().unwrap().names(), ["id", "name", "date"]);
        assert_eq!(r1.keys().unwrap().names(), ["id"]);

        let mut r2 = reader(FILE2);
        r2.read_header(&["id"]).unwrap();
        assert_eq!(r2.header().unwrap().names(), ["id", "name", "date"]);
    }

    #[test]
    fn test_read_rows() {
        let mut r = reader(FILE1);
        r.read_header(&["id"]).unwrap();

        let row = r.read().unwrap();
        assert_eq!(row.get("id"), Some("1"));
        assert_eq!(row.get("name"), Some("aaa"));
        assert_eq!(row.get("date"), Some("20180101"));
        assert_eq!(row.sort_key().joined(), "1");
        assert_eq!(row.line(), 2);

        let row = r.read().unwrap();
        assert_eq!(row.get("name"), Some("bbb"));
        assert_eq!(row.sort_key().joined(), "2");
    }

    #[test]
    fn test_read_until_end_of_data() {
        let mut r = reader("id\n1\n");
        r.read_header(&["id"]).unwrap();

        assert!(r.read().is_ok());
        assert!(r.read().unwrap_err().is_end_of_data());
        assert!(r.read().unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_unknown_key() {
        let mut r = reader(FILE1);
        let err = r.read_header(&["noid"]).unwrap_err();
        assert!(matches!(err, KeyedError::UnknownKey(ref k) if k == "noid"));
        assert!(!r.has_header());
    }

    #[test]
    fn test_duplicate_header_name_wins_over_keys() {
        let mut r = reader("id,name,id\n1,a,1\n");
        let err = r.read_header(&["missing"]).unwrap_err();
        assert!(matches!(err, KeyedError::DuplicateHeaderName(ref n) if n == "id"));
    }

    #[test]
    fn test_empty_input() {
        let mut r = reader("");
        assert!(matches!(r.read_header(&["id"]), Err(KeyedError::EmptyInput)));
    }

    #[test]
    fn test_header_read_twice() {
        let mut r = reader(FILE1);
        r.read_header(&["id"]).unwrap();
        assert!(matches!(r.read_header(&["id"]), Err(KeyedError::HeaderAlreadyRead)));
        // The second call must not consume a row.
        assert_eq!(r.read().unwrap().get("id"), Some("1"));
    }

    #[test]
    fn test_read_before_header() {
        let mut r = reader(FILE1);
        assert!(matches!(r.read(), Err(KeyedError::HeaderNotRead)));
        assert!(matches!(r.read_all(), Err(KeyedError::HeaderNotRead)));
        // Nothing was consumed by the failed reads.
        r.read_header(&["id"]).unwrap();
    }

    #[test]
    fn test_composite_key_in_key_order() {
        let mut r = reader(FILE1);
        r.read_header(&["date", "name"]).unwrap();

        let row = r.read().unwrap();
        assert_eq!(row.sort_key().values(), ["20180101", "aaa"]);
        assert_eq!(row.sort_key().joined(), "20180101\naaa");
    }

    #[test]
    fn test_same_record_same_key() {
        let mut r = reader("id,name\n7,x\n7,x\n");
        r.read_header(&["name", "id"]).unwrap();

        let first = r.read().unwrap();
        let second = r.read().unwrap();
        assert_eq!(first.sort_key(), second.sort_key());
        assert_eq!(first.columns(), second.columns());
    }

    #[test]
    fn test_malformed_record() {
        let mut r = reader("id,name\n1,aaa\n2\n3,ccc\n");
        r.read_header(&["id"]).unwrap();

        assert!(r.read().is_ok());
        let err = r.read().unwrap_err();
        assert!(matches!(err, KeyedError::MalformedRecord { line: Some(3), .. }));
    }

    #[test]
    fn test_short_record_from_memory_source() {
        let mut r = memory(&[&["id", "name"], &["1"]]);
        r.read_header(&["name"]).unwrap();

        let row = r.read().unwrap();
        assert_eq!(row.get("id"), Some("1"));
        assert_eq!(row.get("name"), None);
        assert_eq!(row.sort_key().values(), [""]);
    }

    #[test]
    fn test_rows_iterator() {
        let mut r = reader(FILE2);
        r.read_header(&["id"]).unwrap();

        let ids: Vec<String> = r
            .rows()
            .map(|row| row.unwrap().get("id").unwrap().to_string())
            .collect();
        assert_eq!(ids, ["1", "2", "6", "3", "5"]);
    }

    #[test]
    fn test_rows_iterator_stops_after_error() {
        let mut r = reader("id,name\n1,a\n2\n3,c\n");
        r.read_header(&["id"]).unwrap();

        let results: Vec<_> = r.rows().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
