//! Source module - Where bet records come from
//!
//! The runtime pulls bets through the `BetSource` trait; production reads
//! the agency's headerless CSV file with one bet per line:
//!
//! ```text
//! first_name,last_name,document,birthdate,number
//! ```
//!
//! The agency id is never stored in the file; the protocol layer injects
//! it when encoding.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::protocol::{Bet, FIELD_COUNT};

/// Fields per CSV line: every record field except the injected agency id
pub const SOURCE_FIELDS: usize = FIELD_COUNT - 1;

/// Record source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Expected {expected} fields, found {0}", expected = SOURCE_FIELDS)]
    FieldCount(usize),

    #[error("Bet number {value:?} is not a non-negative integer")]
    BadNumber {
        value: String,
        source: std::num::ParseIntError,
    },
}

/// Yields bets until the source is exhausted.
///
/// Ok(None) signals clean end of input; any error aborts the run.
pub trait BetSource {
    fn next_bet(&mut self) -> Result<Option<Bet>, SourceError>;
}

/// CSV-backed bet source.
///
/// Reads are synchronous and happen inline between frame sends; agency
/// data files are local and small enough that this never matters.
pub struct CsvSource<R: Read> {
    reader: csv::Reader<R>,
    row: csv::StringRecord,
}

impl CsvSource<File> {
    /// Open an agency data file
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> CsvSource<R> {
    /// Wrap any reader producing headerless CSV
    pub fn new(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        Self {
            reader,
            row: csv::StringRecord::new(),
        }
    }
}

impl<R: Read> BetSource for CsvSource<R> {
    fn next_bet(&mut self) -> Result<Option<Bet>, SourceError> {
        if !self.reader.read_record(&mut self.row)? {
            return Ok(None);
        }

        if self.row.len() != SOURCE_FIELDS {
            return Err(SourceError::FieldCount(self.row.len()));
        }

        let number = self.row[4].parse().map_err(|source| SourceError::BadNumber {
            value: self.row[4].to_string(),
            source,
        })?;

        Ok(Some(Bet {
            first_name: self.row[0].to_string(),
            last_name: self.row[1].to_string(),
            document: self.row[2].to_string(),
            birthdate: self.row[3].to_string(),
            number,
        }))
    }
}
