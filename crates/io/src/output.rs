use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value};

/// A flat record: field name to JSON value.
pub type Row = Map<String, Value>;

#[derive(Debug)]
pub enum OutputError {
    Io(io::Error),
    Csv(::csv::Error),
    Json(serde_json::Error),
    /// A record in the input sequence was not a JSON object.
    NotAnObject { index: usize },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Csv(e) => write!(f, "CSV error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::NotAnObject { index } => write!(f, "record #{index} is not a JSON object"),
        }
    }
}

impl std::error::Error for OutputError {}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<::csv::Error> for OutputError {
    fn from(e: ::csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected csv or json)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// How CSV header columns are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnOrder {
    /// Order of first appearance across all records.
    #[default]
    FirstSeen,
    /// Alphabetical.
    Sorted,
}

/// View a sequence of raw report records as rows.
pub fn as_rows(records: &[Value]) -> Result<Vec<&Row>, OutputError> {
    records
        .iter()
        .enumerate()
        .map(|(index, v)| v.as_object().ok_or(OutputError::NotAnObject { index }))
        .collect()
}

/// Open the output destination: a file when a path is given, stdout otherwise.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, OutputError> {
    match path {
        Some(p) => Ok(Box::new(BufWriter::new(File::create(p)?))),
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Write rows in the given format.
pub fn write_records<W: Write>(
    rows: &[&Row],
    format: OutputFormat,
    order: ColumnOrder,
    writer: W,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => crate::csv::write_csv(rows, order, writer),
        OutputFormat::Json => crate::json::write_json(rows, writer),
    }
}
