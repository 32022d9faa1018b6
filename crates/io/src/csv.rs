// CSV export

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Write;

use serde_json::Value;

use crate::output::{ColumnOrder, OutputError, Row};

/// Header columns: the union of keys across all rows.
///
/// Records from the reporting API are not guaranteed to share a field set,
/// so taking the keys of any single record can drop columns.
pub fn columns(rows: &[&Row], order: ColumnOrder) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cols = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                cols.push(key.clone());
            }
        }
    }
    if order == ColumnOrder::Sorted {
        cols.sort();
    }
    cols
}

/// Text of a single cell. Strings are written verbatim, null is empty,
/// everything else is its compact JSON form.
pub fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Write a header row and one row per record. Missing fields are empty cells.
pub fn write_csv<W: Write>(rows: &[&Row], order: ColumnOrder, writer: W) -> Result<(), OutputError> {
    let cols = columns(rows, order);
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    if !cols.is_empty() {
        wtr.write_record(&cols)?;
    }
    for row in rows {
        let record: Vec<Cow<'_, str>> = cols
            .iter()
            .map(|c| row.get(c).map(cell_text).unwrap_or(Cow::Borrowed("")))
            .collect();
        wtr.write_record(record.iter().map(|c| c.as_bytes()))?;
    }

    wtr.flush()?;
    Ok(())
}
