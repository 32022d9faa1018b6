//! Output sink for report records: CSV and pretty JSON.
//!
//! Records are flat JSON objects. Key order inside each record is preserved
//! (`serde_json` is built with `preserve_order`).

pub mod csv;
pub mod json;
pub mod output;

pub use output::{as_rows, open_output, write_records, ColumnOrder, OutputError, OutputFormat, Row};
