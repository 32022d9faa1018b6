// JSON export

use std::io::Write;

use crate::output::{OutputError, Row};

/// Write rows as a pretty-printed JSON array, followed by a newline.
pub fn write_json<W: Write>(rows: &[&Row], mut writer: W) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
