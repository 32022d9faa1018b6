//! `rptc report` and `rptc list-reports`: raw access to single reports.

use std::io::{self, Write};
use std::path::PathBuf;

use reporting_client::parse_params;
use reporting_io::{as_rows, open_output, write_records, ColumnOrder, OutputFormat};

use crate::connect::connect;
use crate::{CliError, GlobalArgs};

pub fn cmd_report(
    global: &GlobalArgs,
    name: &str,
    filters: &[String],
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let params = parse_params(filters).map_err(CliError::usage)?;
    let conn = connect(global)?;

    let records = conn
        .client
        .fetch_report(name, &params)
        .map_err(|e| CliError::fetch(e, conn.client.is_anonymous()))?;

    if records.is_empty() {
        eprintln!("Empty result set");
        return Ok(());
    }

    let rows = as_rows(&records).map_err(CliError::output)?;
    let writer = open_output(output.as_deref()).map_err(CliError::output)?;
    write_records(&rows, format, ColumnOrder::Sorted, writer).map_err(CliError::output)
}

pub fn cmd_list_reports(global: &GlobalArgs) -> Result<(), CliError> {
    let conn = connect(global)?;
    let reports = conn
        .client
        .reports()
        .map_err(|e| CliError::fetch(e, conn.client.is_anonymous()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for report in reports {
        writeln!(handle, "{} report: {}", report.name, report.description.as_deref().unwrap_or(""))
            .map_err(|e| CliError::output(e.into()))?;
        writeln!(handle, "\tLast Updated: {}", report.last_updated.as_deref().unwrap_or("unknown"))
            .map_err(|e| CliError::output(e.into()))?;
    }

    Ok(())
}
