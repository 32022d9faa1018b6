//! `rptc active-instances`: hypervisor + instance + project → one table.

use std::path::PathBuf;

use reporting_client::{CachedSource, ReportParams, ReportSource};
use reporting_io::{open_output, write_records, ColumnOrder, OutputFormat, Row};
use reporting_recon::{reconcile_records, Reconciliation};

use crate::connect::connect;
use crate::{CliError, GlobalArgs};

pub const HYPERVISOR_REPORT: &str = "hypervisor";
pub const INSTANCE_REPORT: &str = "instance";
pub const PROJECT_REPORT: &str = "project";

pub fn cmd_active_instances(
    global: &GlobalArgs,
    output: Option<PathBuf>,
    format: OutputFormat,
    cache: Option<Option<PathBuf>>,
) -> Result<(), CliError> {
    let conn = connect(global)?;
    let anonymous = conn.client.is_anonymous();

    let cache_dir = match cache {
        None => None,
        Some(Some(dir)) => Some(dir),
        Some(None) => Some(conn.default_cache_dir()?),
    };

    let recon = match cache_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "using report cache");
            fetch_and_reconcile(&CachedSource::new(&conn.client, dir), anonymous)?
        }
        None => fetch_and_reconcile(&conn.client, anonymous)?,
    };

    let s = &recon.summary;
    tracing::info!(
        hypervisors = s.hypervisors,
        projects = s.projects,
        instances = s.instances,
        enriched = s.enriched,
        skipped_no_hypervisor = s.skipped_no_hypervisor,
        skipped_invalid_project = s.skipped_invalid_project,
        duplicate_short_names = s.duplicate_short_names,
        "reconciliation complete"
    );

    let rows: Vec<&Row> = recon.instances.iter().map(|i| i.fields()).collect();
    let writer = open_output(output.as_deref()).map_err(CliError::output)?;
    write_records(&rows, format, ColumnOrder::FirstSeen, writer).map_err(CliError::output)
}

/// The three fetches run in order; reconciliation only starts once all
/// three reports are in memory.
fn fetch_and_reconcile(source: &dyn ReportSource, anonymous: bool) -> Result<Reconciliation, CliError> {
    let fetch = |report: &str, params: &ReportParams| {
        source.fetch(report, params).map_err(|e| CliError::fetch(e, anonymous))
    };

    let hypervisors = fetch(HYPERVISOR_REPORT, &ReportParams::new())?;
    let instances = fetch(INSTANCE_REPORT, &active_only())?;
    let projects = fetch(PROJECT_REPORT, &ReportParams::new())?;

    reconcile_records(&hypervisors, &instances, &projects).map_err(CliError::recon)
}

fn active_only() -> ReportParams {
    let mut params = ReportParams::new();
    params.insert("active".to_string(), "1".to_string());
    params
}
