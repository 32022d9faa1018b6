// rptc - reporting API client and active-instance reconciliation

mod active;
mod connect;
mod exit_codes;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use reporting_client::{ConfigError, FetchError};
use reporting_io::{OutputError, OutputFormat};
use reporting_recon::ReconError;

use exit_codes::{
    fetch_exit_code, EXIT_DATA_INTEGRITY, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "rptc")]
#[command(about = "Query the reporting API and reconcile active instances")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection and logging options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Reporting API base URL
    #[arg(long, global = true, env = "REPORTING_ENDPOINT", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Token sent as X-Auth-Token
    #[arg(long, global = true, env = "OS_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub os_token: Option<String>,

    /// Shell command printing a token (used when no token is set)
    #[arg(long, global = true, env = "OS_TOKEN_COMMAND", value_name = "CMD")]
    pub token_command: Option<String>,

    /// Skip version/report discovery and request /{version}/reports/{name}
    #[arg(long, global = true)]
    pub direct: bool,

    /// Config file (default: ~/.config/reporting-client/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Join hypervisor, instance and project reports into one table of active instances
    #[command(after_help = "\
Examples:
  rptc active-instances -o active.csv
  rptc active-instances --format json
  rptc active-instances --cache -o active.csv
  rptc active-instances --cache=/tmp/reports --direct")]
    ActiveInstances {
        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// Serve reports from (and save them to) a local cache directory
        #[arg(long, value_name = "DIR", num_args = 0..=1, require_equals = true)]
        cache: Option<Option<PathBuf>>,
    },

    /// Fetch one report and write its records
    #[command(after_help = "\
Examples:
  rptc report project
  rptc report instance --filter active=1 -o instances.csv
  rptc report hypervisor --format json")]
    Report {
        /// Report name (see list-reports)
        name: String,

        /// Filter criterion, repeatable
        #[arg(long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// List the reports the API offers
    ListReports,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    init_tracing(cli.global.quiet, cli.global.verbose)?;

    match cli.command {
        Commands::ActiveInstances { output, format, cache } => {
            active::cmd_active_instances(&cli.global, output, format, cache)
        }
        Commands::Report { name, filters, output, format } => {
            report::cmd_report(&cli.global, &name, &filters, output, format)
        }
        Commands::ListReports => report::cmd_list_reports(&cli.global),
    }
}

/// Logs go to stderr so stdout stays clean for report output.
fn init_tracing(quiet: bool, verbose: bool) -> Result<(), CliError> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("RPTC_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::general(format!("failed to initialize logging: {e}")))
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        Self::usage(err.to_string())
    }

    /// Create error from a fetch failure with the proper exit code.
    ///
    /// `anonymous` is true when no token was configured; a 401 then almost
    /// always means the token is missing rather than wrong.
    pub fn fetch(err: FetchError, anonymous: bool) -> Self {
        let code = fetch_exit_code(&err);
        let hint = match &err {
            FetchError::Http { status: 401, .. } if anonymous => {
                Some("maybe you need to set OS_TOKEN".to_string())
            }
            FetchError::Http { status: 401 | 403, .. } => {
                Some("the token may have expired; fetch a new one".to_string())
            }
            FetchError::UnknownReport(_) => Some("run `rptc list-reports` to see what is available".to_string()),
            FetchError::UnsupportedVersion(_) | FetchError::MissingLink(_) => {
                Some("try --direct to bypass version discovery".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError) -> Self {
        Self { code: EXIT_DATA_INTEGRITY, message: err.to_string(), hint: None }
    }

    pub fn output(err: OutputError) -> Self {
        let code = match &err {
            OutputError::NotAnObject { .. } => EXIT_DATA_INTEGRITY,
            _ => EXIT_IO,
        };
        Self { code, message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
