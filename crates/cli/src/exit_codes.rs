//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `rptc` exit codes.
//! Exit codes are part of the shell contract; cron jobs and scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, no endpoint)  |
//! | 3       | output           | Output file or stream could not be written |
//! | 4       | recon            | Report data failed integrity checks      |
//! | 50-59   | fetch            | Reporting API and report cache           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant mapping below

use reporting_client::FetchError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing endpoint, unreadable config file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Output (3)
// =============================================================================

/// Output destination could not be created or written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Recon (4)
// =============================================================================

/// Hypervisor without availability zone, instance on an unknown hypervisor,
/// or a record that is not shaped like a report row.
pub const EXIT_DATA_INTEGRITY: u8 = 4;

// =============================================================================
// Fetch (50-59)
// =============================================================================

/// Token rejected by the API (401/403) or the token command failed.
pub const EXIT_FETCH_AUTH: u8 = 50;

/// Upstream error (5xx), network failure after retries, or unparseable body.
pub const EXIT_FETCH_UPSTREAM: u8 = 51;

/// Rate limited after retries (429).
pub const EXIT_FETCH_RATE_LIMIT: u8 = 52;

/// Unknown report, API version or link type (including HTTP 404).
pub const EXIT_FETCH_NOT_FOUND: u8 = 53;

/// Local report cache could not be read or written.
pub const EXIT_FETCH_CACHE: u8 = 54;

/// Map a FetchError to its exit code.
pub fn fetch_exit_code(err: &FetchError) -> u8 {
    match err {
        FetchError::InvalidEndpoint(_) => EXIT_USAGE,
        FetchError::Auth(_) => EXIT_FETCH_AUTH,
        FetchError::Http { status, .. } => match status {
            401 | 403 => EXIT_FETCH_AUTH,
            404 => EXIT_FETCH_NOT_FOUND,
            429 => EXIT_FETCH_RATE_LIMIT,
            _ => EXIT_FETCH_UPSTREAM,
        },
        FetchError::Network(_) | FetchError::Parse { .. } => EXIT_FETCH_UPSTREAM,
        FetchError::UnsupportedVersion(_)
        | FetchError::MissingLink(_)
        | FetchError::UnknownReport(_) => EXIT_FETCH_NOT_FOUND,
        FetchError::Cache(_) => EXIT_FETCH_CACHE,
    }
}
