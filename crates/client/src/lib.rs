//! Reporting API client.
//!
//! This crate is the single source of truth for the reporting API wire
//! contract: version discovery, report listing, report fetch, token header.
//!
//! No reconciliation logic. No output formatting.

mod auth;
mod client;
mod config;
mod error;
mod source;

pub use auth::{Auth, AUTH_HEADER};
pub use client::{
    join_url, ClientOptions, ReportInfo, ReportingClient, RetryPolicy, Routing, VersionInfo,
    USER_AGENT,
};
pub use config::{config_file_path, default_cache_dir, load_config, ClientConfig, ConfigError};
pub use error::FetchError;
pub use source::{parse_params, CachedSource, ReportParams, ReportSource};
