//! Reporting API HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).
//! Resolves report URLs either through the API's version and report listings
//! or directly from a fixed version prefix.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{Auth, AUTH_HEADER};
use crate::error::FetchError;
use crate::source::{ReportParams, ReportSource};

pub const USER_AGENT: &str = concat!("rptc/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const ERROR_BODY_PREVIEW: usize = 200;

/// Details of one API version, from the endpoint root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Link type to URL or path (e.g., "reports" → "/v1/reports").
    #[serde(default)]
    pub links: HashMap<String, String>,
}

/// Details of one report, from the report listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub links: HashMap<String, String>,
}

/// How report URLs are found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Routing {
    /// Endpoint root → version `reports` link → report `self` link.
    #[default]
    Discover,
    /// `{endpoint}/{version}/reports/{name}`, no listing requests.
    Direct { version: String },
}

/// Retry behavior for 429, 5xx and network failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, initial_backoff: Duration::from_secs(1) }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: String,
    pub auth: Auth,
    pub routing: Routing,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: Auth::None,
            routing: Routing::Discover,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reporting API client (blocking).
///
/// Version and report listings are fetched at most once per client, and the
/// token is resolved at most once.
pub struct ReportingClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    auth: Auth,
    routing: Routing,
    retry: RetryPolicy,
    token: OnceCell<Option<String>>,
    versions: OnceCell<Vec<VersionInfo>>,
    reports: OnceCell<Vec<ReportInfo>>,
}

impl ReportingClient {
    pub fn new(options: ClientOptions) -> Result<Self, FetchError> {
        let parsed = url::Url::parse(&options.endpoint)
            .map_err(|e| FetchError::InvalidEndpoint(format!("{}: {e}", options.endpoint)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidEndpoint(format!(
                "{}: scheme must be http or https",
                options.endpoint
            )));
        }

        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: options.endpoint,
            auth: options.auth,
            routing: options.routing,
            retry: options.retry,
            token: OnceCell::new(),
            versions: OnceCell::new(),
            reports: OnceCell::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// True when requests go out without a token.
    pub fn is_anonymous(&self) -> bool {
        self.auth.is_none()
    }

    /// All API versions the server offers.
    pub fn versions(&self) -> Result<&[VersionInfo], FetchError> {
        if let Some(v) = self.versions.get() {
            return Ok(v.as_slice());
        }
        let url = join_url(&self.endpoint, "");
        let body = self.get_json(&url, &ReportParams::new())?;
        let list = unwrap_listing(body, "versions");
        let versions: Vec<VersionInfo> = serde_json::from_value(list)
            .map_err(|e| FetchError::Parse { url, message: e.to_string() })?;
        Ok(self.versions.get_or_init(|| versions).as_slice())
    }

    /// Details of one API version.
    pub fn version(&self, version_id: &str) -> Result<&VersionInfo, FetchError> {
        self.versions()?
            .iter()
            .find(|v| v.id == version_id)
            .ok_or_else(|| FetchError::UnsupportedVersion(version_id.to_string()))
    }

    /// The first link of the given type in any version.
    pub fn any_version_link(&self, link_type: &str) -> Result<&str, FetchError> {
        self.versions()?
            .iter()
            .find_map(|v| v.links.get(link_type))
            .map(String::as_str)
            .ok_or_else(|| FetchError::MissingLink(link_type.to_string()))
    }

    /// All reports the server offers.
    pub fn reports(&self) -> Result<&[ReportInfo], FetchError> {
        if let Some(r) = self.reports.get() {
            return Ok(r.as_slice());
        }
        let url = match &self.routing {
            Routing::Discover => join_url(&self.endpoint, self.any_version_link("reports")?),
            Routing::Direct { version } => join_url(&self.endpoint, &format!("{version}/reports")),
        };
        let body = self.get_json(&url, &ReportParams::new())?;
        let list = unwrap_listing(body, "reports");
        let reports: Vec<ReportInfo> = serde_json::from_value(list)
            .map_err(|e| FetchError::Parse { url, message: e.to_string() })?;
        Ok(self.reports.get_or_init(|| reports).as_slice())
    }

    /// URL serving the named report.
    pub fn report_url(&self, report_name: &str) -> Result<String, FetchError> {
        match &self.routing {
            Routing::Direct { version } => {
                Ok(join_url(&self.endpoint, &format!("{version}/reports/{report_name}")))
            }
            Routing::Discover => self
                .reports()?
                .iter()
                .find(|r| r.name == report_name)
                .and_then(|r| r.links.get("self"))
                .map(|link| join_url(&self.endpoint, link))
                .ok_or_else(|| FetchError::UnknownReport(report_name.to_string())),
        }
    }

    /// Fetch the named report with optional filter parameters.
    pub fn fetch_report(&self, report_name: &str, params: &ReportParams) -> Result<Vec<Value>, FetchError> {
        tracing::debug!(report = report_name, "Fetching \"{report_name}\"...");
        let url = self.report_url(report_name)?;
        let body = self.get_json(&url, params)?;
        let records = match body {
            Value::Array(items) => items,
            other => {
                return Err(FetchError::Parse {
                    url,
                    message: format!("expected a JSON array, got {}", json_kind(&other)),
                })
            }
        };
        tracing::debug!(report = report_name, count = records.len(), "Fetched \"{report_name}\".");
        Ok(records)
    }

    fn token(&self) -> Result<Option<&str>, FetchError> {
        if let Some(t) = self.token.get() {
            return Ok(t.as_deref());
        }
        let resolved = self.auth.resolve()?;
        Ok(self.token.get_or_init(|| resolved).as_deref())
    }

    /// GET with retry + exponential backoff.
    ///
    /// Auth errors and other 4xx fail immediately. 429, 5xx and network
    /// errors are retried up to `max_retries` times.
    fn get_json(&self, url: &str, params: &ReportParams) -> Result<Value, FetchError> {
        let token = self.token()?;
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0u32;

        loop {
            let mut req = self.http.get(url).header(reqwest::header::ACCEPT, "application/json");
            if !params.is_empty() {
                req = req.query(params);
            }
            if let Some(t) = token {
                req = req.header(AUTH_HEADER, t);
            }

            let failure = match req.send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let retryable = status == 429 || status >= 500;

                    if resp.status().is_success() {
                        let text = resp
                            .text()
                            .map_err(|e| FetchError::Network(format!("failed to read response body: {e}")))?;
                        let trimmed = text.trim_start_matches('\u{feff}');
                        return serde_json::from_str(trimmed).map_err(|e| FetchError::Parse {
                            url: url.to_string(),
                            message: format!("{e} (body: {})", preview(trimmed)),
                        });
                    }

                    let retry_after = if status == 429 {
                        resp.headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                    } else {
                        None
                    };
                    let body = resp.text().unwrap_or_default();
                    let err = FetchError::Http { status, message: error_message(&body, status) };

                    if !retryable {
                        return Err(err);
                    }
                    (err, retry_after)
                }
                Err(e) => (FetchError::Network(e.to_string()), None),
            };

            let (err, retry_after) = failure;
            if attempt >= self.retry.max_retries {
                return Err(err);
            }
            attempt += 1;
            let wait = retry_after.unwrap_or(backoff);
            tracing::warn!(
                attempt,
                max_retries = self.retry.max_retries,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "retrying request"
            );
            thread::sleep(wait);
            backoff = next_backoff(backoff);
        }
    }
}

impl ReportSource for ReportingClient {
    fn fetch(&self, report: &str, params: &ReportParams) -> Result<Vec<Value>, FetchError> {
        self.fetch_report(report, params)
    }
}

/// Join a link onto the endpoint. Absolute links are used as-is.
pub fn join_url(endpoint: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    let base = endpoint.trim_end_matches('/');
    let path = link.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Accept both a bare list and an object wrapping it under `key`.
fn unwrap_listing(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut obj) if obj.contains_key(key) => obj.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

fn error_message(body: &str, status: u16) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let msg = json["message"]
            .as_str()
            .or_else(|| json["error"]["message"].as_str())
            .or_else(|| json["error"].as_str());
        if let Some(m) = msg {
            return m.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string()
    } else {
        preview(trimmed).to_string()
    }
}

/// Doubles, pinned at `Duration::MAX` instead of overflowing.
fn next_backoff(backoff: Duration) -> Duration {
    backoff.saturating_mul(2)
}

fn preview(s: &str) -> &str {
    match s.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
