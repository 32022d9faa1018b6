use std::fmt;

/// Error type for report source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Endpoint URL could not be parsed
    InvalidEndpoint(String),
    /// External token provider failed
    Auth(String),
    /// HTTP error with status code
    Http { status: u16, message: String },
    /// Network / transport error
    Network(String),
    /// Response body was not the expected JSON
    Parse { url: String, message: String },
    /// Server does not offer the requested API version
    UnsupportedVersion(String),
    /// No API version advertises the requested link type
    MissingLink(String),
    /// Server does not offer the named report
    UnknownReport(String),
    /// Local report cache could not be read or written
    Cache(String),
}

impl FetchError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for HTTP 401, the usual symptom of a missing token.
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEndpoint(msg) => write!(f, "invalid endpoint: {msg}"),
            Self::Auth(msg) => write!(f, "token provider failed: {msg}"),
            Self::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Parse { url, message } => write!(f, "unexpected response from {url}: {message}"),
            Self::UnsupportedVersion(id) => write!(f, "no server support for API version '{id}'"),
            Self::MissingLink(link) => {
                write!(f, "no server API version supports link type '{link}'")
            }
            Self::UnknownReport(name) => write!(f, "no report '{name}' available"),
            Self::Cache(msg) => write!(f, "report cache: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}
