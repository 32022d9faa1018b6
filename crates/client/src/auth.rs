//! Token acquisition.
//!
//! The reporting API only needs an opaque token in `X-Auth-Token`. Getting
//! one is left to an external identity provider: either the caller already
//! has it, or a shell command prints it.

use std::process::Command;

use crate::error::FetchError;

/// Header carrying the token on every request.
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// How a client obtains its token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// Send no token; the endpoint may not require one.
    #[default]
    None,
    /// A token obtained elsewhere.
    Token(String),
    /// A shell command whose first stdout line is the token.
    Command(String),
}

impl Auth {
    /// Pick a strategy from optional settings. A literal token wins over a command.
    pub fn from_settings(token: Option<String>, token_command: Option<String>) -> Self {
        match (token, token_command) {
            (Some(t), _) if !t.is_empty() => Auth::Token(t),
            (_, Some(cmd)) if !cmd.is_empty() => Auth::Command(cmd),
            _ => Auth::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Auth::None)
    }

    /// Resolve to the token value, running the provider command if needed.
    pub fn resolve(&self) -> Result<Option<String>, FetchError> {
        match self {
            Auth::None => Ok(None),
            Auth::Token(t) => Ok(Some(t.clone())),
            Auth::Command(cmd) => run_token_command(cmd).map(Some),
        }
    }
}

fn run_token_command(cmd: &str) -> Result<String, FetchError> {
    tracing::debug!(command = cmd, "running token command");

    let output = shell(cmd)
        .output()
        .map_err(|e| FetchError::Auth(format!("cannot run '{cmd}': {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::Auth(format!(
            "'{cmd}' exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
        .ok_or_else(|| FetchError::Auth(format!("'{cmd}' printed no token")))
}

#[cfg(unix)]
fn shell(cmd: &str) -> Command {
    let mut c = Command::new("sh");
    c.arg("-c").arg(cmd);
    c
}

#[cfg(windows)]
fn shell(cmd: &str) -> Command {
    let mut c = Command::new("cmd");
    c.arg("/C").arg(cmd);
    c
}
