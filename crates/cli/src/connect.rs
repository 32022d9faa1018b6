//! Build a reporting client from flags, environment and the config file.
//!
//! Precedence for every setting: flag > environment variable > config file.
//! clap already folds the first two together.

use std::path::PathBuf;

use reporting_client::{
    default_cache_dir, load_config, Auth, ClientConfig, ClientOptions, ReportingClient, Routing,
};

use crate::{CliError, GlobalArgs};

/// Version prefix used by `--direct` when the config names none.
const DEFAULT_API_VERSION: &str = "v1";

pub struct Connection {
    pub client: ReportingClient,
    pub config: ClientConfig,
}

impl Connection {
    /// Cache directory for `--cache` without a value.
    pub fn default_cache_dir(&self) -> Result<PathBuf, CliError> {
        self.config
            .cache_dir
            .clone()
            .or_else(default_cache_dir)
            .ok_or_else(|| {
                CliError::usage("cannot determine a cache directory")
                    .with_hint("pass --cache=DIR or set cache_dir in the config file")
            })
    }
}

pub fn connect(global: &GlobalArgs) -> Result<Connection, CliError> {
    let config = load_config(global.config.as_deref()).map_err(CliError::config)?;
    let options = client_options(global, &config)?;

    tracing::debug!(
        endpoint = %options.endpoint,
        routing = ?options.routing,
        anonymous = options.auth.is_none(),
        "connecting to reporting API"
    );

    let client = ReportingClient::new(options).map_err(|e| CliError::fetch(e, true))?;
    Ok(Connection { client, config })
}

fn client_options(global: &GlobalArgs, config: &ClientConfig) -> Result<ClientOptions, CliError> {
    let endpoint = non_empty(global.endpoint.clone())
        .or_else(|| non_empty(config.endpoint.clone()))
        .ok_or_else(|| {
            CliError::usage("no reporting endpoint configured")
                .with_hint("pass --endpoint, set REPORTING_ENDPOINT, or add `endpoint` to the config file")
        })?;

    let auth = Auth::from_settings(
        non_empty(global.os_token.clone()).or_else(|| config.token.clone()),
        non_empty(global.token_command.clone()).or_else(|| config.token_command.clone()),
    );

    // A configured api_version pins direct routing on its own.
    let routing = match (global.direct, config.api_version.clone()) {
        (_, Some(version)) if !version.is_empty() => Routing::Direct { version },
        (true, _) => Routing::Direct { version: DEFAULT_API_VERSION.to_string() },
        (false, _) => Routing::Discover,
    };

    Ok(ClientOptions::new(endpoint).auth(auth).routing(routing))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> GlobalArgs {
        GlobalArgs {
            endpoint: None,
            os_token: None,
            token_command: None,
            direct: false,
            config: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_missing_endpoint_is_usage_error() {
        let err = client_options(&global(), &ClientConfig::default()).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_flag_wins_over_config() {
        let mut args = global();
        args.endpoint = Some("http://flag:9494".into());
        args.os_token = Some("flag-token".into());
        let config = ClientConfig {
            endpoint: Some("http://config:9494".into()),
            token: Some("config-token".into()),
            ..Default::default()
        };

        let options = client_options(&args, &config).unwrap();
        assert_eq!(options.endpoint, "http://flag:9494");
        assert_eq!(options.auth, Auth::Token("flag-token".into()));
        assert_eq!(options.routing, Routing::Discover);
    }

    #[test]
    fn test_config_fills_gaps() {
        let config = ClientConfig {
            endpoint: Some("http://config:9494".into()),
            token_command: Some("pass show reporting".into()),
            ..Default::default()
        };

        let options = client_options(&global(), &config).unwrap();
        assert_eq!(options.endpoint, "http://config:9494");
        assert_eq!(options.auth, Auth::Command("pass show reporting".into()));
    }

    #[test]
    fn test_routing_selection() {
        let mut args = global();
        args.endpoint = Some("http://h:9494".into());
        args.direct = true;
        let options = client_options(&args, &ClientConfig::default()).unwrap();
        assert_eq!(options.routing, Routing::Direct { version: "v1".into() });

        args.direct = false;
        let config = ClientConfig { api_version: Some("v2".into()), ..Default::default() };
        let options = client_options(&args, &config).unwrap();
        assert_eq!(options.routing, Routing::Direct { version: "v2".into() });
    }
}
