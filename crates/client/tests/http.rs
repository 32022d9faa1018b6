// HTTP behavior of the reporting client against a mock server.
// Run with: cargo test -p reporting-client --test http

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use reporting_client::{
    parse_params, Auth, ClientOptions, FetchError, ReportParams, ReportSource, ReportingClient,
    RetryPolicy, Routing,
};

fn no_retry() -> RetryPolicy {
    RetryPolicy { max_retries: 0, initial_backoff: Duration::ZERO }
}

fn client(server: &MockServer, auth: Auth) -> ReportingClient {
    ReportingClient::new(ClientOptions::new(server.base_url()).auth(auth).retry(no_retry())).unwrap()
}

fn mock_discovery(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(json!([
            {"id": "v0", "status": "DEPRECATED", "links": {}},
            {"id": "v1", "status": "CURRENT", "links": {"reports": "/v1/reports"}}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/reports");
        then.status(200).json_body(json!([
            {
                "name": "hypervisor",
                "description": "Hypervisor details",
                "lastUpdated": "2016-03-01 10:00:00",
                "links": {"self": "/v1/reports/hypervisor"}
            },
            {
                "name": "instance",
                "description": "Instance details",
                "lastUpdated": "2016-03-01 10:05:00",
                "links": {"self": "/v1/reports/instance"}
            }
        ]));
    });
}

#[test]
fn discovery_then_fetch() {
    let server = MockServer::start();
    mock_discovery(&server);
    let report = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/reports/instance")
            .query_param("active", "1");
        then.status(200).json_body(json!([{"id": "i-1", "hypervisor": "h1"}]));
    });

    let client = client(&server, Auth::None);
    let params = parse_params(["active=1"]).unwrap();
    let records = client.fetch("instance", &params).unwrap();

    report.assert();
    assert_eq!(records, vec![json!({"id": "i-1", "hypervisor": "h1"})]);
}

#[test]
fn listings_are_fetched_once_per_client() {
    let server = MockServer::start();
    let root = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(json!([{"id": "v1", "links": {"reports": "/v1/reports"}}]));
    });
    let listing = server.mock(|when, then| {
        when.method(GET).path("/v1/reports");
        then.status(200).json_body(json!([
            {"name": "project", "links": {"self": "/v1/reports/project"}}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/reports/project");
        then.status(200).json_body(json!([]));
    });

    let client = client(&server, Auth::None);
    client.fetch("project", &ReportParams::new()).unwrap();
    client.fetch("project", &ReportParams::new()).unwrap();
    assert_eq!(client.version("v1").unwrap().id, "v1");
    assert_eq!(client.reports().unwrap().len(), 1);

    root.assert();
    listing.assert();
}

#[test]
fn version_lookup_and_links() {
    let server = MockServer::start();
    mock_discovery(&server);
    let client = client(&server, Auth::None);

    assert_eq!(client.version("v0").unwrap().status.as_deref(), Some("DEPRECATED"));
    assert_eq!(client.any_version_link("reports").unwrap(), "/v1/reports");
    assert_eq!(client.version("v9").unwrap_err(), FetchError::UnsupportedVersion("v9".into()));
    assert_eq!(client.any_version_link("metrics").unwrap_err(), FetchError::MissingLink("metrics".into()));

    let reports = client.reports().unwrap();
    assert_eq!(reports[0].last_updated.as_deref(), Some("2016-03-01 10:00:00"));
}

#[test]
fn unknown_report() {
    let server = MockServer::start();
    mock_discovery(&server);
    let client = client(&server, Auth::None);

    let err = client.fetch("project", &ReportParams::new()).unwrap_err();
    assert_eq!(err, FetchError::UnknownReport("project".into()));
}

#[test]
fn token_is_sent_as_header() {
    let server = MockServer::start();
    let report = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/reports/project")
            .header("X-Auth-Token", "gAAAAB-token");
        then.status(200).json_body(json!([{"id": 5, "display_name": "Team A"}]));
    });

    let options = ClientOptions::new(server.base_url())
        .auth(Auth::Token("gAAAAB-token".into()))
        .routing(Routing::Direct { version: "v1".into() })
        .retry(no_retry());
    let client = ReportingClient::new(options).unwrap();
    let records = client.fetch("project", &ReportParams::new()).unwrap();

    report.assert();
    assert_eq!(records.len(), 1);
}

#[test]
fn direct_routing_skips_discovery() {
    let server = MockServer::start();
    let root = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(500);
    });
    let report = server.mock(|when, then| {
        when.method(GET).path("/v1/reports/hypervisor");
        then.status(200).json_body(json!([]));
    });

    let options = ClientOptions::new(format!("{}/", server.base_url()))
        .routing(Routing::Direct { version: "v1".into() })
        .retry(no_retry());
    let client = ReportingClient::new(options).unwrap();
    assert!(client.fetch("hypervisor", &ReportParams::new()).unwrap().is_empty());

    report.assert();
    root.assert_calls(0);
}

#[test]
fn unauthorized_fails_without_retry() {
    let server = MockServer::start();
    let report = server.mock(|when, then| {
        when.method(GET).path("/v1/reports/instance");
        then.status(401).json_body(json!({"message": "Authentication required"}));
    });

    let options = ClientOptions::new(server.base_url())
        .routing(Routing::Direct { version: "v1".into() })
        .retry(RetryPolicy { max_retries: 3, initial_backoff: Duration::ZERO });
    let client = ReportingClient::new(options).unwrap();
    let err = client.fetch("instance", &ReportParams::new()).unwrap_err();

    report.assert();
    assert!(err.is_unauthorized());
    assert_eq!(
        err,
        FetchError::Http { status: 401, message: "Authentication required".into() }
    );
    assert!(client.is_anonymous());
}

#[test]
fn server_errors_are_retried() {
    let server = MockServer::start();
    let report = server.mock(|when, then| {
        when.method(GET).path("/v1/reports/project");
        then.status(503).body("maintenance");
    });

    let options = ClientOptions::new(server.base_url())
        .routing(Routing::Direct { version: "v1".into() })
        .retry(RetryPolicy { max_retries: 2, initial_backoff: Duration::ZERO });
    let client = ReportingClient::new(options).unwrap();
    let err = client.fetch("project", &ReportParams::new()).unwrap_err();

    report.assert_calls(3);
    assert_eq!(err.status_code(), Some(503));
}

#[test]
fn rate_limit_is_retried_after_server_delay() {
    let server = MockServer::start();
    let report = server.mock(|when, then| {
        when.method(GET).path("/v1/reports/project");
        then.status(429)
            .header("Retry-After", "0")
            .json_body(json!({"message": "slow down"}));
    });

    // Retry-After: 0 replaces the long backoff, so this finishes quickly.
    let options = ClientOptions::new(server.base_url())
        .routing(Routing::Direct { version: "v1".into() })
        .retry(RetryPolicy { max_retries: 2, initial_backoff: Duration::from_secs(60) });
    let client = ReportingClient::new(options).unwrap();
    let started = std::time::Instant::now();
    let err = client.fetch("project", &ReportParams::new()).unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(30), "waited {:?}", started.elapsed());
    report.assert_calls(3);
    assert!(matches!(err, FetchError::Http { status: 429, .. }), "{err:?}");
}

#[test]
fn non_array_report_is_parse_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/reports/project");
        then.status(200).json_body(json!({"error": "oops"}));
    });

    let options = ClientOptions::new(server.base_url())
        .routing(Routing::Direct { version: "v1".into() })
        .retry(no_retry());
    let client = ReportingClient::new(options).unwrap();
    let err = client.fetch("project", &ReportParams::new()).unwrap_err();
    assert!(matches!(err, FetchError::Parse { .. }), "{err:?}");
}

#[test]
fn wrapped_listings_are_accepted() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(json!({"versions": [{"id": "v1", "links": {"reports": "/v1/reports"}}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/reports");
        then.status(200).json_body(json!({"reports": [{"name": "project", "links": {"self": "/v1/reports/project"}}]}));
    });

    let client = client(&server, Auth::None);
    assert_eq!(client.reports().unwrap()[0].name, "project");
}
