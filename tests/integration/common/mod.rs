//! Shared helpers for the mocked integration tests
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use entrez_client::{ClientConfig, EntrezClient, QueryParameters, RetryConfig};
use wiremock::MockServer;

/// Client pointed at `mock_server` with rate limiting relaxed and no retries
pub fn create_mock_client(mock_server: &MockServer) -> EntrezClient {
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0)
        .with_retry_config(RetryConfig::no_retry())
        .with_email("test@example.org");

    EntrezClient::with_config(config).expect("client should build")
}

/// Same as [`create_mock_client`] with a custom page size
pub fn create_mock_client_with_batch(mock_server: &MockServer, batch_size: usize) -> EntrezClient {
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0)
        .with_retry_config(RetryConfig::no_retry())
        .with_batch_size(batch_size);

    EntrezClient::with_config(config).expect("client should build")
}

/// Decode the form body of a recorded request
pub fn form(request: &wiremock::Request) -> QueryParameters {
    let body = String::from_utf8_lossy(&request.body);
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|value| value.into_owned())
        .unwrap_or(spaced)
}

/// Read a file from `tests/integration/test_data`
pub fn load_fixture(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "integration", "test_data", name]
        .iter()
        .collect();
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("cannot read {}: {err}", path.display()))
}
