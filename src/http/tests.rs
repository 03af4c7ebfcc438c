//! Tests for the HTTP module

use super::*;
use crate::auth::Credentials;
use crate::error::Error;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> HttpClientConfig {
    HttpClientConfig::builder()
        .no_rate_limit()
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(10),
        )
        .build()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.backoff_type, BackoffType::Exponential);
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("twilio-source/"));
}

#[test]
fn test_config_builder() {
    let config = HttpClientConfig::builder()
        .timeout(Duration::from_secs(5))
        .max_retries(7)
        .no_rate_limit()
        .user_agent("custom-agent")
        .build();

    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.max_retries, 7);
    assert!(config.rate_limit.is_none());
    assert_eq!(config.user_agent, "custom-agent");
}

#[test]
fn test_calculate_backoff_exponential() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_secs(60),
        )
        .build();
    let client = HttpClient::with_config(config);

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
}

#[test]
fn test_calculate_backoff_linear() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(60),
        )
        .build();
    let client = HttpClient::with_config(config);

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_calculate_backoff_capped_at_max() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(250),
        )
        .build();
    let client = HttpClient::with_config(config);

    assert_eq!(client.calculate_backoff(5), Duration::from_millis(250));
}

#[test]
fn test_build_url() {
    assert_eq!(
        HttpClient::build_url("https://api.twilio.com/2010-04-01/", "Accounts.json"),
        "https://api.twilio.com/2010-04-01/Accounts.json"
    );
    assert_eq!(
        HttpClient::build_url(
            "https://api.twilio.com",
            "/2010-04-01/Accounts/AC1/Calls.json"
        ),
        "https://api.twilio.com/2010-04-01/Accounts/AC1/Calls.json"
    );
    assert_eq!(
        HttpClient::build_url("https://monitor.twilio.com/v1/", "Alerts"),
        "https://monitor.twilio.com/v1/Alerts"
    );
}

// ============================================================================
// Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_page_decodes_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .and(query_param("PageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"sid": "AC1"}]
        })))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(test_config());
    let query = vec![("PageSize".to_string(), "100".to_string())];
    let body = client
        .fetch_page(&server.uri(), "Accounts.json", &query)
        .await
        .unwrap();

    assert_eq!(body["accounts"][0]["sid"], "AC1");
}

#[tokio::test]
async fn test_fetch_page_applies_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .and(basic_auth("AC123", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accounts": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        HttpClient::with_credentials(test_config(), Credentials::new("AC123", "secret"));
    client
        .fetch_page(&server.uri(), "Accounts.json", &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("authentication required"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(test_config());
    let err = client
        .fetch_page(&server.uri(), "Accounts.json", &[])
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("authentication required"));
        }
        other => panic!("Expected HttpStatus error, got: {other}"),
    }
}

#[tokio::test]
async fn test_server_error_retries_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accounts": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(test_config());
    let body = client
        .fetch_page(&server.uri(), "Accounts.json", &[])
        .await
        .unwrap();

    assert_eq!(body["accounts"], json!([]));
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3) // initial attempt + 2 retries
        .mount(&server)
        .await;

    let client = HttpClient::with_config(test_config());
    let err = client
        .fetch_page(&server.uri(), "Accounts.json", &[])
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, .. } => assert_eq!(status, 500),
        other => panic!("Expected HttpStatus error, got: {other}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(test_config());
    let err = client
        .fetch_page(&server.uri(), "Accounts.json", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http(_)));
}

#[test]
fn test_debug_does_not_leak_credentials() {
    let client =
        HttpClient::with_credentials(test_config(), Credentials::new("AC123", "hunter2"));
    let debug = format!("{client:?}");
    assert!(debug.contains("has_credentials: true"));
    assert!(!debug.contains("hunter2"));
}
