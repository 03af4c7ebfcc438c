//! Tests for the engine module

use super::*;
use crate::cursor::CursorSpec;
use crate::http::{HttpClient, HttpClientConfig};
use crate::streams::{ParentLink, PathSpec, StreamDefinition};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine() -> SyncEngine<HttpClient> {
    let config = HttpClientConfig::builder()
        .no_rate_limit()
        .max_retries(0)
        .build();
    SyncEngine::new(HttpClient::with_config(config))
}

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_message_record() {
    let msg = Message::record("calls", json!({"sid": "CA1"}));
    assert!(msg.is_record());
    assert!(!msg.is_state());
    assert!(!msg.is_log());
}

#[test]
fn test_message_state() {
    let msg = Message::state("calls", json!({"end_time": "2021-01-01T00:00:00Z"}));
    assert!(msg.is_state());
    assert!(!msg.is_record());
}

#[test]
fn test_message_log() {
    assert!(Message::info("test message").is_log());
    assert!(Message::debug("debug").is_log());
    assert!(Message::warn("warning").is_log());
}

// ============================================================================
// SyncStats Tests
// ============================================================================

#[test]
fn test_sync_stats_mutations() {
    let mut stats = SyncStats::new();

    stats.add_records(100);
    assert_eq!(stats.records_synced, 100);

    stats.add_page();
    stats.add_page();
    assert_eq!(stats.pages_fetched, 2);

    stats.add_slice();
    assert_eq!(stats.slices_read, 1);

    stats.add_stream();
    assert_eq!(stats.streams_synced, 1);

    stats.set_duration(1500);
    assert_eq!(stats.duration_ms, 1500);
}

// ============================================================================
// Pagination Loop Tests
// ============================================================================

#[tokio::test]
async fn test_single_page_stream_terminates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .and(query_param("PageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"sid": "AC1"}, {"sid": "AC2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let def = StreamDefinition::new("accounts").with_url_base(server.uri());
    let mut engine = engine();
    let mut state = StreamState::new();

    let messages = engine.read_stream(&def, &mut state, None).await.unwrap();

    let records: Vec<_> = messages.iter().filter(|m| m.is_record()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(engine.stats().pages_fetched, 1);
    assert_eq!(engine.stats().records_synced, 2);
    assert_eq!(engine.stats().slices_read, 1);
}

#[tokio::test]
async fn test_pagination_emits_union_of_pages() {
    let server = MockServer::start().await;

    // Page 2 mounted first: its matcher set is more specific
    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .and(query_param("PageToken", "abc"))
        .and(query_param("Page", "1"))
        .and(query_param("PageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"sid": "AC3"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .and(query_param_is_missing("PageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"sid": "AC1"}, {"sid": "AC2"}],
            "next_page_uri": "/2010-04-01/Accounts.json?PageToken=abc&Page=1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let def = StreamDefinition::new("accounts").with_url_base(server.uri());
    let mut engine = engine();
    let mut state = StreamState::new();

    let messages = engine.read_stream(&def, &mut state, None).await.unwrap();

    let sids: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Record { record, .. } => Some(record["sid"].as_str().unwrap().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(sids, vec!["AC1", "AC2", "AC3"]);
    assert_eq!(engine.stats().pages_fetched, 2);
}

#[tokio::test]
async fn test_missing_record_key_is_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "first_page_uri": "/2010-04-01/Accounts.json?Page=0"
        })))
        .mount(&server)
        .await;

    let def = StreamDefinition::new("accounts").with_url_base(server.uri());
    let mut engine = engine();
    let mut state = StreamState::new();

    let messages = engine.read_stream(&def, &mut state, None).await.unwrap();
    assert_eq!(messages.iter().filter(|m| m.is_record()).count(), 0);
}

#[tokio::test]
async fn test_malformed_continuation_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"sid": "AC1"}],
            "next_page_uri": 17
        })))
        .mount(&server)
        .await;

    let def = StreamDefinition::new("accounts").with_url_base(server.uri());
    let mut engine = engine();
    let mut state = StreamState::new();

    let err = engine.read_stream(&def, &mut state, None).await.unwrap_err();
    assert!(matches!(err, crate::error::Error::Pagination { .. }));
}

#[tokio::test]
async fn test_http_error_aborts_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let def = StreamDefinition::new("accounts").with_url_base(server.uri());
    let mut engine = engine();
    let mut state = StreamState::new();

    let err = engine.read_stream(&def, &mut state, None).await.unwrap_err();
    assert!(matches!(
        err,
        crate::error::Error::HttpStatus { status: 404, .. }
    ));
}

// ============================================================================
// Incremental Tests
// ============================================================================

#[tokio::test]
async fn test_incremental_filter_from_start_date() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Alerts"))
        .and(query_param("StartDate", "2021-01-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let def = StreamDefinition::new("alerts")
        .with_url_base(server.uri())
        .with_path(PathSpec::CollectionBare)
        .with_cursor(CursorSpec::new("date_updated", "StartDate"));
    let mut engine = engine();
    let mut state = StreamState::new();

    engine
        .read_stream(&def, &mut state, Some("2021-01-01T00:00:00Z"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_incremental_state_takes_precedence_over_start_date() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Alerts"))
        .and(query_param("StartDate", "2021-06-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let def = StreamDefinition::new("alerts")
        .with_url_base(server.uri())
        .with_path(PathSpec::CollectionBare)
        .with_cursor(CursorSpec::new("date_updated", "StartDate"));
    let mut engine = engine();
    let mut state = StreamState::new();
    state.set_watermark("date_updated", "2021-06-01T00:00:00Z".to_string());

    engine
        .read_stream(&def, &mut state, Some("2021-01-01T00:00:00Z"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_incremental_watermark_advances_and_state_message_emitted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": [
                {"sid": "NO1", "date_updated": "2021-03-01T10:00:00Z"},
                {"sid": "NO2", "date_updated": "2021-02-01T10:00:00Z"}
            ]
        })))
        .mount(&server)
        .await;

    let def = StreamDefinition::new("alerts")
        .with_url_base(server.uri())
        .with_path(PathSpec::CollectionBare)
        .with_cursor(CursorSpec::new("date_updated", "StartDate"));
    let mut engine = engine();
    let mut state = StreamState::new();

    let messages = engine.read_stream(&def, &mut state, None).await.unwrap();

    // Max of observed values, not the last one
    assert_eq!(
        state.watermark("date_updated"),
        Some("2021-03-01T10:00:00Z")
    );

    let state_msg = messages.iter().find(|m| m.is_state()).unwrap();
    match state_msg {
        Message::State { stream, data } => {
            assert_eq!(stream, "alerts");
            assert_eq!(data["date_updated"], "2021-03-01T10:00:00Z");
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_incremental_missing_cursor_field_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": [{"sid": "NO1"}]
        })))
        .mount(&server)
        .await;

    let def = StreamDefinition::new("alerts")
        .with_url_base(server.uri())
        .with_path(PathSpec::CollectionBare)
        .with_cursor(CursorSpec::new("date_updated", "StartDate"));
    let mut engine = engine();
    let mut state = StreamState::new();

    let err = engine.read_stream(&def, &mut state, None).await.unwrap_err();
    assert!(matches!(
        err,
        crate::error::Error::MissingCursorField { .. }
    ));
}

// ============================================================================
// Nested Stream Tests
// ============================================================================

fn accounts_def(base: &str) -> Arc<StreamDefinition> {
    Arc::new(StreamDefinition::new("accounts").with_url_base(base))
}

#[tokio::test]
async fn test_nested_stream_reads_per_parent_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [
                {"sid": "AC1", "subresource_uris": {"calls": "/2010-04-01/Accounts/AC1/Calls.json"}},
                {"sid": "AC2", "subresource_uris": {"calls": "/2010-04-01/Accounts/AC2/Calls.json"}}
            ]
        })))
        .mount(&server)
        .await;

    for account in ["AC1", "AC2"] {
        Mock::given(method("GET"))
            .and(path(format!("/2010-04-01/Accounts/{account}/Calls.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "calls": [{"sid": format!("CA-{account}")}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let accounts = accounts_def(&server.uri());
    let calls = StreamDefinition::new("calls")
        .with_url_base(server.uri())
        .with_path(PathSpec::FromSlice)
        .with_parent(ParentLink::subresource_uri(accounts));

    let mut engine = engine();
    let mut state = StreamState::new();
    let messages = engine.read_stream(&calls, &mut state, None).await.unwrap();

    assert_eq!(messages.iter().filter(|m| m.is_record()).count(), 2);
    assert_eq!(engine.stats().slices_read, 2);
}

#[tokio::test]
async fn test_nested_stream_skips_unqualified_parents() {
    let server = MockServer::start().await;

    // Locator absent for AC1, sentinel value for SM2 analog; only AC3 qualifies
    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [
                {"sid": "AC1"},
                {"sid": "AC2", "subresource_uris": {}},
                {"sid": "AC3", "subresource_uris": {"calls": "/2010-04-01/Accounts/AC3/Calls.json"}}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2010-04-01/Accounts/AC3/Calls.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "calls": [{"sid": "CA1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let accounts = accounts_def(&server.uri());
    let calls = StreamDefinition::new("calls")
        .with_url_base(server.uri())
        .with_path(PathSpec::FromSlice)
        .with_parent(ParentLink::subresource_uri(accounts));

    let mut engine = engine();
    let slices = engine.stream_slices(&calls).await.unwrap();
    assert_eq!(slices.len(), 1);
    assert_eq!(
        slices[0].subresource_uri(),
        Some("/2010-04-01/Accounts/AC3/Calls.json")
    );
}

#[tokio::test]
async fn test_media_validation_skip_rule() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Messages.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"sid": "SM1", "num_media": "0",
                 "subresource_uris": {"media": "/2010-04-01/Accounts/AC1/Messages/SM1/Media.json"}},
                {"sid": "SM2", "num_media": "5",
                 "subresource_uris": {"media": "/2010-04-01/Accounts/AC1/Messages/SM2/Media.json"}}
            ]
        })))
        .mount(&server)
        .await;

    let messages = Arc::new(StreamDefinition::new("messages").with_url_base(server.uri()));
    let media = StreamDefinition::new("message_media")
        .with_data_field("media_list")
        .with_url_base(server.uri())
        .with_path(PathSpec::FromSlice)
        .with_parent(
            ParentLink::subresource_uri_keyed(messages, "media").rejecting("num_media", "0"),
        );

    let mut engine = engine();
    let slices = engine.stream_slices(&media).await.unwrap();

    // SM1 filtered out by the num_media rule, SM2 yields exactly one slice
    assert_eq!(slices.len(), 1);
    assert_eq!(
        slices[0].subresource_uri(),
        Some("/2010-04-01/Accounts/AC1/Messages/SM2/Media.json")
    );
}

#[tokio::test]
async fn test_parent_resolution_is_full_refresh() {
    let server = MockServer::start().await;

    // Parent request must carry no incremental filter even though the
    // parent stream itself is incremental
    Mock::given(method("GET"))
        .and(path("/Messages.json"))
        .and(query_param_is_missing("DateSent>"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"sid": "SM1", "num_media": "1",
                "subresource_uris": {"media": "/2010-04-01/Accounts/AC1/Messages/SM1/Media.json"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let messages = Arc::new(
        StreamDefinition::new("messages")
            .with_url_base(server.uri())
            .with_cursor(CursorSpec::new("date_sent", "DateSent>")),
    );
    let media = StreamDefinition::new("message_media")
        .with_data_field("media_list")
        .with_url_base(server.uri())
        .with_path(PathSpec::FromSlice)
        .with_parent(ParentLink::subresource_uri_keyed(messages, "media"));

    let mut engine = engine();
    let slices = engine.stream_slices(&media).await.unwrap();
    assert_eq!(slices.len(), 1);
}

#[tokio::test]
async fn test_three_level_chain_slice_product() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [
                {"sid": "AC1", "subresource_uris": {"addresses": "/2010-04-01/Accounts/AC1/Addresses.json"}},
                {"sid": "AC2", "subresource_uris": {"addresses": "/2010-04-01/Accounts/AC2/Addresses.json"}}
            ]
        })))
        .mount(&server)
        .await;

    // AC1 has two addresses, AC2 has one
    Mock::given(method("GET"))
        .and(path("/2010-04-01/Accounts/AC1/Addresses.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "addresses": [
                {"sid": "AD1", "account_sid": "AC1"},
                {"sid": "AD2", "account_sid": "AC1"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2010-04-01/Accounts/AC2/Addresses.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "addresses": [{"sid": "AD3", "account_sid": "AC2"}]
        })))
        .mount(&server)
        .await;

    for (account, address) in [("AC1", "AD1"), ("AC1", "AD2"), ("AC2", "AD3")] {
        Mock::given(method("GET"))
            .and(path(format!(
                "/Accounts/{account}/Addresses/{address}/DependentPhoneNumbers.json"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dependent_phone_numbers": [{"sid": format!("PN-{address}")}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let accounts = accounts_def(&server.uri());
    let addresses = Arc::new(
        StreamDefinition::new("addresses")
            .with_url_base(server.uri())
            .with_path(PathSpec::FromSlice)
            .with_parent(ParentLink::subresource_uri(accounts)),
    );
    let dependent = StreamDefinition::new("dependent_phone_numbers")
        .with_url_base(server.uri())
        .with_path(PathSpec::Template(
            "Accounts/{{ account_sid }}/Addresses/{{ sid }}/DependentPhoneNumbers.json",
        ))
        .with_parent(ParentLink::record_fields(addresses, &["sid", "account_sid"]));

    let mut engine = engine();

    // One slice per (address, account) pair - the product structure, not a
    // flattened single level
    let slices = engine.stream_slices(&dependent).await.unwrap();
    assert_eq!(slices.len(), 3);

    let mut state = StreamState::new();
    let messages = engine
        .read_stream(&dependent, &mut state, None)
        .await
        .unwrap();
    assert_eq!(messages.iter().filter(|m| m.is_record()).count(), 3);
}

#[tokio::test]
async fn test_parent_chain_failure_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let accounts = accounts_def(&server.uri());
    let calls = StreamDefinition::new("calls")
        .with_url_base(server.uri())
        .with_path(PathSpec::FromSlice)
        .with_parent(ParentLink::subresource_uri(accounts));

    let mut engine = engine();
    let mut state = StreamState::new();
    let err = engine.read_stream(&calls, &mut state, None).await.unwrap_err();
    assert!(matches!(
        err,
        crate::error::Error::HttpStatus { status: 500, .. }
    ));
}

#[tokio::test]
async fn test_usage_stream_slice_per_account() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Accounts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"sid": "AC1"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Accounts/AC1/Usage/Records.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usage_records": [{"category": "calls", "end_date": "2021-01-15"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let accounts = accounts_def(&server.uri());
    let usage = StreamDefinition::new("usage_records")
        .with_url_base(server.uri())
        .with_path(PathSpec::Template(
            "Accounts/{{ account_sid }}/Usage/Records.json",
        ))
        .with_parent(ParentLink::owning_account(accounts))
        .with_cursor(
            CursorSpec::new("end_date", "EndDate")
                .with_template(crate::cursor::DAILY_TIME_TEMPLATE),
        );

    let mut engine = engine();
    let mut state = StreamState::new();
    let messages = engine.read_stream(&usage, &mut state, None).await.unwrap();

    assert_eq!(messages.iter().filter(|m| m.is_record()).count(), 1);
    assert_eq!(state.watermark("end_date"), Some("2021-01-15"));
}
