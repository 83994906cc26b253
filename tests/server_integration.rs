//! End-to-end tests: HTTP surface, cache gate, ledger and SQLite together.
//!
//! The proxy is started on an ephemeral port against a mock upstream and an
//! on-disk database, with a manual clock so freshness is deterministic.

mod helpers;

use std::sync::Arc;

use chrono::TimeDelta;
use flight_proxy::server::serve;
use flight_proxy::usage::ManualClock;
use flight_proxy::init_app_state;
use helpers::{departures_body, instant, manual_clock, test_config, UPSTREAM_PATH};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct RunningProxy {
    base: String,
    clock: Arc<ManualClock>,
    shutdown: Option<oneshot::Sender<()>>,
    _db_dir: TempDir,
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_proxy(upstream: &MockServer) -> RunningProxy {
    let db_dir = TempDir::new().expect("temp dir");
    let config = test_config(&db_dir.path().join("usage.db"), &upstream.uri());
    let clock = manual_clock(instant(2025, 2, 20, 12, 0));

    let state = init_app_state(&config, clock.clone())
        .await
        .expect("app state builds");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = serve(listener, state, async {
            let _ = rx.await;
        })
        .await;
    });

    RunningProxy {
        base: format!("http://{}/api/flightinfo", addr),
        clock,
        shutdown: Some(tx),
        _db_dir: db_dir,
    }
}

async fn get_json(url: &str) -> (u16, Value) {
    let response = reqwest::get(url).await.expect("request succeeds");
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_ping() {
    let upstream = MockServer::start().await;
    let proxy = start_proxy(&upstream).await;

    let body = reqwest::get(format!("{}/ping", proxy.base))
        .await
        .expect("request succeeds")
        .text()
        .await
        .expect("body");
    assert_eq!(body, "FlightInfo API is awake");
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let upstream = MockServer::start().await;
    let now = instant(2025, 2, 20, 12, 0);
    Mock::given(method("GET"))
        .and(path(format!("{}LHR", UPSTREAM_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_string(departures_body(
            now,
            &[("late", 90), ("gone", -30), ("soon", 5)],
        )))
        .expect(1)
        .mount(&upstream)
        .await;
    let proxy = start_proxy(&upstream).await;
    let url = format!(
        "{}/departures?iataCode=LHR&offsetMinutes=-120&durationMinutes=720",
        proxy.base
    );

    let (status, first) = get_json(&url).await;
    assert_eq!(status, 200);
    let numbers: Vec<&str> = first
        .as_array()
        .expect("array body")
        .iter()
        .filter_map(|f| f["flightNumber"].as_str())
        .collect();
    assert_eq!(numbers, vec!["soon", "late"]);

    proxy.clock.advance(TimeDelta::seconds(60));
    let (_, second) = get_json(&url).await;
    assert_eq!(second.as_array().map(Vec::len), Some(2));

    let (_, usage) = get_json(&format!("{}/usage", proxy.base)).await;
    assert_eq!(usage["calls_this_cycle"], 1);
    assert_eq!(usage["credits_remaining"], 999);
    assert_eq!(usage["tier"], "tier1");
    assert_eq!(usage["interval_seconds"], 120);
    assert_eq!(usage["cycle_start"], "2025-02-20");
    assert_eq!(usage["outcomes"]["cache_hit"], 1);
    assert_eq!(usage["outcomes"]["upstream_success"], 1);
}

#[tokio::test]
async fn test_upstream_failure_returns_empty_list_without_charge() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&upstream)
        .await;
    let proxy = start_proxy(&upstream).await;
    let url = format!(
        "{}/arrivals?iataCode=AMS&offsetMinutes=0&durationMinutes=60",
        proxy.base
    );

    // Failed refreshes are retried on the next request, not cached
    for _ in 0..2 {
        let (status, body) = get_json(&url).await;
        assert_eq!(status, 200);
        assert_eq!(body, serde_json::json!([]));
    }

    let (_, usage) = get_json(&format!("{}/usage", proxy.base)).await;
    assert_eq!(usage["calls_this_cycle"], 0);
    assert_eq!(usage["outcomes"]["upstream_transport_failure"], 2);
}

#[tokio::test]
async fn test_missing_query_parameters_are_rejected() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&upstream)
        .await;
    let proxy = start_proxy(&upstream).await;

    let response = reqwest::get(format!("{}/departures?iataCode=LHR", proxy.base))
        .await
        .expect("request succeeds");
    assert_eq!(response.status().as_u16(), 400);
}
