// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::time::{Duration, Instant};

use reqwest::Method;
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use verkko::{
    fixture, Error, ExchangeOutcome, ExpectationEntry, HttpClient, Mode, ResponseSpec, Session,
    SessionConfig,
};

async fn serve(route: &str, template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_recorded_session_forwards_and_keeps_exchanges() {
    let server = serve(
        "/hello",
        ResponseTemplate::new(200).set_body_raw("hello world", "text/plain"),
    )
    .await;
    let client = HttpClient::new().unwrap();
    let url = format!("{}/hello", server.uri());

    let (body, exchanges, context) = Session::recorded()
        .with_config(SessionConfig::new())
        .run_with_extra_info(async { client.get(&url).await?.text() })
        .await
        .unwrap();

    assert_eq!(body, "hello world");
    assert_eq!(context.mode, Mode::Record);
    assert_eq!(exchanges.len(), 1);
    assert!(matches!(exchanges[0].outcome, ExchangeOutcome::Forwarded));
    assert_eq!(exchanges[0].request.path, "/hello");
}

#[tokio::test]
async fn test_fixture_capture_then_replay() {
    let server = serve(
        "/users",
        ResponseTemplate::new(200).set_body_raw(r#"[{"id":1}]"#, "application/json"),
    )
    .await;
    let url = format!("{}/users", server.uri());
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("fixtures/users.json");
    let client = HttpClient::new().unwrap();

    let (first, _, context) = Session::from_file(&file)
        .with_config(SessionConfig::new())
        .run_with_extra_info(async { client.get(&url).await?.json::<Value>() })
        .await
        .unwrap();
    assert_eq!(context.mode, Mode::Capture);
    assert!(file.exists());

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(written[0]["request"]["url"], "GET /users");
    assert_eq!(written[0]["response"]["body"], serde_json::json!([{"id": 1}]));

    drop(server);

    let (second, exchanges, context) = Session::from_file(&file)
        .with_config(SessionConfig::new())
        .run_with_extra_info(async { client.get(&url).await?.json::<Value>() })
        .await
        .unwrap();
    assert_eq!(context.mode, Mode::Replay);
    assert_eq!(context.fixture.as_deref(), Some(file.as_path()));
    assert!(matches!(exchanges[0].outcome, ExchangeOutcome::Matched { entry: 0 }));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_forced_write_recaptures_existing_fixture() {
    let server = serve("/", ResponseTemplate::new(200).set_body_raw("fresh", "text/plain")).await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("stale.json");
    std::fs::write(&file, r#"[{"request": "GET /", "response": {"body": "stale"}}]"#).unwrap();
    let client = HttpClient::new().unwrap();

    let body = Session::from_file(&file)
        .with_config(SessionConfig::new().force_write(true))
        .run(async { client.get(format!("{}/", server.uri())).await?.text() })
        .await
        .unwrap();

    assert_eq!(body, "fresh");
    let text = std::fs::read_to_string(&file).unwrap();
    assert!(text.contains("\"fresh\""));
    assert!(!text.contains("stale"));
}

#[tokio::test]
async fn test_short_binary_body_fixture() {
    let bytes = vec![0x66u8, 0x6f, 0x6f, 0xff, 0x00];
    let server = serve(
        "/bin",
        ResponseTemplate::new(200).set_body_raw(bytes.clone(), "application/octet-stream"),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("short.json");
    let client = HttpClient::new().unwrap();
    let url = format!("{}/bin", server.uri());

    Session::from_file(&file)
        .with_config(SessionConfig::new())
        .run(async { client.get(&url).await })
        .await
        .unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(
        written[0]["response"]["body"],
        serde_json::json!({"$bytes": [0x66, 0x6f, 0x6f, 0xff, 0x00]})
    );

    drop(server);
    let replayed = Session::from_file(&file)
        .with_config(SessionConfig::new())
        .run(async { client.get(&url).await.map(|r| r.bytes().to_vec()) })
        .await
        .unwrap();
    assert_eq!(replayed, bytes);
}

#[tokio::test]
async fn test_long_binary_body_fixture() {
    let bytes: Vec<u8> = (0..=255u8).rev().collect();
    let server = serve(
        "/blob",
        ResponseTemplate::new(200).set_body_raw(bytes.clone(), "application/octet-stream"),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("long.json");
    let client = HttpClient::new().unwrap();
    let url = format!("{}/blob", server.uri());

    Session::from_file(&file)
        .with_config(SessionConfig::new())
        .run(async { client.get(&url).await })
        .await
        .unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert!(written[0]["response"]["body"]["$base64"].is_string());

    let entries = fixture::read(&file).unwrap();
    drop(server);
    let replayed = Session::mocked(&entries)
        .with_config(SessionConfig::new())
        .run(async { client.get(&url).await.map(|r| r.bytes().to_vec()) })
        .await
        .unwrap();
    assert_eq!(replayed, bytes);
}

#[tokio::test]
async fn test_verified_session_reports_divergence() {
    let server = serve(
        "/status",
        ResponseTemplate::new(200).set_body_raw("live", "text/plain"),
    )
    .await;
    let url = format!("{}/status", server.uri());
    let client = HttpClient::new().unwrap();
    let entry = ExpectationEntry::new(
        ResponseSpec::status(200)
            .header("Content-Type", "text/plain")
            .body("mocked"),
    )
    .request(format!("GET {}", url));

    let err = Session::mocked([entry.clone()])
        .verified()
        .with_config(SessionConfig::new())
        .run(async { client.get(&url).await?.text() })
        .await
        .unwrap_err();

    assert!(err.is_divergence());
    let message = err.to_string();
    assert!(message.starts_with("The mock and service have diverged."));
    assert!(message.contains("GET /status HTTP/1.1"));

    let agreeing = ExpectationEntry::new(
        ResponseSpec::status(200)
            .header("Content-Type", "text/plain")
            .body("live"),
    )
    .request(format!("GET {}", url));
    let body = Session::mocked([agreeing])
        .with_config(SessionConfig::new().force_verify(true))
        .run(async { client.get(&url).await?.text() })
        .await
        .unwrap();
    assert_eq!(body, "live");
}

#[tokio::test]
async fn test_unreachable_service_is_recorded_as_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = HttpClient::new().unwrap();
    let (result, exchanges, _) = Session::recorded()
        .with_config(SessionConfig::new())
        .run_with_extra_info(async {
            Ok::<_, Error>(client.get(format!("http://127.0.0.1:{}/", port)).await)
        })
        .await
        .unwrap();

    let err = result.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(
        err.transport_error().and_then(|e| e.code()),
        Some("ECONNREFUSED")
    );
    assert!(exchanges[0].response.error().is_some());
}

#[tokio::test]
async fn test_request_timeout_is_enforced_upstream() {
    let server = serve(
        "/slow",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
    )
    .await;
    let url = format!("{}/slow", server.uri());
    let client = HttpClient::new().unwrap();

    let started = Instant::now();
    let (result, exchanges, _) = Session::recorded()
        .with_config(SessionConfig::new())
        .run_with_extra_info(async {
            let request = client
                .request(Method::GET, &url)?
                .timeout(Duration::from_millis(100));
            Ok::<_, Error>(request.send().await)
        })
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    let err = result.unwrap_err();
    assert_eq!(
        err.transport_error().and_then(|e| e.code()),
        Some("ETIMEDOUT")
    );
    assert_eq!(exchanges[0].response.error().and_then(|e| e.code()), Some("ETIMEDOUT"));
}
