// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use reqwest::Method;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use verkko::{
    synthesize, Error, ExchangeOutcome, ExpectationEntry, HttpClient, Mode, RequestSpec,
    ResponseSpec, Session, SessionConfig, TransportError,
};

fn mocked<I, E>(entries: I) -> Session
where
    I: IntoIterator<Item = E>,
    E: Into<ExpectationEntry>,
{
    Session::mocked(entries).with_config(SessionConfig::new())
}

#[tokio::test]
async fn test_matching_request_gets_declared_response() {
    let client = HttpClient::new().unwrap();
    let entry = ExpectationEntry::new(
        ResponseSpec::status(200)
            .header("Content-Type", "text/plain")
            .body("hello"),
    )
    .request("GET http://localhost/");

    let (body, exchanges, context) = mocked([entry])
        .run_with_extra_info(async {
            let response = client.get("http://localhost/").await?;
            assert_eq!(response.status_code(), 200);
            assert_eq!(response.content_type(), Some("text/plain"));
            response.text()
        })
        .await
        .unwrap();

    assert_eq!(body, "hello");
    assert_eq!(exchanges.len(), 1);
    assert!(matches!(exchanges[0].outcome, ExchangeOutcome::Matched { entry: 0 }));
    assert_eq!(context.mode, Mode::Mock);
    assert_eq!(context.declared, 1);
    assert_eq!(context.consumed, 1);
}

#[tokio::test]
async fn test_status_shorthand() {
    let client = HttpClient::new().unwrap();
    let status = assert_ok!(
        mocked([("GET http://localhost/", 204u16)])
            .run(async { client.get("http://localhost/").await.map(|r| r.status_code()) })
            .await
    );
    assert_eq!(status, 204);
}

#[tokio::test]
async fn test_path_mismatch_is_reported() {
    let client = HttpClient::new().unwrap();
    let err = assert_err!(
        mocked([("GET /bar", 200u16)])
            .run(async { client.get("http://localhost/foo").await })
            .await
    );

    assert!(err.is_mismatch());
    let message = err.to_string();
    assert!(message.contains("GET /foo HTTP/1.1 // should be GET /bar"));
    assert!(message.contains("-GET /foo HTTP/1.1"));
    assert!(message.contains("+GET /bar HTTP/1.1"));
}

#[tokio::test]
async fn test_json_body_mismatch_is_reported() {
    let client = HttpClient::new().unwrap();
    let entry = ExpectationEntry::new(200u16)
        .request(RequestSpec::parse("POST http://localhost/").body(json!({"foo": 456})));

    let err = mocked([entry])
        .run(async {
            client
                .request(Method::POST, "http://localhost/")?
                .json(&json!({"foo": 123}))?
                .send()
                .await
        })
        .await
        .unwrap_err();

    assert!(err.is_mismatch());
    assert!(err.to_string().contains("\"foo\": 123 // should equal 456"));
}

#[tokio::test]
async fn test_unconsumed_entry_is_missing_traffic() {
    let client = HttpClient::new().unwrap();
    let err = mocked([("GET /first", 200u16), ("GET /second", 200u16)])
        .run(async { client.get("http://localhost/first").await })
        .await
        .unwrap_err();

    match &err {
        Error::MissingTraffic { missing, report } => {
            assert_eq!(*missing, 1);
            assert!(report.contains("GET /first HTTP/1.1"));
            assert!(report.contains("// missing:\n// GET /second"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_extra_request_is_unexpected() {
    let client = HttpClient::new().unwrap();
    let err = mocked([("GET /", 200u16)])
        .run(async {
            client.get("http://localhost/").await?;
            client.get("http://localhost/again").await
        })
        .await
        .unwrap_err();

    assert!(err.is_unexpected());
    let message = err.to_string();
    assert!(message.contains("// should be removed:"));
    assert!(message.contains("// GET /again HTTP/1.1"));
}

#[tokio::test]
async fn test_issuance_order_not_completion_order() {
    let client = HttpClient::new().unwrap();
    let entries = [
        ExpectationEntry::new(ResponseSpec::status(200).body("a")).request("GET /a"),
        ExpectationEntry::new(ResponseSpec::status(200).body("b")).request("GET /b"),
    ];

    let (a, b) = mocked(entries)
        .run(async {
            let a = client.get("http://localhost/a");
            let b = client.get("http://localhost/b");
            let (b, a) = tokio::join!(b, a);
            Ok::<_, Error>((a?.text()?, b?.text()?))
        })
        .await
        .unwrap();

    assert_eq!(a, "a");
    assert_eq!(b, "b");
}

#[tokio::test]
async fn test_declared_entries_are_snapshotted() {
    let client = HttpClient::new().unwrap();
    let mut declared = vec![ExpectationEntry::new(ResponseSpec::status(200).body("original"))
        .request("GET /")];

    let session = mocked(&declared);
    declared[0] = ExpectationEntry::new(ResponseSpec::status(500)).request("GET /changed");
    declared.push(ExpectationEntry::new(200u16));

    let body = session
        .run(async { client.get("http://localhost/").await?.text() })
        .await
        .unwrap();
    assert_eq!(body, "original");
}

#[tokio::test]
async fn test_encrypted_expectation_rejects_plain_request() {
    let client = HttpClient::new().unwrap();
    let err = mocked([("GET https://localhost/", 200u16)])
        .run(async { client.get("http://localhost/").await })
        .await
        .unwrap_err();
    assert!(err.is_mismatch());

    let status = mocked([("GET https://localhost/", 200u16)])
        .run(async { client.get("https://localhost/").await.map(|r| r.status_code()) })
        .await
        .unwrap();
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_error_response_reaches_caller() {
    let client = HttpClient::new().unwrap();
    let entry = ExpectationEntry::new(TransportError::socket_hang_up()).request("GET /");

    let err = mocked([entry])
        .run(async { client.get("http://localhost/").await })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Delegate { .. }));
    assert!(err.to_string().contains("socket hang up"));
}

#[tokio::test]
async fn test_delegate_error_carries_traffic() {
    let client = HttpClient::new().unwrap();
    let err = mocked([("GET /", 200u16)])
        .run(async {
            client
                .get("http://localhost/")
                .await
                .map_err(|e| e.to_string())?;
            Err::<(), String>("giving up".to_string())
        })
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("giving up\n\nGET / HTTP/1.1"));
    assert!(message.contains("HTTP/1.1 200 OK"));
}

#[tokio::test]
async fn test_synthesized_response_echoes_request() {
    let client = HttpClient::new().unwrap();
    let entry = ExpectationEntry::new(synthesize(|req, res| {
        res.status(201).header("X-Path", req.path.as_str());
        res.write(req.body.clone())?;
        res.end();
        Ok(())
    }))
    .request("POST /echo");

    let (status, path, body) = mocked([entry])
        .run(async {
            let response = client.post("http://localhost/echo", "ping").await?;
            Ok::<_, Error>((
                response.status_code(),
                response.header("x-path").map(String::from),
                response.text()?,
            ))
        })
        .await
        .unwrap();

    assert_eq!(status, 201);
    assert_eq!(path.as_deref(), Some("/echo"));
    assert_eq!(body, "ping");
}

#[tokio::test]
async fn test_failing_synthesizer_fails_session() {
    let client = HttpClient::new().unwrap();
    let entry = ExpectationEntry::new(synthesize(|_, _| anyhow::bail!("Oh no")));

    let err = mocked([entry])
        .run(async { client.get("http://localhost/").await })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Synthesizer(_)));
    assert!(err.to_string().contains("Oh no"));
}

#[tokio::test]
async fn test_panic_in_spawned_task_fails_session() {
    let err = mocked(Vec::<ExpectationEntry>::new())
        .run(async {
            let handle = tokio::spawn(async { panic!("boom in background") });
            let _ = handle.await;
            Ok::<_, Error>(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Escaped { .. }));
    assert!(err.to_string().contains("boom in background"));
}

#[tokio::test]
async fn test_malformed_json_expectations_fail_at_run() {
    let session = Session::mocked_from_json("[{\"request\": ").with_config(SessionConfig::new());
    let err = session.run(async { Ok::<_, Error>(()) }).await.unwrap_err();
    assert!(matches!(err, Error::Fixture { .. }));
}

#[tokio::test]
async fn test_json_expectations_with_predicate() {
    let client = HttpClient::new().unwrap();
    let session = Session::mocked_from_json(
        r#"[
            {
                "request": {
                    "url": "GET /users",
                    "headers": {"Authorization": {"$predicate": "startsWith", "value": "Bearer "}}
                },
                "response": {"statusCode": 200, "body": [{"id": 1}]}
            }
        ]"#,
    )
    .with_config(SessionConfig::new());

    let users: serde_json::Value = session
        .run(async {
            client
                .request(Method::GET, "http://localhost/users")?
                .header("Authorization", "Bearer abc")
                .send()
                .await?
                .json()
        })
        .await
        .unwrap();

    assert_eq!(users, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_panic_caught_by_code_under_test_is_not_escaped() {
    let client = HttpClient::new().unwrap();
    let (recovered, status) = mocked([("GET http://localhost/", 200u16)])
        .run(async {
            let recovered = std::panic::catch_unwind(|| panic!("handled locally")).is_err();
            let status = client.get("http://localhost/").await?.status_code();
            Ok::<_, Error>((recovered, status))
        })
        .await
        .unwrap();

    assert!(recovered);
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_panic_unwinding_out_of_code_under_test_is_escaped() {
    fn explode() -> Result<(), Error> {
        panic!("unwound")
    }

    let err = mocked(Vec::<ExpectationEntry>::new())
        .run(async { explode() })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Escaped { .. }));
    assert_eq!(err.to_string(), "panic escaped the code under test: unwound");
}
