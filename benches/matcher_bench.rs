// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use verkko::body::Body;
use verkko::fixture;
use verkko::matcher::{diff_json, match_request};
use verkko::{Headers, RequestDescriptor, RequestSpec};

fn request_matching_benchmark(c: &mut Criterion) {
    let spec = RequestSpec::parse("POST https://api.example.com/v1/orders?page=2")
        .header("Content-Type", "application/json")
        .body(json!({"customer": 42, "items": [{"sku": "A-1", "qty": 3}]}));

    let request = RequestDescriptor::new("POST", "https://api.example.com/v1/orders?page=2")
        .unwrap()
        .with_headers(
            Headers::new()
                .with("Host", "api.example.com")
                .with("Content-Type", "application/json"),
        )
        .with_body(Body::json(&json!({"customer": 42, "items": [{"sku": "A-1", "qty": 4}]})));

    c.bench_function("match_request", |b| {
        b.iter(|| {
            let report = futures::executor::block_on(match_request(&spec, &request)).unwrap();
            black_box(report.is_match())
        })
    });
}

fn json_diff_benchmark(c: &mut Criterion) {
    let expected = json!({
        "id": 1,
        "tags": ["a", "b", "c"],
        "owner": {"name": "foo", "roles": ["admin", "dev"]},
    });
    let actual = json!({
        "id": 2,
        "tags": ["a", "c"],
        "owner": {"name": "foo", "roles": ["dev"]},
    });

    c.bench_function("diff_json", |b| {
        b.iter(|| black_box(diff_json(&actual, &expected)))
    });
}

fn fixture_parsing_benchmark(c: &mut Criterion) {
    let text = r#"[
        {"request": "GET https://api.example.com/users", "response": {"statusCode": 200, "body": [{"id": 1}]}},
        {"request": {"url": "POST /users", "host": "api.example.com", "headers": {"Content-Type": "application/json"}, "body": {"name": "foo"}}, "response": 201},
        {"request": "DELETE https://api.example.com/users/1", "response": {"$error": {"message": "socket hang up", "code": "ECONNRESET"}}}
    ]"#;

    c.bench_function("parse_fixture", |b| {
        b.iter(|| black_box(fixture::parse(text).unwrap().len()))
    });
}

criterion_group!(
    benches,
    request_matching_benchmark,
    json_diff_benchmark,
    fixture_parsing_benchmark
);
criterion_main!(benches);
