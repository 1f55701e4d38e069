use axum::Router;
use axum::extract::ConnectInfo;
use axum::http::Request;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::net::SocketAddr;
use tower::ServiceExt;
use yaya_webhook::testing::{TEST_SECRET, TestPayment, test_app};
use yaya_webhook::webhooks::{SignatureEngine, WebhookPayload};

fn benchmark_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature");

    let payment = TestPayment::new();
    let payload = WebhookPayload::from(payment.to_json()).validate().unwrap();
    let engine = SignatureEngine::new(TEST_SECRET.as_bytes());
    let signature = engine.sign(&payload);

    group.bench_function("canonicalize", |b| {
        b.iter(|| black_box(&payload).canonicalize());
    });

    group.bench_function("sign", |b| {
        b.iter(|| engine.sign(black_box(&payload)));
    });

    group.bench_function("verify", |b| {
        b.iter(|| engine.verify(black_box(&payload), black_box(&signature)));
    });

    group.finish();
}

async fn deliver(router: &Router, body: &str, signature: &str) {
    let mut req = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("yaya-signature", signature)
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));

    let _response = router.clone().oneshot(req).await.unwrap();
}

fn benchmark_webhook_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("webhook_request");

    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = rt.block_on(async { test_app() });

    // Timestamps are fixed at setup; the default window outlasts a bench run.
    let payment = TestPayment::new();
    let body = payment.to_json().to_string();
    let signature = payment.signature(TEST_SECRET);

    group.bench_function("accepted", |b| {
        b.iter(|| {
            rt.block_on(deliver(black_box(&router), &body, &signature));
        });
    });

    group.bench_function("bad_signature", |b| {
        b.iter(|| {
            rt.block_on(deliver(black_box(&router), &body, "00"));
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_signature, benchmark_webhook_request);
criterion_main!(benches);
