//! Whole-request tests: every request runs through the assembled pipeline
//! exactly as it would in production, minus the TCP listener.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, header};
use serde_json::Value;

use canary::middleware::RateLimitConfig;
use canary::{Config, Environment, Pipeline, Request, Response};

fn config() -> Config {
    Config {
        port: 0,
        environment: Environment::Development,
        rate_limit: RateLimitConfig::default(),
    }
}

fn pipeline() -> Pipeline {
    canary::app(&config())
}

fn client(n: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, n))
}

async fn send(pipeline: &Pipeline, method: Method, path: &str, from: IpAddr) -> Response {
    pipeline
        .handle(Request::new(method, path, HeaderMap::new(), Bytes::new(), from))
        .await
}

fn body_json(response: &Response) -> Value {
    serde_json::from_slice(response.body()).expect("response body is JSON")
}

// ── Documented routes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn root_returns_the_documented_envelope() {
    let response = send(&pipeline(), Method::GET, "/", client(1)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body = body_json(&response);
    assert!(body["message"].is_string());
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn health_returns_ok_with_nonnegative_uptime() {
    let response = send(&pipeline(), Method::GET, "/health", client(1)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = body_json(&response);
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_u64());
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn api_info_lists_the_endpoints() {
    let response = send(&pipeline(), Method::GET, "/api/info", client(1)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = body_json(&response);
    assert!(body["name"].is_string());
    assert!(body["description"].is_string());
    assert!(body["repository"].is_string());
    let endpoints = body["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 3);
    assert!(endpoints.contains(&Value::from("GET /health")));
}

// ── Not-found ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unmatched_path_echoes_itself_in_a_404() {
    let response = send(&pipeline(), Method::GET, "/nope", client(1)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let body = body_json(&response);
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["path"], "/nope");
    assert_eq!(body["method"], "GET");
}

#[tokio::test]
async fn unmatched_method_on_a_known_path_is_also_404() {
    let response = send(&pipeline(), Method::POST, "/health", client(1)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let body = body_json(&response);
    assert_eq!(body["path"], "/health");
    assert_eq!(body["method"], "POST");
}

// ── Body parsing ──────────────────────────────────────────────────────────────

async fn send_with_body(
    pipeline: &Pipeline,
    content_type: Option<&str>,
    body: &str,
) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(ct) = content_type {
        headers.insert(header::CONTENT_TYPE, ct.parse().unwrap());
    }
    let request = Request::new(
        Method::GET,
        "/",
        headers,
        Bytes::copy_from_slice(body.as_bytes()),
        client(1),
    );
    pipeline.handle(request).await
}

#[tokio::test]
async fn malformed_json_body_never_reaches_a_handler() {
    let response = send_with_body(&pipeline(), Some("application/json"), "{oops").await;

    // The route exists and would have answered 200; the 400 proves the
    // fault short-circuited before dispatch.
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = body_json(&response);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["message"], "invalid body");
}

#[tokio::test]
async fn well_formed_json_body_passes_through_to_the_route() {
    let response =
        send_with_body(&pipeline(), Some("application/json"), r#"{"ping":true}"#).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn non_json_content_is_not_parsed() {
    let response = send_with_body(&pipeline(), Some("text/plain"), "{oops").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

// ── Rate limiting ─────────────────────────────────────────────────────────────

fn small_budget_pipeline(max_requests: u32) -> Pipeline {
    canary::app(&Config {
        port: 0,
        environment: Environment::Development,
        rate_limit: RateLimitConfig {
            window: Duration::from_secs(3600),
            max_requests,
        },
    })
}

#[tokio::test]
async fn the_n_plus_first_request_is_rejected() {
    let pipeline = small_budget_pipeline(3);

    for _ in 0..3 {
        let response = send(&pipeline, Method::GET, "/health", client(1)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let response = send(&pipeline, Method::GET, "/health", client(1)).await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);

    let body = body_json(&response);
    assert_eq!(body["error"], "Too Many Requests");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn rejection_is_per_client_identity() {
    let pipeline = small_budget_pipeline(1);

    assert_eq!(
        send(&pipeline, Method::GET, "/", client(1)).await.status_code(),
        StatusCode::OK
    );
    assert_eq!(
        send(&pipeline, Method::GET, "/", client(1)).await.status_code(),
        StatusCode::TOO_MANY_REQUESTS
    );
    // A different origin still has its full budget.
    assert_eq!(
        send(&pipeline, Method::GET, "/", client(2)).await.status_code(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn rejected_requests_still_count_against_the_window() {
    let pipeline = small_budget_pipeline(1);

    send(&pipeline, Method::GET, "/", client(1)).await;
    for _ in 0..3 {
        let response = send(&pipeline, Method::GET, "/", client(1)).await;
        assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}

// ── Cross-cutting response decoration ─────────────────────────────────────────

#[tokio::test]
async fn security_headers_are_present_on_every_outcome() {
    let pipeline = small_budget_pipeline(1);

    let ok = send(&pipeline, Method::GET, "/", client(1)).await;
    let limited = send(&pipeline, Method::GET, "/", client(1)).await;
    let missing = send(&pipeline, Method::GET, "/nope", client(2)).await;
    let faulted = send_with_body(&pipeline, Some("application/json"), "{oops").await;

    for response in [&ok, &limited, &missing, &faulted] {
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(
            response.headers()["referrer-policy"],
            "no-referrer"
        );
    }
}
