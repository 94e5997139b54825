//! The service's route handlers: static JSON emitters plus the not-found
//! envelope.
//!
//! These exist so a deployment pipeline has something observable to hit.
//! They hold no state beyond the values captured at startup and have no
//! failure modes.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::config::Environment;
use crate::request::Request;
use crate::response::{Json, Response};
use crate::router::Router;

const REPOSITORY: &str = "https://git.example.com/platform/canary";

/// Builds the route table. `started` anchors the uptime reported by
/// `/health`.
pub(crate) fn routes(environment: Environment, started: Instant) -> Router {
    Router::new()
        .get("/", move |_req: Request| root(environment))
        .get("/health", move |_req: Request| health(environment, started))
        .get("/api/info", api_info)
}

#[derive(Serialize)]
struct Greeting {
    message: &'static str,
    version: &'static str,
    environment: &'static str,
}

// GET /
async fn root(environment: Environment) -> Json<Greeting> {
    Json(Greeting {
        message: "canary is running",
        version: env!("CARGO_PKG_VERSION"),
        environment: environment.as_str(),
    })
}

#[derive(Serialize)]
struct HealthSnapshot {
    status: &'static str,
    timestamp: u64,
    uptime: f64,
    environment: &'static str,
}

// GET /health
async fn health(environment: Environment, started: Instant) -> Json<HealthSnapshot> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthSnapshot {
        status: "OK",
        timestamp,
        uptime: started.elapsed().as_secs_f64(),
        environment: environment.as_str(),
    })
}

#[derive(Serialize)]
struct ApiInfo {
    name: &'static str,
    description: &'static str,
    repository: &'static str,
    endpoints: [&'static str; 3],
}

// GET /api/info
async fn api_info(_req: Request) -> Json<ApiInfo> {
    Json(ApiInfo {
        name: env!("CARGO_PKG_NAME"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        repository: REPOSITORY,
        endpoints: ["GET /", "GET /health", "GET /api/info"],
    })
}

/// Terminal stage for unmatched routes. Echoes the method and path so a
/// client can tell "this route never existed" apart from other failures.
pub(crate) fn not_found(method: &Method, path: &str) -> Response {
    let body = json!({
        "error": "Route not found",
        "path": path,
        "method": method.as_str(),
    });
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .json(body.to_string().into_bytes())
}
