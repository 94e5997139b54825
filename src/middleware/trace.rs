//! Per-request log record.
//!
//! One event per request/response pair, written after the response is
//! determined. The `tracing` dispatch never blocks the response path on the
//! sink and never surfaces sink failures to the client.

use std::time::Duration;

use http::{Method, StatusCode};
use tracing::info;

pub(crate) fn record(method: &Method, path: &str, status: StatusCode, latency: Duration) {
    info!(
        %method,
        path,
        status = status.as_u16(),
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );
}
