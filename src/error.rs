//! Infrastructure errors, pipeline faults, and the terminal error handler.
//!
//! Two failure shapes live here and they never mix:
//!
//! - [`Error`] surfaces infrastructure failures — binding a port, accepting
//!   a connection. It ends up in `main`, never in a response body.
//! - [`Fault`] is the value a pipeline stage returns when a request cannot
//!   proceed. It carries a status and a message and flows to the
//!   [`ErrorHandler`], which converts it into the one JSON envelope the
//!   client sees. No stage signals failure by panicking or by raw transport
//!   errors.

use std::fmt;

use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

use crate::config::Environment;
use crate::response::Response;

// ── Infrastructure error ──────────────────────────────────────────────────────

/// The error type returned by canary's fallible operations.
///
/// Request-level failures are expressed as [`Fault`]s, not as `Error`s.
#[derive(Debug)]
pub struct Error(std::io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}

// ── Fault ─────────────────────────────────────────────────────────────────────

/// A request-level failure signal.
///
/// Created by whichever stage detects the problem, consumed exactly once by
/// [`ErrorHandler::handle`]. The status defaults to 500 when a constructor
/// has nothing more specific to say.
#[derive(Debug)]
pub struct Fault {
    status: StatusCode,
    message: String,
}

impl Fault {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// 400 — the client sent something unparseable.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 429 — the client exhausted its admission window.
    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "too many requests, please try again later",
        )
    }

    /// 500 — anything without a more precise mapping.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

// ── Error handler ─────────────────────────────────────────────────────────────

/// Sent instead of a server-error message when running in production.
const REDACTED: &str = "Something went wrong!";

/// Emitted if the error envelope itself fails to serialize.
const FALLBACK_BODY: &[u8] =
    br#"{"error":"Internal Server Error","message":"Something went wrong!"}"#;

/// Terminal stage: maps a [`Fault`] to its JSON envelope.
///
/// In production, server-error (5xx) messages are replaced with a fixed
/// sentinel and the original text goes only to the log sink. Client-error
/// messages are fixed strings safe to show a client, so they pass through in
/// both modes. This stage never fails: if the envelope cannot be serialized,
/// a canned body is sent instead.
pub(crate) struct ErrorHandler {
    environment: Environment,
}

impl ErrorHandler {
    pub(crate) fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub(crate) fn handle(&self, fault: Fault) -> Response {
        let status = fault.status();

        // The unredacted message always reaches the log sink.
        if status.is_server_error() {
            error!(status = status.as_u16(), message = fault.message(), "request faulted");
        } else {
            debug!(status = status.as_u16(), message = fault.message(), "request rejected");
        }

        let message = if status.is_server_error() && self.environment.is_production() {
            REDACTED
        } else {
            fault.message()
        };
        let reason = status.canonical_reason().unwrap_or("Error");

        let body = match serde_json::to_vec(&json!({ "error": reason, "message": message })) {
            Ok(bytes) => bytes,
            Err(_) => FALLBACK_BODY.to_vec(),
        };
        Response::builder().status(status).json(body)
    }
}
