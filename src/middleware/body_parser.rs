//! JSON request-body decoding.
//!
//! Runs before admission so a malformed body is answered with a 400 fault
//! and never reaches the dispatcher. Requests whose content type does not
//! declare JSON pass through untouched, parsed value absent.

use tracing::debug;

use crate::error::Fault;
use crate::middleware::{Flow, Stage};
use crate::request::Request;

pub struct BodyParser;

impl BodyParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BodyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for BodyParser {
    fn apply(&self, ctx: &mut Request) -> Result<Flow, Fault> {
        let declares_json = ctx.header("content-type").is_some_and(is_json);
        if !declares_json || ctx.body().is_empty() {
            return Ok(Flow::Continue);
        }

        match serde_json::from_slice(ctx.body()) {
            Ok(value) => {
                ctx.set_json(value);
                Ok(Flow::Continue)
            }
            Err(error) => {
                debug!(%error, "rejecting malformed request body");
                Err(Fault::bad_request("invalid body"))
            }
        }
    }
}

/// Matches the media-type essence, ignoring parameters like `charset`.
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}
