//! The request pipeline.
//!
//! Every inbound request passes through the same fixed sequence, driven by
//! [`Pipeline::handle`] — an explicit loop over an ordered stage list, not a
//! nest of callbacks:
//!
//! 1. admission stages in registration order (body parser, then rate
//!    limiter), each returning [`Flow::Continue`], [`Flow::Halt`] with a
//!    terminal response, or a [`Fault`];
//! 2. the router: a match runs its handler, no match produces the
//!    not-found envelope;
//! 3. security headers are attached to whatever response came out of 1–2;
//! 4. one structured log record is written for the request.
//!
//! A `Fault` from any stage short-circuits straight to the error handler —
//! the dispatcher never sees the request. Exactly one response leaves the
//! pipeline per request, on every path.

pub mod body_parser;
pub mod rate_limit;
pub mod security;
mod trace;

use std::time::Instant;

pub use body_parser::BodyParser;
pub use rate_limit::{Admission, RateLimitConfig, RateLimiter, WindowStore};
pub use security::SecurityHeaders;

use crate::config::Environment;
use crate::error::{ErrorHandler, Fault};
use crate::handlers;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// What an admission stage tells the driver.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next stage.
    Continue,
    /// Stop here; this response is terminal.
    Halt(Response),
}

/// An admission stage: runs before dispatch, may mutate the request context,
/// and either lets the request proceed, answers it, or faults it.
pub trait Stage: Send + Sync + 'static {
    fn apply(&self, ctx: &mut Request) -> Result<Flow, Fault>;
}

/// The assembled pipeline. Build one per service instance and share it
/// across connections; all stages are immutable after construction except
/// the rate limiter's interior counter store.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    router: Router,
    security: SecurityHeaders,
    errors: ErrorHandler,
}

impl Pipeline {
    pub fn new(environment: Environment) -> Self {
        Self {
            stages: Vec::new(),
            router: Router::new(),
            security: SecurityHeaders::new(),
            errors: ErrorHandler::new(environment),
        }
    }

    /// Append an admission stage. Stages run in the order they are added.
    pub fn stage(mut self, stage: impl Stage) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Install the route table.
    pub fn routes(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Runs one request through the whole pipeline.
    pub async fn handle(&self, ctx: Request) -> Response {
        let started = Instant::now();
        let method = ctx.method().clone();
        let path = ctx.path().to_owned();

        let mut response = self.drive(ctx).await;
        self.security.apply(&mut response);
        trace::record(&method, &path, response.status_code(), started.elapsed());
        response
    }

    /// Renders a fault that arose before a request context existed, e.g. an
    /// unreadable body. Headers and the request log record still apply, so
    /// every answered request leaves exactly one log line.
    pub(crate) fn fail(
        &self,
        fault: Fault,
        method: &http::Method,
        path: &str,
        started: Instant,
    ) -> Response {
        let mut response = self.errors.handle(fault);
        self.security.apply(&mut response);
        trace::record(method, path, response.status_code(), started.elapsed());
        response
    }

    async fn drive(&self, mut ctx: Request) -> Response {
        for stage in &self.stages {
            match stage.apply(&mut ctx) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt(response)) => return response,
                Err(fault) => return self.errors.handle(fault),
            }
        }

        match self.router.lookup(ctx.method(), ctx.path()) {
            Some(handler) => handler.call(ctx).await,
            None => handlers::not_found(ctx.method(), ctx.path()),
        }
    }
}
