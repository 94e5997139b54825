//! Exact method + path dispatcher.
//!
//! One radix tree per HTTP method via [`matchit`]. This service registers
//! only literal paths — no pattern segments — so a lookup either returns the
//! one handler registered for `(method, path)` or reports no match, which
//! the pipeline turns into the not-found envelope.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};

/// The application route table.
///
/// Build it once at startup; registration panics on a duplicate or invalid
/// path because a broken table is a programming error, not a runtime
/// condition. Each registration returns `self` so calls chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for `GET path`.
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    /// Register a handler for an arbitrary method + path pair.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Option<BoxedHandler> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        Some(Arc::clone(matched.value))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::response::Response;

    async fn ok(_req: Request) -> Response {
        Response::status(http::StatusCode::OK)
    }

    #[test]
    fn lookup_is_exact() {
        let router = Router::new().get("/health", ok);
        assert!(router.lookup(&Method::GET, "/health").is_some());
        assert!(router.lookup(&Method::GET, "/health/").is_none());
        assert!(router.lookup(&Method::GET, "/healthz").is_none());
        assert!(router.lookup(&Method::POST, "/health").is_none());
    }
}
