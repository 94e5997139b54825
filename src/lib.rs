//! # canary
//!
//! A deliberately small JSON service for exercising CI/CD pipelines. It has
//! no business logic and no state worth keeping — the interesting part is
//! the request pipeline every route sits behind:
//!
//! - JSON body decoding (malformed bodies answered with a 400 envelope)
//! - fixed-window rate limiting per client address (429 past the budget)
//! - exact-match routing with a structured 404 for everything else
//! - a terminal error handler that redacts internals in production
//! - hardening headers and one structured log record on every response
//! - graceful shutdown that drains in-flight requests on SIGTERM
//!
//! Every fault becomes a JSON envelope; a client never sees a connection
//! reset or a raw stack trace.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use canary::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env();
//!     let addr = format!("0.0.0.0:{}", config.port);
//!     Server::bind(&addr).serve(canary::app(&config)).await.unwrap();
//! }
//! ```

mod config;
mod error;
mod handler;
mod handlers;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use config::{Config, Environment};
pub use error::{Error, Fault};
pub use handler::Handler;
pub use middleware::Pipeline;
pub use request::Request;
pub use response::{IntoResponse, Json, Response};
pub use router::Router;
pub use server::Server;

use std::time::Instant;

use middleware::{BodyParser, RateLimiter, WindowStore};

/// Assembles the full pipeline for one service instance.
///
/// Stage order matters and is part of the service contract: bodies are
/// decoded before admission so a malformed body never spends rate-limit
/// budget on dispatch, and a rejected client never reaches a handler.
pub fn app(config: &Config) -> Pipeline {
    let started = Instant::now();

    Pipeline::new(config.environment)
        .stage(BodyParser::new())
        .stage(RateLimiter::new(config.rate_limit.clone(), WindowStore::new()))
        .routes(handlers::routes(config.environment, started))
}
