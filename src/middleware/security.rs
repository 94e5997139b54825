//! Hardening response headers.
//!
//! Applied to every response the service sends — successes, 404s, faults,
//! and rate-limit rejections alike. Insertion replaces any existing value,
//! so applying the stage twice yields the same header map.

use http::header::{HeaderName, HeaderValue};

use crate::response::Response;

const HARDENING: &[(&str, &str)] = &[
    ("content-security-policy", "default-src 'self'"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "0"),
];

/// Decorates outgoing responses with the fixed hardening set. Never rejects
/// a request and never inspects one.
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn new() -> Self {
        let headers = HARDENING
            .iter()
            .map(|&(name, value)| {
                (HeaderName::from_static(name), HeaderValue::from_static(value))
            })
            .collect();
        Self { headers }
    }

    pub fn apply(&self, response: &mut Response) {
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new()
    }
}
