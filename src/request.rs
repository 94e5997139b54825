//! Per-request context.

use std::net::IpAddr;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde_json::Value;

/// Everything the pipeline knows about one in-flight request.
///
/// Built once per inbound request and destroyed when the response is sent.
/// Every field is fixed at construction except the parsed JSON body, which
/// the body-parser stage populates at most once.
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    client: IpAddr,
    json: Option<Value>,
}

impl Request {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        body: Bytes,
        client: IpAddr,
    ) -> Self {
        Self { method, path: path.into(), headers, body, client, json: None }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes, client: IpAddr) -> Self {
        Self::new(parts.method, parts.uri.path(), parts.headers, body, client)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The identity rate-limit counters are keyed by.
    pub fn client(&self) -> IpAddr {
        self.client
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The decoded JSON body, if the request carried one.
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub(crate) fn set_json(&mut self, value: Value) {
        self.json = Some(value);
    }
}
