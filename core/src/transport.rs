//! Executes `HttpRequest` values against a real backend.
//!
//! # Design
//! `Transport` is the only place I/O happens. Implementations make exactly
//! one attempt per call and must hand back 4xx/5xx responses as data; only a
//! failure to obtain any response is an `Err`. Status interpretation stays
//! with `CatalogClient`.

use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Largest response body read into memory.
pub const BODY_LIMIT: u64 = 64 * 1024 * 1024;

/// Performs a single HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// ureq's status-code-as-error behavior is disabled so error statuses reach
/// the client as responses. No timeout is configured beyond ureq's defaults.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = request.method.as_str(), url = %request.path, "sending request");

        let headers = &request.headers;
        let body = request.body.as_deref();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(&request.path), headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&request.path), headers).call(),
            HttpMethod::Post => send(with_headers(self.agent.post(&request.path), headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(&request.path), headers), body),
            HttpMethod::Patch => send(with_headers(self.agent.patch(&request.path), headers), body),
        };
        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = match response.body_mut().with_config().limit(BODY_LIMIT).read_to_vec() {
            Ok(bytes) => decode_body(bytes),
            // The status alone decides a non-2xx outcome.
            Err(err) if !status.is_success() => {
                debug!(%err, url = %request.path, "discarding unreadable error body");
                String::new()
            }
            Err(err) => return Err(TransportError(err.to_string())),
        };

        debug!(status = status.as_u16(), url = %request.path, "received response");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers: response_headers,
            body,
        })
    }
}

/// Bytes that are not UTF-8 become replacement characters, which the JSON
/// parser then rejects as an ordinary parse failure.
fn decode_body(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
