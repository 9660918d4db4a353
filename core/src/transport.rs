//! The seam between the dispatcher and the network.
//!
//! `ApiClient` never talks to a socket directly. It hands a fully built
//! `HttpRequest` to a `Transport` and receives an `HttpResponse` back. Status
//! interpretation stays with the dispatcher, so a transport only fails when no
//! response was received at all.

use ureq::http::Response;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and returns the raw response.
///
/// Implementations are blocking; `ApiClient` runs them on tokio's blocking
/// pool.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq::Agent`.
///
/// The agent is built with `http_status_as_error(false)` so 4xx/5xx responses
/// come back as data rather than `Err`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let headers = &request.headers;
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => without_body(with_headers(self.agent.get(url), headers), body),
            HttpMethod::Delete => without_body(with_headers(self.agent.delete(url), headers), body),
            HttpMethod::Head => without_body(with_headers(self.agent.head(url), headers), body),
            HttpMethod::Options => {
                without_body(with_headers(self.agent.options(url), headers), body)
            }
            HttpMethod::Post => with_body(with_headers(self.agent.post(url), headers), body),
            HttpMethod::Put => with_body(with_headers(self.agent.put(url), headers), body),
            HttpMethod::Patch => with_body(with_headers(self.agent.patch(url), headers), body),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(format!("reading response body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn without_body(
    builder: RequestBuilder<WithoutBody>,
    body: Option<&str>,
) -> Result<Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(body.as_bytes()),
        None => builder.call(),
    }
}

fn with_body(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> Result<Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
