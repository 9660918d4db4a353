//! HTTP wire vocabulary shared by descriptors, the dispatcher and transports.
//!
//! # Design
//! Requests and responses are plain data. `Endpoint::to_request` produces an
//! `HttpRequest`, a `Transport` turns it into an `HttpResponse`, and the
//! dispatcher decodes that response. Scheme, method, header key and
//! authorization are closed sum types with one rendering function each.

use std::fmt;

/// URL scheme of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpScheme {
    Http,
    Https,
}

impl HttpScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpScheme::Http => "http",
            HttpScheme::Https => "https",
        }
    }
}

impl fmt::Display for HttpScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether a payload is meaningful for this method.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header names an endpoint can set.
///
/// The well-known keys render to their canonical wire spelling. `Custom`
/// is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderKey {
    Accept,
    CacheControl,
    Authorization,
    ContentType,
    Custom(String),
}

impl HeaderKey {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderKey::Accept => "Accept",
            HeaderKey::CacheControl => "Cache-Control",
            HeaderKey::Authorization => "Authorization",
            HeaderKey::ContentType => "Content-Type",
            HeaderKey::Custom(name) => name,
        }
    }
}

impl fmt::Display for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials attached to an endpoint as an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// A bearer token. The header value is the token itself.
    Bearer(String),
    /// Any other scheme, rendered as `"<scheme> <credentials>"`.
    Scheme { scheme: String, credentials: String },
}

impl Authorization {
    pub fn header_value(&self) -> String {
        match self {
            Authorization::Bearer(token) => token.clone(),
            Authorization::Scheme {
                scheme,
                credentials,
            } => format!("{scheme} {credentials}"),
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Endpoint::to_request`. A `Transport` is responsible for
/// executing it and returning the corresponding `HttpResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value, ignoring the case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
