//! Endpoint descriptors and their conversion into `HttpRequest` values.
//!
//! # Design
//! An `Endpoint` describes one HTTP call and nothing else: it carries no
//! client state and is consumed once by the dispatcher. Conversion is pure,
//! so every property of the produced request can be checked without I/O.
//!
//! Header assembly depends on whether a body is present. With a body, the
//! request starts from `Accept: application/json` and `Cache-Control: no-cache`
//! and the descriptor headers and authorization are merged on top, replacing
//! same-named entries. Without a body no default headers are injected.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::http::{Authorization, HeaderKey, HttpMethod, HttpRequest, HttpScheme};

/// JSON object payload of a request. Keys serialize in sorted order.
pub type JsonBody = serde_json::Map<String, Value>;

/// Immutable description of one HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub scheme: HttpScheme,
    /// Host name, optionally with `:port`.
    pub host: String,
    /// Absolute path, empty or starting with `/`.
    pub path: String,
    pub method: HttpMethod,
    /// Query pairs, appended to the URL in this order.
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<HeaderKey, String>,
    pub authorization: Option<Authorization>,
    pub body: Option<JsonBody>,
    /// Name of a canned response file served instead of the network.
    pub fixture: Option<String>,
}

impl Endpoint {
    pub fn new(scheme: HttpScheme, host: &str, path: &str, method: HttpMethod) -> Self {
        Self {
            scheme,
            host: host.to_string(),
            path: path.to_string(),
            method,
            query: Vec::new(),
            headers: BTreeMap::new(),
            authorization: None,
            body: None,
            fixture: None,
        }
    }

    pub fn get(scheme: HttpScheme, host: &str, path: &str) -> Self {
        Self::new(scheme, host, path, HttpMethod::Get)
    }

    pub fn post(scheme: HttpScheme, host: &str, path: &str) -> Self {
        Self::new(scheme, host, path, HttpMethod::Post)
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_header(mut self, key: HeaderKey, value: &str) -> Self {
        self.headers.insert(key, value.to_string());
        self
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = Some(authorization);
        self
    }

    pub fn with_body(mut self, body: JsonBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Use a serializable value as the body. It must serialize to a JSON object.
    pub fn with_json_body<T: Serialize>(self, payload: &T) -> Result<Self, ApiError> {
        match serde_json::to_value(payload).map_err(ApiError::Serialization)? {
            Value::Object(map) => Ok(self.with_body(map)),
            other => Err(ApiError::Serialization(serde::ser::Error::custom(
                format!("body must be a JSON object, got {other}"),
            ))),
        }
    }

    pub fn with_fixture(mut self, name: &str) -> Self {
        self.fixture = Some(name.to_string());
        self
    }

    /// Compose the absolute URL from scheme, host, path and query pairs.
    pub fn url(&self) -> Result<Url, ApiError> {
        let base = format!("{}://{}", self.scheme, self.host);
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: format!("{base}{}", self.path),
            reason,
        };

        if self.host.is_empty() {
            return Err(invalid("host is empty".to_string()));
        }
        if self
            .host
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '@') || c.is_whitespace())
        {
            return Err(invalid("host contains reserved characters".to_string()));
        }
        if !self.path.is_empty() && !self.path.starts_with('/') {
            return Err(invalid("path must start with '/'".to_string()));
        }

        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.set_path(&self.path);
        // A query component is only written when there is something to put in it.
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Build the transport-level request for this endpoint.
    pub fn to_request(&self) -> Result<HttpRequest, ApiError> {
        let url = self.url()?;
        let mut headers = Vec::new();

        let body = match &self.body {
            Some(body) => {
                let encoded = serde_json::to_string(body).map_err(ApiError::Serialization)?;
                set_header(&mut headers, HeaderKey::Accept.as_str(), "application/json");
                set_header(&mut headers, HeaderKey::CacheControl.as_str(), "no-cache");
                Some(encoded)
            }
            None => None,
        };

        for (key, value) in &self.headers {
            set_header(&mut headers, key.as_str(), value);
        }
        if let Some(authorization) = &self.authorization {
            set_header(
                &mut headers,
                HeaderKey::Authorization.as_str(),
                &authorization.header_value(),
            );
        }

        Ok(HttpRequest {
            method: self.method,
            url: url.into(),
            headers,
            body,
        })
    }
}

/// Insert a header, replacing the value of an existing same-named entry.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}
