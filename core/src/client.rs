//! Generic dispatcher: descriptor in, typed value out.
//!
//! # Design
//! `ApiClient` holds a transport and a fixture directory and carries no
//! mutable state between calls, so concurrent `send` calls never interfere.
//! Each call builds its own request, then either reads a named fixture or
//! performs exactly one round-trip through the transport. There is no retry,
//! caching or batching; timeouts and pooling are whatever the transport does.
//!
//! Response interpretation lives in `parse_response`, which is pure and can be
//! fed hand-written `HttpResponse` values.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::transport::{Transport, UreqTransport};

/// Asynchronous dispatcher for `Endpoint` descriptors.
#[derive(Debug)]
pub struct ApiClient<T = UreqTransport> {
    transport: Arc<T>,
    fixture_dir: PathBuf,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            fixture_dir: self.fixture_dir.clone(),
        }
    }
}

impl ApiClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(UreqTransport::new(), config)
    }
}

impl Default for ApiClient<UreqTransport> {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl<T: Transport + 'static> ApiClient<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            fixture_dir: config.fixture_dir,
        }
    }

    pub fn fixture_dir(&self) -> &Path {
        &self.fixture_dir
    }

    /// Send `endpoint` and decode the JSON response into `R`.
    ///
    /// When the endpoint names a fixture, the fixture file is decoded instead
    /// and the transport is not touched.
    pub async fn send<R: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<R, ApiError> {
        let request = endpoint.to_request()?;

        if let Some(name) = &endpoint.fixture {
            return self.load_fixture(name).await;
        }

        debug!(method = %request.method, url = %request.url, "sending request");
        let transport = Arc::clone(&self.transport);
        let response = tokio::task::spawn_blocking(move || transport.execute(&request))
            .await
            .map_err(|e| ApiError::Transport(format!("transport task failed: {e}")))??;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        parse_response(response)
    }

    /// Resolve a fixture name to a file path. Names without an extension get `.json`.
    pub fn fixture_path(&self, name: &str) -> PathBuf {
        let path = self.fixture_dir.join(name);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension("json")
        }
    }

    async fn load_fixture<R: DeserializeOwned>(&self, name: &str) -> Result<R, ApiError> {
        let path = self.fixture_path(name);
        debug!(path = %path.display(), "loading fixture");
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(source) => return Err(ApiError::FixtureNotFound { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| ApiError::FixtureDecode { path, source })
    }
}

/// Map a non-2xx status to `HttpStatus`, otherwise decode the body into `R`.
pub fn parse_response<R: DeserializeOwned>(response: HttpResponse) -> Result<R, ApiError> {
    if !response.is_success() {
        return Err(ApiError::HttpStatus {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(ApiError::Decode)
}
