//! Error types for request building, dispatch and location updates.
//!
//! # Design
//! Every failure the dispatcher can hit has its own `ApiError` variant so
//! callers can tell a malformed descriptor from a network problem, a non-2xx
//! status or a body that does not match the expected shape. Fixture failures
//! keep the offending path for debugging.

use std::io;
use std::path::PathBuf;

/// Errors returned by `Endpoint::to_request` and `ApiClient::send`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Scheme, host and path do not compose into a valid absolute URL.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A typed payload could not be turned into a JSON object body.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The transport failed before a response was received.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("fixture {} could not be read: {source}", path.display())]
    FixtureNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fixture {} could not be decoded: {source}", path.display())]
    FixtureDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// The HTTP status for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures surfaced on a location update sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// The source produced an update without a position fix.
    #[error("location not found")]
    LocationNotFound,

    /// The position source failed; the sequence ends after this error.
    #[error("location updates could not start: {0}")]
    UpdatesCouldNotStart(String),
}

/// Text could not be parsed as `lat,lon[,alt]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid position {input:?}: {reason}")]
pub struct ParsePositionError {
    pub input: String,
    pub reason: String,
}
