//! Declarative HTTP endpoints, a generic JSON dispatcher and geolocation lookup.
//!
//! # Overview
//! An `Endpoint` describes one HTTP call as an immutable value. It converts
//! into a plain-data `HttpRequest` without touching the network, which keeps
//! request construction deterministic and easy to test. `ApiClient` sends the
//! request through a `Transport` (or serves a named fixture instead) and
//! decodes the JSON response into the caller's type.
//!
//! # Design
//! - `Endpoint::to_request` is pure; `InvalidUrl` is its only failure for
//!   well-formed bodies.
//! - `ApiClient` is stateless apart from its transport and fixture directory.
//!   One call is one request: no retry, caching or batching.
//! - `Transport` is the I/O boundary. `UreqTransport` is the default.
//! - `location` and `tracker` feed device positions into reverse lookups.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod geolocation;
pub mod http;
pub mod location;
pub mod tracker;
pub mod transport;

pub use client::{parse_response, ApiClient};
pub use config::{ClientConfig, GeolocationConfig};
pub use endpoint::{Endpoint, JsonBody};
pub use error::{ApiError, LocationError, ParsePositionError};
pub use geolocation::{GeolocationQuery, GeolocationResponse, LocationInfo, Place};
pub use http::{Authorization, HeaderKey, HttpMethod, HttpRequest, HttpResponse, HttpScheme};
pub use location::{LocationManager, LocationUpdates, Position, RawFix};
pub use tracker::GeolocationTracker;
pub use transport::{Transport, UreqTransport};
