//! Environment-driven configuration for the dispatcher and the geocoding API.

use std::env;
use std::path::PathBuf;

use crate::http::HttpScheme;

pub const DEFAULT_FIXTURE_DIR: &str = "fixtures";
pub const DEFAULT_GEOCODING_HOST: &str = "api.positionstack.com";

/// Settings for `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Directory fixture names are resolved against.
    pub fixture_dir: PathBuf,
}

impl ClientConfig {
    /// Read `CORENET_FIXTURE_DIR`, falling back to `fixtures`.
    pub fn from_env() -> Self {
        let fixture_dir = env::var("CORENET_FIXTURE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FIXTURE_DIR));
        Self { fixture_dir }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fixture_dir: PathBuf::from(DEFAULT_FIXTURE_DIR),
        }
    }
}

/// Where and how geolocation lookups are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeolocationConfig {
    pub scheme: HttpScheme,
    /// Host name, optionally with `:port`.
    pub host: String,
    pub access_key: String,
    /// Serve lookups from fixtures instead of the network.
    pub offline: bool,
}

impl GeolocationConfig {
    /// Read `POSITIONSTACK_SCHEME`, `POSITIONSTACK_HOST`,
    /// `POSITIONSTACK_ACCESS_KEY` and `CORENET_OFFLINE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let scheme = match env::var("POSITIONSTACK_SCHEME").as_deref() {
            Ok("https") => HttpScheme::Https,
            Ok("http") => HttpScheme::Http,
            _ => defaults.scheme,
        };
        Self {
            scheme,
            host: env::var("POSITIONSTACK_HOST").unwrap_or(defaults.host),
            access_key: env::var("POSITIONSTACK_ACCESS_KEY").unwrap_or(defaults.access_key),
            offline: env::var("CORENET_OFFLINE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.offline),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            scheme: HttpScheme::Http,
            host: DEFAULT_GEOCODING_HOST.to_string(),
            access_key: String::new(),
            offline: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
