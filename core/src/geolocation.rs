//! Geocoding API shapes and the endpoints that fetch them.
//!
//! # Design
//! The response types are defined independently from the mock server, which
//! serves raw JSON fixtures; integration tests catch any drift between the two.
//! Wire keys are snake_case like the Rust fields; the one key that is not a
//! valid field name (`type`) is renamed explicitly. Unknown fields are ignored
//! and optional fields map to `None`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::GeolocationConfig;
use crate::endpoint::Endpoint;

/// Top-level geocoding response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationResponse {
    pub data: Vec<Place>,
}

/// One geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub number: Option<String>,
    pub postal_code: Option<String>,
    pub street: Option<String>,
    pub confidence: f64,
    pub region: String,
    pub region_code: String,
    pub county: Option<String>,
    pub locality: Option<String>,
    pub administrative_area: Option<String>,
    pub neighbourhood: Option<String>,
    pub country: String,
    pub country_code: String,
    pub continent: String,
    pub label: String,
    pub country_module: CountryModule,
}

/// Country details attached when `country_module=1` is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryModule {
    pub latitude: f64,
    pub longitude: f64,
    pub common_name: String,
    pub official_name: String,
    pub capital: String,
    pub flag: String,
    pub area: i64,
    pub landlocked: bool,
    pub independent: bool,
    pub global: Global,
    pub dial: Dial,
    pub currencies: Vec<Currency>,
    /// Language code to language name.
    pub languages: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub code: String,
    pub name: String,
    pub numeric: i64,
    pub minor_unit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dial {
    pub calling_code: String,
    pub national_prefix: Option<String>,
    pub international_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Global {
    pub alpha2: String,
    pub alpha3: String,
    pub numeric_code: String,
    pub region: String,
    pub subregion: String,
    pub region_code: String,
    pub subregion_code: String,
    pub world_region: String,
    pub continent_name: String,
    pub continent_code: String,
}

/// A forward (address to coordinates) or reverse (coordinates to address) lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeolocationQuery {
    Forward { address: String },
    Reverse { latitude: String, longitude: String },
}

impl GeolocationQuery {
    pub fn reverse(latitude: f64, longitude: f64) -> Self {
        GeolocationQuery::Reverse {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            GeolocationQuery::Forward { .. } => "/v1/forward",
            GeolocationQuery::Reverse { .. } => "/v1/reverse",
        }
    }

    /// Fixture served in offline mode.
    pub fn fixture_name(&self) -> &'static str {
        match self {
            GeolocationQuery::Forward { .. } => "forward_geolocation",
            GeolocationQuery::Reverse { .. } => "reverse_geolocation",
        }
    }

    fn query_value(&self) -> String {
        match self {
            GeolocationQuery::Forward { address } => address.clone(),
            GeolocationQuery::Reverse {
                latitude,
                longitude,
            } => format!("{latitude},{longitude}"),
        }
    }

    /// Describe this lookup as a GET endpoint.
    pub fn endpoint(&self, config: &GeolocationConfig) -> Endpoint {
        let endpoint = Endpoint::get(config.scheme, &config.host, self.path())
            .with_query("access_key", &config.access_key)
            .with_query("query", &self.query_value())
            .with_query("country_module", "1");
        if config.offline {
            endpoint.with_fixture(self.fixture_name())
        } else {
            endpoint
        }
    }
}

/// Display summary of one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    pub country_name: String,
    pub country_flag: String,
    pub address: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
}

impl LocationInfo {
    /// Summarise `place` for a lookup made from the given coordinates.
    pub fn from_place(place: &Place, latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            country_name: place.country_module.common_name.clone(),
            country_flag: place.country_module.flag.clone(),
            address: format_address(place),
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
            altitude: altitude.to_string(),
        }
    }
}

/// `street, postal_code, locality (region)`, skipping missing parts.
///
/// The separator is written even when the street is missing, so an address
/// without a street starts with `", "`.
pub fn format_address(place: &Place) -> String {
    let mut address = String::new();
    if let Some(street) = &place.street {
        address.push_str(street);
    }
    if let Some(postal_code) = &place.postal_code {
        address.push_str(", ");
        address.push_str(postal_code);
    }
    if let Some(locality) = &place.locality {
        address.push_str(", ");
        address.push_str(locality);
    }
    address.push_str(&format!(" ({})", place.region));
    address
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, HttpScheme};

    const REVERSE: &str = include_str!("../../fixtures/reverse_geolocation.json");
    const FORWARD: &str = include_str!("../../fixtures/forward_geolocation.json");

    fn config() -> GeolocationConfig {
        GeolocationConfig {
            scheme: HttpScheme::Http,
            host: "api.positionstack.com".to_string(),
            access_key: "test-key".to_string(),
            offline: false,
        }
    }

    #[test]
    fn reverse_fixture_decodes_four_places_with_flags() {
        let response: GeolocationResponse = serde_json::from_str(REVERSE).unwrap();
        assert_eq!(response.data.len(), 4);
        for place in &response.data {
            assert!(!place.country_module.flag.is_empty());
        }
        assert_eq!(response.data[0].country_module.flag, "🇪🇸");
    }

    #[test]
    fn forward_fixture_decodes_snake_case_fields() {
        let response: GeolocationResponse = serde_json::from_str(FORWARD).unwrap();
        assert_eq!(response.data.len(), 4);
        let first = &response.data[0];
        assert_eq!(first.country_code, "ESP");
        assert_eq!(first.region_code, "GA");
        assert_eq!(first.country_module.common_name, "Spain");
        assert_eq!(first.country_module.dial.calling_code, "34");
        assert_eq!(first.country_module.global.world_region, "EMEA");
        assert_eq!(first.country_module.currencies[0].minor_unit, 2);
        assert_eq!(first.country_module.languages.get("spa").map(String::as_str), Some("Spanish"));
    }

    #[test]
    fn missing_optional_fields_are_none() {
        let response: GeolocationResponse = serde_json::from_str(REVERSE).unwrap();
        assert!(response.data.iter().any(|place| place.street.is_none()));
        assert!(response
            .data
            .iter()
            .all(|place| place.country_module.dial.national_prefix.is_none()));
    }

    #[test]
    fn reverse_endpoint_carries_query_in_order() {
        let endpoint = GeolocationQuery::reverse(42.161434, -8.619662).endpoint(&config());
        assert_eq!(endpoint.method, HttpMethod::Get);
        assert_eq!(endpoint.path, "/v1/reverse");
        assert_eq!(
            endpoint.query,
            vec![
                ("access_key".to_string(), "test-key".to_string()),
                ("query".to_string(), "42.161434,-8.619662".to_string()),
                ("country_module".to_string(), "1".to_string()),
            ]
        );
        assert!(endpoint.fixture.is_none());

        let req = endpoint.to_request().unwrap();
        assert_eq!(
            req.url,
            "http://api.positionstack.com/v1/reverse?access_key=test-key&query=42.161434%2C-8.619662&country_module=1"
        );
        assert!(req.headers.is_empty());
    }

    #[test]
    fn offline_config_names_a_fixture() {
        let config = GeolocationConfig {
            offline: true,
            ..config()
        };
        let forward = GeolocationQuery::Forward {
            address: "Porriño".to_string(),
        };
        assert_eq!(
            forward.endpoint(&config).fixture.as_deref(),
            Some("forward_geolocation")
        );
        assert_eq!(
            GeolocationQuery::reverse(1.0, 2.0).endpoint(&config).fixture.as_deref(),
            Some("reverse_geolocation")
        );
    }

    #[test]
    fn address_joins_present_parts() {
        let response: GeolocationResponse = serde_json::from_str(REVERSE).unwrap();
        let mut place = response.data[0].clone();
        place.street = Some("Rúa Ramón González".to_string());
        place.postal_code = Some("36400".to_string());
        place.locality = Some("O Porriño".to_string());
        place.region = "Pontevedra".to_string();
        assert_eq!(format_address(&place), "Rúa Ramón González, 36400, O Porriño (Pontevedra)");

        place.street = None;
        place.postal_code = None;
        assert_eq!(format_address(&place), ", O Porriño (Pontevedra)");
    }

    #[test]
    fn location_info_uses_country_module() {
        let response: GeolocationResponse = serde_json::from_str(REVERSE).unwrap();
        let info = LocationInfo::from_place(&response.data[0], 42.161434, -8.619662, 35.5);
        assert_eq!(info.country_name, "Spain");
        assert_eq!(info.country_flag, "🇪🇸");
        assert_eq!(info.latitude, "42.161434");
        assert_eq!(info.longitude, "-8.619662");
        assert_eq!(info.altitude, "35.5");
    }
}
