use axum::{
    extract::Query,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::debug;

pub const FORWARD_FIXTURE: &str = include_str!("../../fixtures/forward_geolocation.json");
pub const REVERSE_FIXTURE: &str = include_str!("../../fixtures/reverse_geolocation.json");

#[derive(Debug, Deserialize)]
pub struct GeocodeParams {
    pub access_key: Option<String>,
    pub query: Option<String>,
    pub country_module: Option<String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/v1/forward", get(forward))
        .route("/v1/reverse", get(reverse))
        .route("/v1/echo", post(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn forward(Query(params): Query<GeocodeParams>) -> Response {
    debug!(?params, "forward geocode");
    if let Err(rejection) = check_params(&params) {
        return rejection;
    }
    fixture(FORWARD_FIXTURE)
}

async fn reverse(Query(params): Query<GeocodeParams>) -> Response {
    debug!(?params, "reverse geocode");
    if let Err(rejection) = check_params(&params) {
        return rejection;
    }
    let query = params.query.as_deref().unwrap_or_default();
    if !is_coordinate_pair(query) {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_query",
            "Reverse geocoding requires a `lat,lon` query.",
        );
    }
    fixture(REVERSE_FIXTURE)
}

/// Reflect the method, lower-cased headers and JSON body back to the caller.
async fn echo(method: Method, headers: HeaderMap, body: String) -> Response {
    let body: Value = match serde_json::from_str(&body) {
        Ok(body) => body,
        Err(e) => {
            return api_error(StatusCode::BAD_REQUEST, "invalid_body", &e.to_string());
        }
    };
    let headers: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": body,
    }))
    .into_response()
}

fn check_params(params: &GeocodeParams) -> Result<(), Response> {
    if params.access_key.as_deref().unwrap_or_default().is_empty() {
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "missing_access_key",
            "You have not supplied an API Access Key.",
        ));
    }
    if params.query.as_deref().unwrap_or_default().trim().is_empty() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            "The query parameter is required.",
        ));
    }
    Ok(())
}

fn is_coordinate_pair(query: &str) -> bool {
    let mut parts = query.split(',').map(str::trim);
    let valid = |part: Option<&str>| part.is_some_and(|p| p.parse::<f64>().is_ok_and(f64::is_finite));
    valid(parts.next()) && valid(parts.next()) && parts.next().is_none()
}

fn fixture(body: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

fn api_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}
