//! Live dispatch against the mock server.
//!
//! Starts the mock server on a random port, then sends descriptors through
//! `ApiClient` over real HTTP using `UreqTransport`. Validates that request
//! building, the transport and response decoding work end-to-end.

use std::net::SocketAddr;

use corenet_core::{
    ApiClient, ApiError, Authorization, ClientConfig, Endpoint, GeolocationConfig,
    GeolocationQuery, GeolocationResponse, HeaderKey, HttpScheme, JsonBody,
};
use serde_json::{json, Value};

/// Start the mock server on its own runtime and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn geolocation_config(addr: SocketAddr, access_key: &str) -> GeolocationConfig {
    GeolocationConfig {
        scheme: HttpScheme::Http,
        host: addr.to_string(),
        access_key: access_key.to_string(),
        offline: false,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn geolocation_lookups() {
    let addr = start_server();
    let client = ApiClient::new(ClientConfig::default());
    let config = geolocation_config(addr, "integration-key");

    // Step 1: forward lookup.
    let endpoint = GeolocationQuery::Forward {
        address: "Porriño".to_string(),
    }
    .endpoint(&config);
    let forward: GeolocationResponse = client.send(&endpoint).await.unwrap();
    assert_eq!(forward.data.len(), 4);
    assert_eq!(forward.data[0].country_module.flag, "🇪🇸");

    // Step 2: reverse lookup.
    let endpoint = GeolocationQuery::reverse(42.161434, -8.619662).endpoint(&config);
    let reverse: GeolocationResponse = client.send(&endpoint).await.unwrap();
    assert_eq!(reverse.data.len(), 4);
    assert!(reverse.data.iter().all(|place| !place.country_module.flag.is_empty()));

    // Step 3: missing access key is a status failure carrying the body.
    let endpoint = GeolocationQuery::reverse(42.161434, -8.619662).endpoint(&geolocation_config(addr, ""));
    let err = client.send::<GeolocationResponse>(&endpoint).await.unwrap_err();
    match err {
        ApiError::HttpStatus { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("missing_access_key"));
        }
        other => panic!("expected HttpStatus, got {other}"),
    }

    // Step 4: a 2xx body of the wrong shape is a decode failure.
    let endpoint = Endpoint::post(HttpScheme::Http, &addr.to_string(), "/v1/echo").with_body(JsonBody::new());
    let err = client.send::<GeolocationResponse>(&endpoint).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn post_body_and_headers_reach_the_server() {
    let addr = start_server();
    let client = ApiClient::new(ClientConfig::default());

    let mut body = JsonBody::new();
    body.insert("bodyParam".to_string(), json!("post_body_value"));
    let endpoint = Endpoint::post(HttpScheme::Http, &addr.to_string(), "/v1/echo")
        .with_body(body)
        .with_header(HeaderKey::Custom("X-Client".to_string()), "corenet")
        .with_authorization(Authorization::Bearer("bearer.token.test".to_string()));

    let echo: Value = client.send(&endpoint).await.unwrap();

    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["headers"]["accept"], "application/json");
    assert_eq!(echo["headers"]["cache-control"], "no-cache");
    assert_eq!(echo["headers"]["authorization"], "bearer.token.test");
    assert_eq!(echo["headers"]["x-client"], "corenet");
    assert_eq!(echo["body"], json!({ "bodyParam": "post_body_value" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_sends_do_not_interfere() {
    let addr = start_server();
    let client = ApiClient::new(ClientConfig::default());

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            let mut body = JsonBody::new();
            body.insert("index".to_string(), json!(i));
            let endpoint = Endpoint::post(HttpScheme::Http, &addr.to_string(), "/v1/echo").with_body(body);
            tokio::spawn(async move { client.send::<Value>(&endpoint).await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let echo = task.await.unwrap().unwrap();
        assert_eq!(echo["body"]["index"], json!(i));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_port_is_transport_failure() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = ApiClient::new(ClientConfig::default());
    let endpoint = Endpoint::get(HttpScheme::Http, &addr.to_string(), "/v1/forward");

    let err = client.send::<Value>(&endpoint).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)), "{err}");
}
