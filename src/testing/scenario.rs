//! In-process HTTP scenarios for the webhook routes
//!
//! Requests go straight through the router with `oneshot`; no socket is
//! opened. Because the allowlist needs a peer address, scenarios attach a
//! `ConnectInfo<SocketAddr>` the way the real server does, defaulting to
//! `127.0.0.1`.
//!
//! # Example
//!
//! ```rust,ignore
//! use yaya_webhook::testing::{self, TestPayment};
//!
//! #[tokio::test]
//! async fn accepts_signed_webhook() {
//!     let payment = TestPayment::new();
//!
//!     testing::post(app, "/webhook")
//!         .signature(&payment.signature("secret"))
//!         .json_body(&payment.to_json())
//!         .execute()
//!         .await
//!         .assert_ok()
//!         .assert_text("Webhook received successfully")
//!         .await;
//! }
//! ```

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, Method, Request, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower::ServiceExt;

/// Port reported for the simulated peer
const PEER_PORT: u16 = 40_000;

/// Header the scenarios sign into unless told otherwise
pub const SIGNATURE_HEADER: &str = "yaya-signature";

/// Test scenario builder for a single request
pub struct Scenario {
    app: Router,
    request: Request<Body>,
}

impl Scenario {
    /// Create a new test scenario with the given app
    pub fn new(app: Router) -> Self {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            PEER_PORT,
        )));

        Self { app, request }
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        *self.request.method_mut() = method;
        self
    }

    /// Set the URI/path
    pub fn uri(mut self, uri: &str) -> Self {
        *self.request.uri_mut() = uri.parse().unwrap();
        self
    }

    /// Pretend the request came from `ip`
    pub fn from_ip(mut self, ip: &str) -> Self {
        let ip: IpAddr = ip.parse().unwrap();
        self.request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(ip, PEER_PORT)));
        self
    }

    /// Drop the peer address entirely, as if served without connect info
    pub fn without_peer(mut self) -> Self {
        self.request.extensions_mut().remove::<ConnectInfo<SocketAddr>>();
        self
    }

    /// Add a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers_mut().insert(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            value.parse().unwrap(),
        );
        self
    }

    /// Set the `yaya-signature` header
    pub fn signature(self, signature: &str) -> Self {
        self.header(SIGNATURE_HEADER, signature)
    }

    /// Set JSON body from a serializable type
    pub fn json_body<T: Serialize>(mut self, body: &T) -> Self {
        let json = serde_json::to_string(body).unwrap();
        *self.request.body_mut() = Body::from(json);
        self.request
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        self
    }

    /// Set the body verbatim, with a JSON content type
    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        *self.request.body_mut() = Body::from(body.into());
        self.request
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        self
    }

    /// Execute the request and get an assertion builder
    pub async fn execute(self) -> ScenarioAssert {
        let response = self.app.oneshot(self.request).await.unwrap();
        ScenarioAssert { response }
    }
}

/// Assertion builder for test responses
pub struct ScenarioAssert {
    response: axum::response::Response,
}

impl ScenarioAssert {
    /// Assert the response status code
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.response.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.response.status()
        );
        self
    }

    /// Assert status is 200 OK
    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    /// Assert status is 400 Bad Request
    pub fn assert_bad_request(self) -> Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    /// Assert status is 403 Forbidden
    pub fn assert_forbidden(self) -> Self {
        self.assert_status(StatusCode::FORBIDDEN)
    }

    /// Assert status is 404 Not Found
    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    /// Assert status is 500 Internal Server Error
    pub fn assert_server_error(self) -> Self {
        self.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Assert a header exists with the given value
    pub fn assert_header(self, key: &str, expected: &str) -> Self {
        let value = self
            .response
            .headers()
            .get(key)
            .unwrap_or_else(|| panic!("Header '{}' not found", key))
            .to_str()
            .unwrap();
        assert_eq!(value, expected, "Header '{}' value mismatch", key);
        self
    }

    /// Assert a header is present, whatever its value
    pub fn assert_has_header(self, key: &str) -> Self {
        assert!(
            self.response.headers().contains_key(key),
            "Header '{}' not found",
            key
        );
        self
    }

    /// Assert the response content type is JSON
    pub fn assert_json(self) -> Self {
        let content_type = self
            .response
            .headers()
            .get(header::CONTENT_TYPE)
            .expect("Content-Type header not found")
            .to_str()
            .unwrap();
        assert!(
            content_type.contains("application/json"),
            "Expected JSON content type, got: {}",
            content_type
        );
        self
    }

    /// Get the response body as bytes
    pub async fn body_bytes(self) -> Vec<u8> {
        axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    /// Get the response body as a string
    pub async fn body_string(self) -> String {
        String::from_utf8(self.body_bytes().await).unwrap()
    }

    /// Parse the JSON response body into a type
    pub async fn json<T: for<'de> Deserialize<'de>>(self) -> T {
        let bytes = self.body_bytes().await;
        serde_json::from_slice(&bytes).expect("Failed to parse JSON response")
    }

    /// Assert the body is exactly `expected`
    pub async fn assert_text(self, expected: &str) -> Self {
        let status = self.response.status();
        let body = self.body_string().await;
        assert_eq!(body, expected, "Response body mismatch (status {})", status);

        let mut response = axum::response::Response::new(Body::from(body));
        *response.status_mut() = status;
        Self { response }
    }

    /// Get the underlying response for custom assertions
    pub fn response(self) -> axum::response::Response {
        self.response
    }
}

/// Convenience function to create a GET request scenario
pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::GET).uri(uri)
}

/// Convenience function to create a POST request scenario
pub fn post(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::POST).uri(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, routing::post as axum_post};
    use serde_json::{Value, json};

    async fn peer(ConnectInfo(addr): ConnectInfo<SocketAddr>) -> String {
        addr.ip().to_string()
    }

    async fn echo(body: Json<Value>) -> Json<Value> {
        body
    }

    #[tokio::test]
    async fn test_default_peer_is_loopback() {
        let app = Router::new().route("/peer", axum_post(peer));

        post(app, "/peer")
            .execute()
            .await
            .assert_ok()
            .assert_text("127.0.0.1")
            .await;
    }

    #[tokio::test]
    async fn test_from_ip() {
        let app = Router::new().route("/peer", axum_post(peer));

        post(app, "/peer")
            .from_ip("::1")
            .execute()
            .await
            .assert_ok()
            .assert_text("::1")
            .await;
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let app = Router::new().route("/echo", axum_post(echo));

        let body: Value = post(app, "/echo")
            .json_body(&json!({"id": "abc"}))
            .execute()
            .await
            .assert_ok()
            .assert_json()
            .json()
            .await;
        assert_eq!(body["id"], "abc");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = Router::new().route("/echo", axum_post(echo));

        get(app, "/missing").execute().await.assert_not_found();
    }
}
