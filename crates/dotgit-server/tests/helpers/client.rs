//! Test client helpers.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use dotgit_server::{
    AppState, Settings, create_router_with_state, jobs::DumpRunner,
    metrics::setup::detached_handle,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use super::runners::InstantRunner;

/// Token accepted by routers built with [`client_with_runner`].
pub const TOKEN: &str = "test-token";

/// Drives a router in-process.
pub struct TestClient {
    app: Router,
    state: Option<AppState>,
    // Keeps the output root alive for the lifetime of the client.
    _output: Option<TempDir>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            state: None,
            _output: None,
        }
    }

    /// Returns the state behind the job routes.
    pub fn state(&self) -> &AppState {
        self.state.as_ref().expect("client was built without state")
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.get_with_headers(uri, vec![]).await
    }

    /// GET with the test token.
    pub async fn get_authorized(&self, uri: &str) -> TestResponse {
        self.get_with_headers(uri, vec![(header::AUTHORIZATION.as_str(), TOKEN)])
            .await
    }

    pub async fn get_with_headers(&self, uri: &str, headers: Vec<(&str, &str)>) -> TestResponse {
        let mut builder = Request::builder().uri(uri).method("GET");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// POSTs a JSON body with the test token.
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.post_json_with_token(uri, body, Some(TOKEN)).await
    }

    pub async fn post_json_with_token(
        &self,
        uri: &str,
        body: serde_json::Value,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// DELETE with the test token.
    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .uri(uri)
                .method("DELETE")
                .header(header::AUTHORIZATION, TOKEN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        TestResponse::from_response(response).await
    }
}

/// Buffered response with assertion helpers.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    async fn from_response(response: Response<Body>) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();

        Self {
            status,
            headers,
            body,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Body is not valid UTF-8")
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_content_type_contains(&self, expected: &str) -> &Self {
        let content_type = self
            .header("content-type")
            .expect("Response missing Content-Type header");

        assert!(
            content_type.contains(expected),
            "Expected Content-Type to contain '{}' but got '{}'",
            expected,
            content_type
        );
        self
    }

    pub fn assert_header_exists(&self, name: &str) -> &Self {
        assert!(
            self.headers.contains_key(name),
            "Expected header '{}' to exist",
            name
        );
        self
    }

    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let value = self
            .header(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name));

        assert_eq!(
            value, expected,
            "Expected header '{}' to be '{}' but got '{}'",
            name, expected, value
        );
        self
    }
}

/// Client over the full router with `runner` executing dumps, one worker
/// and a temporary output root.
pub fn client_with_runner(runner: Arc<dyn DumpRunner>) -> TestClient {
    let output = TempDir::new().expect("temp dir");
    let settings = Settings {
        tokens: vec![TOKEN.to_string()],
        output_root: output.path().to_path_buf(),
        workers: 1,
        ..Settings::default()
    };
    let state = AppState::with_runner(settings, runner);
    let app = create_router_with_state(state.clone(), detached_handle());

    TestClient {
        app,
        state: Some(state),
        _output: Some(output),
    }
}

/// Client over the full router with dumps that succeed immediately.
pub fn instant_client() -> TestClient {
    client_with_runner(Arc::new(InstantRunner))
}
