//! Integration test harness for the unit staff admin panel.
//!
//! Tests drive the full router (middleware included) in-process with
//! `tower::ServiceExt::oneshot`, backed by the seeded in-memory backend, so no
//! Doubtfire deployment is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p unit-admin-integration-tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use tower::ServiceExt;
use unit_admin::services::{Backend, InMemoryBackend, UserService};
use unit_admin::state::AppState;
use unit_admin_core::UserId;

/// A router over a seeded in-memory backend.
pub struct TestApp {
    pub app: Router,
    pub backend: Arc<InMemoryBackend>,
}

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Notifications carried in `HX-Trigger`, as `(kind, message)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if the header is present but not valid notification JSON.
    #[must_use]
    pub fn notifications(&self) -> Vec<(String, String)> {
        let Some(raw) = self.headers.get("hx-trigger") else {
            return Vec::new();
        };
        let value: serde_json::Value =
            serde_json::from_str(raw.to_str().expect("ASCII header")).expect("JSON header");
        value["notify"]
            .as_array()
            .expect("notify array")
            .iter()
            .map(|n| {
                (
                    n["kind"].as_str().unwrap_or_default().to_string(),
                    n["message"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(InMemoryBackend::seeded())
    }

    #[must_use]
    pub fn with_backend(backend: InMemoryBackend) -> Self {
        let backend = Arc::new(backend);
        let state = AppState::new(
            Backend::uniform(backend.clone()),
            Duration::from_secs(60),
        );
        Self {
            app: unit_admin::app(state),
            backend,
        }
    }

    /// Send a request and collect the whole response.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not UTF-8.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.send_streaming(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).expect("UTF-8 body"),
        }
    }

    /// Send a request without collecting the body.
    ///
    /// # Panics
    ///
    /// Panics if the router fails.
    pub async fn send_streaming(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).expect("request"))
            .await
    }

    /// GET with `HX-Request: true`, as HTMX sends it.
    pub async fn hx_get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::get(uri)
                .header("hx-request", "true")
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form(&self, uri: &str, form: &str) -> TestResponse {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("hx-request", "true")
                .body(Body::from(form.to_string()))
                .expect("request"),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(
            Request::delete(uri)
                .header("hx-request", "true")
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    /// ID of the seeded account with this first name.
    ///
    /// # Panics
    ///
    /// Panics if there is no such account.
    pub async fn user_id(&self, first_name: &str) -> UserId {
        self.backend
            .get_tutors()
            .await
            .expect("directory")
            .into_iter()
            .find(|u| u.first_name == first_name)
            .and_then(|u| u.id)
            .expect("seeded user")
    }
}
