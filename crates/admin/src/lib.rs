//! Unit staff administration panel.
//!
//! Server-rendered (askama + HTMX) panel for managing the staff of Doubtfire
//! units and editing user profiles. Exposed as a library so the router can be
//! exercised by integration tests.
//!
//! # Security
//!
//! The panel authenticates to Doubtfire with a service account and has no
//! login of its own. Bind it to localhost or a private network only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod components;
pub mod config;
pub mod doubtfire;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use config::AdminConfig;
use doubtfire::{DoubtfireClient, DoubtfireError};
use services::{Backend, InMemoryBackend};
use state::AppState;

/// Pick the backend for the configuration.
///
/// Without Doubtfire credentials the panel runs on seeded in-memory data.
///
/// # Errors
///
/// Returns an error if the Doubtfire client cannot be built.
pub fn backend_from_config(config: &AdminConfig) -> Result<Backend, DoubtfireError> {
    match config.doubtfire() {
        Some(doubtfire) => {
            tracing::info!(api_url = %doubtfire.api_url, "Using Doubtfire API");
            let client = DoubtfireClient::new(doubtfire, config.tutor_cache_ttl)?;
            Ok(Backend::uniform(Arc::new(client)))
        }
        None => {
            tracing::warn!("DOUBTFIRE_* not set, serving seeded in-memory data");
            Ok(Backend::uniform(Arc::new(InMemoryBackend::seeded())))
        }
    }
}

/// Build the application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
