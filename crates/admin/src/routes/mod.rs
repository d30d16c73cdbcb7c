//! HTTP route handlers for the admin panel.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                 - Liveness check
//!
//! # Staff editor (HTMX fragments, notifications in HX-Trigger)
//! GET    /units/{unit_id}/staff                  - Staff editor page (panel only for HTMX)
//! GET    /units/{unit_id}/staff/suggestions?q=   - Tutor autocomplete
//! POST   /units/{unit_id}/staff                  - Add selected staff member
//! POST   /units/{unit_id}/staff/{role_id}/role   - Change role
//! POST   /units/{unit_id}/main-convenor          - Change main convenor
//! DELETE /units/{unit_id}/staff/{role_id}        - Remove staff member
//! GET    /units/{unit_id}/staff/events           - SSE stream of staff changes
//!
//! # Profile dialog
//! GET    /users/{user_id}/profile?mode=edit      - Dialog for an existing user
//! GET    /users/profile?mode=create|new          - Dialog for a new user
//! POST   /users/profile                          - Save profile
//! ```

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod profile;
pub mod staff;

/// Build every route.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(staff::router())
        .merge(profile::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check Doubtfire.
async fn health() -> &'static str {
    "ok"
}
