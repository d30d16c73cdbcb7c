//! Staff editor route handlers.
//!
//! Each request mounts a [`StaffEditor`] on the shared unit, runs one
//! operation and renders the editor back. Only the page, suggestions and add
//! handlers load the tutor directory. Notifications raised along the way are
//! returned in the `HX-Trigger` header.

use std::convert::Infallible;
use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{
        Html, IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::{delete, get, post},
};
use serde::Deserialize;
use tracing::instrument;
use unit_admin_core::{StaffRole, UnitId, UnitRoleId, UserId};

use crate::components::{StaffEditor, StaffEditorError};
use crate::error::AppError;
use crate::models::{Unit, UnitRole, User};
use crate::services::NotificationQueue;
use crate::state::AppState;

/// Name of the SSE event sent when a unit's staff changes.
pub const STAFF_CHANGED_EVENT: &str = "staff-changed";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/units/{unit_id}/staff", get(index).post(add_staff))
        .route("/units/{unit_id}/staff/suggestions", get(suggestions))
        .route("/units/{unit_id}/staff/events", get(events))
        .route("/units/{unit_id}/staff/{role_id}/role", post(change_role))
        .route("/units/{unit_id}/staff/{role_id}", delete(remove_staff))
        .route("/units/{unit_id}/main-convenor", post(change_main_convenor))
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone)]
pub struct RoleOption {
    pub name: &'static str,
    pub selected: bool,
}

/// One staff row.
#[derive(Debug, Clone)]
pub struct StaffRowView {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub username: String,
    pub role: &'static str,
    pub role_id: i64,
    pub is_convenor: bool,
    pub is_main_convenor: bool,
    pub role_options: Vec<RoleOption>,
}

impl StaffRowView {
    fn new(unit_role: &UnitRole, main_convenor: Option<UnitRoleId>) -> Self {
        Self {
            id: unit_role.id.as_i64(),
            user_id: unit_role.user.id.map_or(0, |id| id.as_i64()),
            name: unit_role.user.name(),
            username: unit_role.user.username.clone(),
            role: unit_role.role.as_str(),
            role_id: unit_role.role_id(),
            is_convenor: unit_role.role == StaffRole::Convenor,
            is_main_convenor: main_convenor == Some(unit_role.id),
            role_options: StaffRole::ALL
                .iter()
                .map(|r| RoleOption {
                    name: r.as_str(),
                    selected: *r == unit_role.role,
                })
                .collect(),
        }
    }
}

/// One autocomplete suggestion.
#[derive(Debug, Clone)]
pub struct SuggestionView {
    pub user_id: i64,
    pub name: String,
    pub username: String,
}

impl From<&User> for SuggestionView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.map_or(0, |id| id.as_i64()),
            name: user.name(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupSetView {
    pub id: i64,
    pub name: String,
}

/// Staff panel fragment, swapped in after every mutation.
#[derive(Template)]
#[template(path = "staff/_panel.html")]
pub struct StaffPanelTemplate {
    pub unit_id: i64,
    pub staff: Vec<StaffRowView>,
    pub query: String,
    pub suggestions: Vec<SuggestionView>,
}

impl StaffPanelTemplate {
    fn from_editor(editor: &StaffEditor) -> Self {
        let main_convenor = editor.unit().main_convenor_id();
        Self {
            unit_id: editor.unit().id().as_i64(),
            staff: editor
                .unit_staff()
                .iter()
                .map(|r| StaffRowView::new(r, main_convenor))
                .collect(),
            query: editor.selection().query.clone(),
            suggestions: editor
                .suggestions()
                .into_iter()
                .map(SuggestionView::from)
                .collect(),
        }
    }
}

/// Staff editor page.
#[derive(Template, WebTemplate)]
#[template(path = "staff/index.html")]
pub struct StaffIndexTemplate {
    pub unit_code: String,
    pub unit_name: String,
    pub group_sets: Vec<GroupSetView>,
    pub unit_id: i64,
    pub staff: Vec<StaffRowView>,
    pub query: String,
    pub suggestions: Vec<SuggestionView>,
}

/// Autocomplete dropdown fragment.
#[derive(Template)]
#[template(path = "staff/_suggestions.html")]
pub struct SuggestionsTemplate {
    pub unit_id: i64,
    pub suggestions: Vec<SuggestionView>,
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

/// Add staff form. `user_id` is set when a suggestion was picked.
#[derive(Debug, Deserialize)]
pub struct AddStaffForm {
    pub user_id: Option<String>,
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleForm {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct MainConvenorForm {
    pub unit_role_id: UnitRoleId,
}

// =============================================================================
// Helpers
// =============================================================================

/// Editor with the tutor directory loaded, for views that offer suggestions.
async fn mount_editor(
    state: &AppState,
    unit: Arc<Unit>,
    notifications: &Arc<NotificationQueue>,
) -> StaffEditor {
    let backend = state.backend();
    StaffEditor::mount(
        unit,
        backend.users.as_ref(),
        backend.unit_roles.clone(),
        notifications.clone(),
    )
    .await
}

/// Editor for staff mutations that never touch the directory.
async fn attach_editor(
    state: &AppState,
    unit_id: UnitId,
    notifications: &Arc<NotificationQueue>,
) -> Result<StaffEditor, AppError> {
    let unit = state.units().get(unit_id).await?;
    Ok(StaffEditor::attach(
        unit,
        state.backend().unit_roles.clone(),
        notifications.clone(),
    ))
}

/// Operation failures have been notified already; only a missing staff
/// assignment becomes an HTTP error.
fn settle<T>(result: Result<T, StaffEditorError>) -> Result<(), AppError> {
    match result {
        Ok(_) => Ok(()),
        Err(e @ StaffEditorError::UnknownStaff(_)) => Err(e.into()),
        Err(e) => {
            tracing::debug!(error = %e, "Staff operation failed");
            Ok(())
        }
    }
}

fn with_notifications(mut response: Response, notifications: &NotificationQueue) -> Response {
    if let Some(trigger) = notifications.take_hx_trigger() {
        response.headers_mut().insert("hx-trigger", trigger);
    }
    response
}

fn render_panel(editor: &StaffEditor, notifications: &NotificationQueue) -> Response {
    let template = StaffPanelTemplate::from_editor(editor);
    let html = Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }));
    with_notifications(html.into_response(), notifications)
}

fn parse_user_id(raw: Option<&str>) -> Option<UserId> {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| s.parse().ok())
}

// =============================================================================
// Handlers
// =============================================================================

/// Staff editor page, or just the panel for HTMX refreshes.
///
/// A full page load reloads the unit from the API so changes made outside
/// the panel show up; panel refreshes use the shared cache.
#[instrument(skip(state, headers))]
async fn index(
    State(state): State<AppState>,
    Path(unit_id): Path<UnitId>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let is_htmx = headers.contains_key("hx-request");
    let unit = if is_htmx {
        state.units().get(unit_id).await?
    } else {
        state.units().refresh(unit_id).await?
    };
    let notifications = Arc::new(NotificationQueue::new());
    let mut editor = mount_editor(&state, unit, &notifications).await;

    let response = if is_htmx {
        render_panel(&editor, &notifications)
    } else {
        let panel = StaffPanelTemplate::from_editor(&editor);
        let template = StaffIndexTemplate {
            unit_code: editor.unit().code().to_string(),
            unit_name: editor.unit().name().to_string(),
            group_sets: editor
                .unit()
                .group_sets()
                .into_iter()
                .map(|g| GroupSetView {
                    id: g.id.as_i64(),
                    name: editor.group_set_name(g.id),
                })
                .collect(),
            unit_id: panel.unit_id,
            staff: panel.staff,
            query: panel.query,
            suggestions: panel.suggestions,
        };
        with_notifications(template.into_response(), &notifications)
    };

    editor.dispose();
    Ok(response)
}

/// Autocomplete suggestions for the typed text.
#[instrument(skip(state))]
async fn suggestions(
    State(state): State<AppState>,
    Path(unit_id): Path<UnitId>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Response, AppError> {
    let unit = state.units().get(unit_id).await?;
    let notifications = Arc::new(NotificationQueue::new());
    let mut editor = mount_editor(&state, unit, &notifications).await;
    editor.set_query(&query.q);

    let template = SuggestionsTemplate {
        unit_id: unit_id.as_i64(),
        suggestions: editor
            .suggestions()
            .into_iter()
            .map(SuggestionView::from)
            .collect(),
    };
    let html = Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }));
    Ok(with_notifications(html.into_response(), &notifications))
}

/// Add the picked (or typed) staff member.
#[instrument(skip(state))]
async fn add_staff(
    State(state): State<AppState>,
    Path(unit_id): Path<UnitId>,
    Form(form): Form<AddStaffForm>,
) -> Result<Response, AppError> {
    let unit = state.units().get(unit_id).await?;
    let notifications = Arc::new(NotificationQueue::new());
    let mut editor = mount_editor(&state, unit, &notifications).await;

    editor.set_query(&form.q);
    if let Some(user_id) = parse_user_id(form.user_id.as_deref()) {
        if !editor.select_tutor(user_id) {
            tracing::debug!(user_id = %user_id, "Picked user is not an eligible tutor");
        }
    }

    settle(editor.add_selected_staff().await)?;
    Ok(render_panel(&editor, &notifications))
}

/// Change a staff member's role.
#[instrument(skip(state))]
async fn change_role(
    State(state): State<AppState>,
    Path((unit_id, role_id)): Path<(UnitId, UnitRoleId)>,
    Form(form): Form<ChangeRoleForm>,
) -> Result<Response, AppError> {
    let role: StaffRole = form
        .role
        .parse()
        .map_err(|e: unit_admin_core::RoleParseError| AppError::BadRequest(e.to_string()))?;

    let notifications = Arc::new(NotificationQueue::new());
    let editor = attach_editor(&state, unit_id, &notifications).await?;

    settle(editor.change_role(role_id, role).await)?;
    Ok(render_panel(&editor, &notifications))
}

/// Make a staff member the main convenor.
#[instrument(skip(state))]
async fn change_main_convenor(
    State(state): State<AppState>,
    Path(unit_id): Path<UnitId>,
    Form(form): Form<MainConvenorForm>,
) -> Result<Response, AppError> {
    let notifications = Arc::new(NotificationQueue::new());
    let editor = attach_editor(&state, unit_id, &notifications).await?;

    settle(editor.change_main_convenor(form.unit_role_id).await)?;
    Ok(render_panel(&editor, &notifications))
}

/// Remove a staff member from the unit.
#[instrument(skip(state))]
async fn remove_staff(
    State(state): State<AppState>,
    Path((unit_id, role_id)): Path<(UnitId, UnitRoleId)>,
) -> Result<Response, AppError> {
    let notifications = Arc::new(NotificationQueue::new());
    let editor = attach_editor(&state, unit_id, &notifications).await?;

    settle(editor.remove_staff(role_id).await)?;
    Ok(render_panel(&editor, &notifications))
}

/// Stream staff-list changes so open pages can refresh their panel.
///
/// The subscription is released when the client disconnects, or the stream
/// ends when the unit is evicted from the store.
#[instrument(skip(state))]
async fn events(
    State(state): State<AppState>,
    Path(unit_id): Path<UnitId>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let unit = state.units().get(unit_id).await?;
    let mut subscription = unit.staff_cache().subscribe();
    drop(unit);

    let stream = async_stream::stream! {
        while let Some(staff) = subscription.changed().await {
            let ids: Vec<i64> = staff.iter().map(|r| r.id.as_i64()).collect();
            let data = serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string());
            yield Ok(Event::default().event(STAFF_CHANGED_EVENT).data(data));
        }
        tracing::debug!(unit_id = %unit_id, "Staff event stream ended");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use unit_admin_core::SystemRole;

    use super::*;

    fn unit_role(id: i64, role: StaffRole) -> UnitRole {
        let mut user = User::unsaved("Ada Lovelace");
        user.id = Some(UserId::new(id));
        user.username = "alovelace".to_string();
        user.system_role = SystemRole::Convenor;
        UnitRole {
            id: UnitRoleId::new(id),
            user,
            role,
        }
    }

    #[test]
    fn test_row_view_marks_selected_role_and_main_convenor() {
        let row = StaffRowView::new(
            &unit_role(5, StaffRole::Convenor),
            Some(UnitRoleId::new(5)),
        );
        assert_eq!(row.role, "Convenor");
        assert_eq!(row.role_id, 3);
        assert!(row.is_main_convenor);
        let selected: Vec<_> = row
            .role_options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.name)
            .collect();
        assert_eq!(selected, vec!["Convenor"]);
    }

    #[test]
    fn test_parse_user_id_ignores_blank_and_garbage() {
        assert_eq!(parse_user_id(None), None);
        assert_eq!(parse_user_id(Some("")), None);
        assert_eq!(parse_user_id(Some("abc")), None);
        assert_eq!(parse_user_id(Some("42")), Some(UserId::new(42)));
    }

    #[test]
    fn test_settle_only_fails_on_unknown_staff() {
        assert!(settle::<()>(Err(StaffEditorError::MissingIdentity)).is_ok());
        assert!(settle::<()>(Err(StaffEditorError::UnknownStaff(UnitRoleId::new(1)))).is_err());
    }
}
