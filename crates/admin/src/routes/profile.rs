//! Profile dialog route handlers.
//!
//! The dialog is opened through [`ProfileDialogLauncher`]; the modal host used
//! over HTTP renders each opened dialog to an HTML fragment that HTMX swaps
//! into the page's modal container.

use std::sync::{Arc, Mutex, PoisonError};

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;
use unit_admin_core::{ProfileMode, SystemRole, UserId};

use crate::components::{
    DialogComponent, DialogConfig, ModalHost, ProfileDialogData, ProfileDialogLauncher,
};
use crate::error::AppError;
use crate::models::User;
use crate::services::{ERROR_DURATION, NotificationQueue, Notifier, SUCCESS_DURATION};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(new_profile).post(save_profile))
        .route("/users/{user_id}/profile", get(edit_profile))
}

#[derive(Debug, Clone)]
pub struct RoleChoice {
    pub name: &'static str,
    pub selected: bool,
}

/// Edit profile form inside a modal.
#[derive(Template)]
#[template(path = "profile/dialog.html")]
pub struct ProfileDialogTemplate {
    pub width: &'static str,
    pub mode: &'static str,
    pub title: &'static str,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub system_roles: Vec<RoleChoice>,
}

impl ProfileDialogTemplate {
    fn new(config: &DialogConfig<ProfileDialogData>) -> Self {
        let ProfileDialogData { user, mode } = &config.data;
        Self {
            width: config.width,
            mode: mode.as_str(),
            title: if mode.creates_account() {
                "Create user"
            } else {
                "Edit profile"
            },
            user_id: user.id.map(|id| id.to_string()).unwrap_or_default(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone().unwrap_or_default(),
            system_roles: SystemRole::ALL
                .iter()
                .map(|r| RoleChoice {
                    name: r.as_str(),
                    selected: *r == user.system_role,
                })
                .collect(),
        }
    }
}

/// Modal host that renders each opened dialog to HTML.
#[derive(Debug, Default)]
pub struct RenderedModals {
    rendered: Mutex<Vec<String>>,
}

impl RenderedModals {
    /// Concatenated HTML of every dialog opened so far.
    fn take_html(&self) -> String {
        std::mem::take(&mut *self.rendered.lock().unwrap_or_else(PoisonError::into_inner))
            .concat()
    }
}

impl ModalHost for RenderedModals {
    fn open(&self, component: DialogComponent, config: DialogConfig<ProfileDialogData>) {
        let html = match component {
            DialogComponent::EditProfileForm => ProfileDialogTemplate::new(&config)
                .render()
                .unwrap_or_else(|e| {
                    tracing::error!("Template render error: {}", e);
                    "Internal Server Error".to_string()
                }),
        };
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(html);
    }
}

fn render_dialog(user: User, mode: ProfileMode) -> Html<String> {
    let modals = Arc::new(RenderedModals::default());
    ProfileDialogLauncher::new(modals.clone()).open_dialog(user, mode);
    Html(modals.take_html())
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub mode: Option<ProfileMode>,
}

/// Profile form for a blank user (`create` or `new` mode).
#[instrument]
async fn new_profile(Query(query): Query<ProfileQuery>) -> Result<Html<String>, AppError> {
    let mode = query.mode.unwrap_or(ProfileMode::Create);
    if !mode.creates_account() {
        return Err(AppError::BadRequest(
            "edit mode requires an existing user".to_string(),
        ));
    }
    Ok(render_dialog(User::blank(), mode))
}

/// Profile form for an existing user.
#[instrument(skip(state))]
async fn edit_profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ProfileQuery>,
) -> Result<Html<String>, AppError> {
    let user = state.backend().users.get_user(user_id).await?;
    Ok(render_dialog(user, query.mode.unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub user_id: Option<String>,
    pub mode: ProfileMode,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    pub email: Option<String>,
    pub system_role: SystemRole,
}

impl ProfileForm {
    fn into_user(self) -> Result<User, AppError> {
        let id = match self.user_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<UserId>()
                    .map_err(|_| AppError::BadRequest(format!("invalid user id: {raw}")))?,
            ),
        };
        Ok(User {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            system_role: self.system_role,
        })
    }
}

/// Save the profile form.
///
/// On success the modal container is emptied; on failure the form is shown
/// again with what was entered.
#[instrument(skip(state, form), fields(mode = %form.mode))]
async fn save_profile(
    State(state): State<AppState>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let mode = form.mode;
    let user = form.into_user()?;
    let notifications = NotificationQueue::new();

    let saved = state.backend().users.save_user(&user, mode).await;
    let body = match saved {
        Ok(saved) => {
            tracing::info!(user_id = ?saved.id, "Profile saved");
            notifications.success("Profile saved", SUCCESS_DURATION);
            Html(String::new())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile save failed");
            notifications.error(&e.to_string(), ERROR_DURATION);
            render_dialog(user, mode)
        }
    };

    let mut response = body.into_response();
    if let Some(trigger) = notifications.take_hx_trigger() {
        response.headers_mut().insert("hx-trigger", trigger);
    }
    Ok(response)
}
