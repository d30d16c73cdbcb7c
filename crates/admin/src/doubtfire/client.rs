//! Doubtfire REST API client.
//!
//! Implements the service ports over `reqwest`. The tutor directory is cached
//! with `moka` because every staff editor mount asks for it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use unit_admin_core::{ProfileMode, StaffRole, UnitId, UnitRoleId, UserId};

use super::error::DoubtfireError;
use super::types::{
    CreateUnitRole, MainConvenorChange, RoleChange, SaveUser, UnitDto, UnitRoleDto,
    UpdateUnit, UpdateUnitRole, UserDto,
};
use crate::config::DoubtfireConfig;
use crate::models::{UnitRecord, UnitRole, User};
use crate::services::{ServiceError, UnitRoleService, UnitService, UserService};

const TUTORS_KEY: &str = "tutors";

/// Client for the Doubtfire REST API.
#[derive(Clone)]
pub struct DoubtfireClient {
    inner: Arc<DoubtfireClientInner>,
}

struct DoubtfireClientInner {
    client: Client,
    /// API root without trailing slash, e.g. `https://doubtfire.example.edu`.
    base_url: String,
    username: String,
    auth_token: SecretString,
    tutors: Cache<&'static str, Arc<Vec<User>>>,
}

impl std::fmt::Debug for DoubtfireClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubtfireClient")
            .field("base_url", &self.inner.base_url)
            .field("username", &self.inner.username)
            .field("auth_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl DoubtfireClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `DoubtfireError::Config` if the HTTP client cannot be built.
    pub fn new(config: &DoubtfireConfig, tutor_cache_ttl: Duration) -> Result<Self, DoubtfireError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("unit-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DoubtfireError::Config(e.to_string()))?;

        let tutors = Cache::builder()
            .max_capacity(1)
            .time_to_live(tutor_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(DoubtfireClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
                username: config.username.clone(),
                auth_token: config.auth_token.clone(),
                tutors,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.inner.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, self.url(path))
            .header("Username", &self.inner.username)
            .header("Auth-Token", self.inner.auth_token.expose_secret())
            .header("Accept", "application/json")
    }

    /// Fail on non-success statuses, keeping the API's error message.
    async fn check(response: Response) -> Result<Response, DoubtfireError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = DoubtfireError::from_status(status.as_u16(), &body);
        error!(status = %status, error = %err, "Doubtfire API error");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, DoubtfireError> {
        let response = Self::check(builder.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, body = %text, "Failed to parse Doubtfire response");
            DoubtfireError::Response(e.to_string())
        })
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), DoubtfireError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn fetch_tutors(&self) -> Result<Arc<Vec<User>>, DoubtfireError> {
        let dtos: Vec<UserDto> = Self::send_json(self.request(Method::GET, "users/tutors")).await?;
        let tutors = dtos
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = tutors.len(), "Fetched tutors");
        Ok(Arc::new(tutors))
    }
}

#[async_trait]
impl UnitService for DoubtfireClient {
    #[instrument(skip(self), fields(unit_id = %id))]
    async fn get_unit(&self, id: UnitId) -> Result<UnitRecord, ServiceError> {
        let dto: UnitDto = Self::send_json(self.request(Method::GET, &format!("units/{id}"))).await?;
        Ok(UnitRecord::try_from(dto)?)
    }

    #[instrument(skip(self), fields(unit_id = %unit, user_id = %user, role = %role))]
    async fn add_staff(
        &self,
        unit: UnitId,
        user: UserId,
        role: StaffRole,
    ) -> Result<UnitRole, ServiceError> {
        let body = CreateUnitRole {
            unit_id: unit.as_i64(),
            user_id: user.as_i64(),
            role_id: role.role_id(),
        };
        let dto: UnitRoleDto =
            Self::send_json(self.request(Method::POST, "unit_roles").json(&body)).await?;
        Ok(UnitRole::try_from(dto)?)
    }

    #[instrument(skip(self), fields(unit_id = %unit, unit_role_id = %unit_role))]
    async fn change_main_convenor(
        &self,
        unit: UnitId,
        unit_role: UnitRoleId,
    ) -> Result<(), ServiceError> {
        let body = UpdateUnit {
            unit: MainConvenorChange {
                main_convenor_id: unit_role.as_i64(),
            },
        };
        Self::send_empty(self.request(Method::PUT, &format!("units/{unit}")).json(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl UnitRoleService for DoubtfireClient {
    #[instrument(skip(self, unit_role), fields(unit_role_id = %unit_role.id, role = %unit_role.role))]
    async fn update(&self, unit_role: &UnitRole) -> Result<UnitRole, ServiceError> {
        let body = UpdateUnitRole {
            unit_role: RoleChange {
                role_id: unit_role.role_id(),
            },
        };
        let dto: UnitRoleDto = Self::send_json(
            self.request(Method::PUT, &format!("unit_roles/{}", unit_role.id))
                .json(&body),
        )
        .await?;
        Ok(UnitRole::try_from(dto)?)
    }

    #[instrument(skip(self, unit_role), fields(unit_role_id = %unit_role.id))]
    async fn delete(&self, unit_role: &UnitRole) -> Result<(), ServiceError> {
        Self::send_empty(self.request(Method::DELETE, &format!("unit_roles/{}", unit_role.id)))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserService for DoubtfireClient {
    #[instrument(skip(self))]
    async fn get_tutors(&self) -> Result<Vec<User>, ServiceError> {
        let tutors = self
            .inner
            .tutors
            .try_get_with(TUTORS_KEY, self.fetch_tutors())
            .await
            .map_err(|e: Arc<DoubtfireError>| ServiceError::from((*e).clone()))?;
        Ok(tutors.as_ref().clone())
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: UserId) -> Result<User, ServiceError> {
        let dto: UserDto = Self::send_json(self.request(Method::GET, &format!("users/{id}"))).await?;
        Ok(User::try_from(dto)?)
    }

    #[instrument(skip(self, user), fields(user_id = ?user.id, mode = %mode))]
    async fn save_user(&self, user: &User, mode: ProfileMode) -> Result<User, ServiceError> {
        let body = SaveUser::from(user);
        let builder = if mode.creates_account() {
            self.request(Method::POST, "users")
        } else {
            let id = user
                .id
                .ok_or_else(|| ServiceError::Invalid("cannot edit an unsaved user".to_string()))?;
            self.request(Method::PUT, &format!("users/{id}"))
        };

        let dto: UserDto = Self::send_json(builder.json(&body)).await?;
        let saved = User::try_from(dto)?;

        // System role may have changed who counts as a tutor
        self.inner.tutors.invalidate(TUTORS_KEY).await;
        Ok(saved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(url: &str) -> DoubtfireConfig {
        DoubtfireConfig {
            api_url: url.parse().unwrap(),
            username: "svc-unit-admin".to_string(),
            auth_token: SecretString::from("x7Kp2mQ9vL4tR8wZ"),
        }
    }

    #[test]
    fn test_url_joins_api_prefix_without_double_slash() {
        let client =
            DoubtfireClient::new(&config("https://doubtfire.example.edu/"), Duration::from_secs(60))
                .unwrap();
        assert_eq!(
            client.url("units/4"),
            "https://doubtfire.example.edu/api/units/4"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client =
            DoubtfireClient::new(&config("https://doubtfire.example.edu"), Duration::from_secs(60))
                .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("x7Kp2mQ9vL4tR8wZ"));
    }
}
