//! Service ports consumed by the staff editor and profile dialogs.
//!
//! Production backs these with the Doubtfire API client; local development
//! and tests use the in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use unit_admin_core::{ProfileMode, StaffRole, UnitId, UnitRoleId, UserId};

use crate::models::{StaffCache, UnitRecord, UnitRole, User};

/// Errors returned by the service ports.
///
/// `Display` is shown to operators verbatim in error notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The API rejected the request; carries the API's own message.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("Unable to reach Doubtfire: {0}")]
    Request(String),

    /// The response could not be understood.
    #[error("Unexpected response from Doubtfire: {0}")]
    InvalidResponse(String),

    /// The requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The configured credentials were rejected.
    #[error("Not authorised: {0}")]
    Unauthorized(String),

    /// The request was rejected before being sent.
    #[error("{0}")]
    Invalid(String),
}

/// Unit lookups and unit-level mutations.
#[async_trait]
pub trait UnitService: Send + Sync {
    /// Load a unit with its staff and group sets.
    async fn get_unit(&self, id: UnitId) -> Result<UnitRecord, ServiceError>;

    /// Assign a user to a unit.
    async fn add_staff(
        &self,
        unit: UnitId,
        user: UserId,
        role: StaffRole,
    ) -> Result<UnitRole, ServiceError>;

    /// Make the given staff assignment the unit's main convenor.
    async fn change_main_convenor(
        &self,
        unit: UnitId,
        unit_role: UnitRoleId,
    ) -> Result<(), ServiceError>;
}

/// Staff assignment mutations.
#[async_trait]
pub trait UnitRoleService: Send + Sync {
    /// Save the role of an existing assignment.
    async fn update(&self, unit_role: &UnitRole) -> Result<UnitRole, ServiceError>;

    /// Delete an assignment.
    async fn delete(&self, unit_role: &UnitRole) -> Result<(), ServiceError>;

    /// Delete an assignment and evict it from the given staff cache.
    async fn delete_cached(
        &self,
        unit_role: &UnitRole,
        cache: &StaffCache,
    ) -> Result<(), ServiceError> {
        self.delete(unit_role).await?;
        cache.remove(unit_role.id);
        Ok(())
    }
}

/// User directory lookups.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Every account that may be given a staff role.
    async fn get_tutors(&self) -> Result<Vec<User>, ServiceError>;

    /// Load a single account.
    async fn get_user(&self, id: UserId) -> Result<User, ServiceError>;

    /// Save a profile: creates an account in `create`/`new` mode, updates it
    /// in `edit` mode.
    async fn save_user(&self, user: &User, mode: ProfileMode) -> Result<User, ServiceError>;
}

/// The set of services the panel talks to.
#[derive(Clone)]
pub struct Backend {
    pub units: Arc<dyn UnitService>,
    pub unit_roles: Arc<dyn UnitRoleService>,
    pub users: Arc<dyn UserService>,
}

impl Backend {
    /// Use one implementation for every port.
    #[must_use]
    pub fn uniform<T>(service: Arc<T>) -> Self
    where
        T: UnitService + UnitRoleService + UserService + 'static,
    {
        Self {
            units: service.clone(),
            unit_roles: service.clone(),
            users: service,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
