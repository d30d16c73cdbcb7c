//! Wire types for the Doubtfire `/api` resources.

use serde::{Deserialize, Serialize};
use unit_admin_core::{GroupSetId, StaffRole, SystemRole, UnitId, UnitRoleId, UserId};

use super::DoubtfireError;
use crate::models::{GroupSet, UnitRecord, UnitRole, User};

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub error: Option<String>,
}

/// `GET /api/users/{id}`, `GET /api/users/tutors`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    pub email: Option<String>,
    pub system_role: String,
}

impl TryFrom<UserDto> for User {
    type Error = DoubtfireError;

    fn try_from(dto: UserDto) -> Result<Self, Self::Error> {
        let system_role: SystemRole = dto
            .system_role
            .parse()
            .map_err(|e| DoubtfireError::Response(format!("user {}: {e}", dto.id)))?;
        Ok(Self {
            id: Some(UserId::new(dto.id)),
            first_name: dto.first_name,
            last_name: dto.last_name,
            username: dto.username,
            email: dto.email.filter(|e| !e.is_empty()),
            system_role,
        })
    }
}

/// A staff assignment as embedded in a unit or returned by `/api/unit_roles`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitRoleDto {
    pub id: i64,
    /// Role name, e.g. "Tutor".
    pub role: String,
    pub user: UserDto,
}

impl TryFrom<UnitRoleDto> for UnitRole {
    type Error = DoubtfireError;

    fn try_from(dto: UnitRoleDto) -> Result<Self, Self::Error> {
        let role: StaffRole = dto
            .role
            .parse()
            .map_err(|e| DoubtfireError::Response(format!("unit role {}: {e}", dto.id)))?;
        Ok(Self {
            id: UnitRoleId::new(dto.id),
            user: User::try_from(dto.user)?,
            role,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupSetDto {
    pub id: i64,
    pub name: String,
}

/// `GET /api/units/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitDto {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub main_convenor_id: Option<i64>,
    #[serde(default)]
    pub staff: Vec<UnitRoleDto>,
    #[serde(default)]
    pub group_sets: Vec<GroupSetDto>,
}

impl TryFrom<UnitDto> for UnitRecord {
    type Error = DoubtfireError;

    fn try_from(dto: UnitDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UnitId::new(dto.id),
            code: dto.code,
            name: dto.name,
            main_convenor_id: dto.main_convenor_id.map(UnitRoleId::new),
            staff: dto
                .staff
                .into_iter()
                .map(UnitRole::try_from)
                .collect::<Result<_, _>>()?,
            group_sets: dto
                .group_sets
                .into_iter()
                .map(|g| GroupSet {
                    id: GroupSetId::new(g.id),
                    name: g.name,
                })
                .collect(),
        })
    }
}

/// `POST /api/unit_roles`.
#[derive(Debug, Serialize)]
pub(super) struct CreateUnitRole {
    pub unit_id: i64,
    pub user_id: i64,
    pub role_id: i64,
}

/// `PUT /api/unit_roles/{id}`.
#[derive(Debug, Serialize)]
pub(super) struct UpdateUnitRole {
    pub unit_role: RoleChange,
}

#[derive(Debug, Serialize)]
pub(super) struct RoleChange {
    pub role_id: i64,
}

/// `PUT /api/units/{id}`.
#[derive(Debug, Serialize)]
pub(super) struct UpdateUnit {
    pub unit: MainConvenorChange,
}

#[derive(Debug, Serialize)]
pub(super) struct MainConvenorChange {
    pub main_convenor_id: i64,
}

/// `POST /api/users`, `PUT /api/users/{id}`.
#[derive(Debug, Serialize)]
pub(super) struct SaveUser<'a> {
    pub user: UserPayload<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct UserPayload<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    pub system_role: &'static str,
}

impl<'a> From<&'a User> for SaveUser<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            user: UserPayload {
                first_name: &user.first_name,
                last_name: &user.last_name,
                username: &user.username,
                email: user.email.as_deref(),
                system_role: user.system_role.as_str(),
            },
        }
    }
}
