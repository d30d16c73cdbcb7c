//! Staff and system roles.
//!
//! A unit role carries exactly one [`StaffRole`]. Doubtfire still exchanges the
//! legacy numeric `role_id` on the wire, so the numeric code is derived from the
//! enum instead of being stored next to it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a role name or code is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleParseError {
    /// The role name is not one of the known names.
    #[error("invalid role name: {0}")]
    UnknownName(String),
    /// The numeric role code is not a staff role.
    #[error("invalid staff role id: {0}")]
    UnknownId(i64),
}

/// Role of a staff member on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRole {
    /// Teaching and marking responsibilities.
    Tutor,
    /// Responsible for running the unit.
    Convenor,
}

impl StaffRole {
    /// All staff roles in the order they are offered in role pickers.
    pub const ALL: [Self; 2] = [Self::Tutor, Self::Convenor];

    /// Legacy numeric code used by the Doubtfire API.
    #[must_use]
    pub const fn role_id(self) -> i64 {
        match self {
            Self::Tutor => 2,
            Self::Convenor => 3,
        }
    }

    /// Resolve a legacy numeric code.
    ///
    /// # Errors
    ///
    /// Returns `RoleParseError::UnknownId` for codes that are not staff roles
    /// (for example the student role, `1`).
    pub const fn from_role_id(id: i64) -> Result<Self, RoleParseError> {
        match id {
            2 => Ok(Self::Tutor),
            3 => Ok(Self::Convenor),
            other => Err(RoleParseError::UnknownId(other)),
        }
    }

    /// Human readable name, as shown in the role picker.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tutor => "Tutor",
            Self::Convenor => "Convenor",
        }
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StaffRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tutor" => Ok(Self::Tutor),
            "convenor" => Ok(Self::Convenor),
            _ => Err(RoleParseError::UnknownName(s.to_string())),
        }
    }
}

/// System-wide role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemRole {
    Admin,
    Convenor,
    Tutor,
    Student,
}

impl SystemRole {
    /// All system roles in the order they are offered in the profile form.
    pub const ALL: [Self; 4] = [Self::Admin, Self::Convenor, Self::Tutor, Self::Student];

    /// Whether an account with this role may be added to a unit's staff.
    #[must_use]
    pub const fn is_staff_eligible(self) -> bool {
        matches!(self, Self::Admin | Self::Convenor | Self::Tutor)
    }

    /// Role name as used by the Doubtfire API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Convenor => "Convenor",
            Self::Tutor => "Tutor",
            Self::Student => "Student",
        }
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SystemRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "convenor" => Ok(Self::Convenor),
            "tutor" => Ok(Self::Tutor),
            "student" => Ok(Self::Student),
            _ => Err(RoleParseError::UnknownName(s.to_string())),
        }
    }
}
