//! Staff assignment domain type.

use unit_admin_core::{StaffRole, UnitRoleId};

use super::user::User;

/// A user's staff assignment on a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRole {
    pub id: UnitRoleId,
    /// The staff member. Always a persisted user.
    pub user: User,
    pub role: StaffRole,
}

impl UnitRole {
    /// Legacy numeric role code, derived from [`UnitRole::role`].
    #[must_use]
    pub const fn role_id(&self) -> i64 {
        self.role.role_id()
    }

    /// Whether this assignment belongs to the given user.
    #[must_use]
    pub fn is_for(&self, user: &User) -> bool {
        user.id.is_some() && self.user.id == user.id
    }
}
