//! User account domain type.

use unit_admin_core::{SystemRole, UserId};

/// A Doubtfire user account.
///
/// `id` is `None` for a user that only exists as text typed into a form; such
/// a user has no persisted identity and cannot be assigned to a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Persisted account ID.
    pub id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    /// Login name.
    pub username: String,
    pub email: Option<String>,
    /// System-wide role of the account.
    pub system_role: SystemRole,
}

impl User {
    /// A user typed into the staff search box that matched no account.
    #[must_use]
    pub fn unsaved(name: &str) -> Self {
        let mut parts = name.trim().splitn(2, ' ');
        Self {
            id: None,
            first_name: parts.next().unwrap_or_default().to_string(),
            last_name: parts.next().unwrap_or_default().trim().to_string(),
            username: String::new(),
            email: None,
            system_role: SystemRole::Student,
        }
    }

    /// An empty profile, used when the profile form creates an account.
    #[must_use]
    pub fn blank() -> Self {
        Self::unsaved("")
    }

    /// Display name ("First Last").
    #[must_use]
    pub fn name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => self.username.clone(),
        }
    }

    /// Whether the user has been saved by Doubtfire.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Case-insensitive substring match on the display name.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name().to_lowercase().contains(needle)
    }
}
