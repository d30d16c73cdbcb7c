//! Profile dialog modes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a profile mode is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid profile mode: {0}")]
pub struct ProfileModeError(pub String);

/// How the profile form is being used.
///
/// `Edit` changes an existing account. `Create` is an administrator creating
/// an account for someone else; `New` is a first-time user completing their
/// own profile. Both of the latter save a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    #[default]
    Edit,
    Create,
    New,
}

impl ProfileMode {
    /// Whether saving in this mode creates a new account.
    #[must_use]
    pub const fn creates_account(self) -> bool {
        matches!(self, Self::Create | Self::New)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Create => "create",
            Self::New => "new",
        }
    }
}

impl std::fmt::Display for ProfileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProfileMode {
    type Err = ProfileModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(Self::Edit),
            "create" => Ok(Self::Create),
            "new" => Ok(Self::New),
            other => Err(ProfileModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_mode_parse() {
        assert_eq!("create".parse::<ProfileMode>().unwrap(), ProfileMode::Create);
        assert!("delete".parse::<ProfileMode>().is_err());
    }

    #[test]
    fn test_only_create_and_new_create_accounts() {
        assert!(!ProfileMode::Edit.creates_account());
        assert!(ProfileMode::Create.creates_account());
        assert!(ProfileMode::New.creates_account());
    }
}
