//! Profile dialog launcher.

use std::sync::Arc;

use unit_admin_core::ProfileMode;

use crate::models::User;

/// Width of the profile dialog.
pub const PROFILE_DIALOG_WIDTH: &str = "800px";

/// Dialog bodies the modal host knows how to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogComponent {
    EditProfileForm,
}

/// Initialisation payload for the profile form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDialogData {
    pub user: User,
    pub mode: ProfileMode,
}

/// Modal configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogConfig<T> {
    pub width: &'static str,
    pub data: T,
}

/// Something that can present a modal.
pub trait ModalHost: Send + Sync {
    fn open(&self, component: DialogComponent, config: DialogConfig<ProfileDialogData>);
}

/// Opens the profile form for a user.
///
/// Every call opens a new dialog; concurrent opens are not deduplicated.
#[derive(Clone)]
pub struct ProfileDialogLauncher {
    host: Arc<dyn ModalHost>,
}

impl ProfileDialogLauncher {
    #[must_use]
    pub fn new(host: Arc<dyn ModalHost>) -> Self {
        Self { host }
    }

    pub fn open_dialog(&self, user: User, mode: ProfileMode) {
        tracing::debug!(user_id = ?user.id, %mode, "Opening profile dialog");
        self.host.open(
            DialogComponent::EditProfileForm,
            DialogConfig {
                width: PROFILE_DIALOG_WIDTH,
                data: ProfileDialogData { user, mode },
            },
        );
    }
}

impl std::fmt::Debug for ProfileDialogLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileDialogLauncher").finish_non_exhaustive()
    }
}
