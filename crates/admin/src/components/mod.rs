//! Headless UI components.
//!
//! Components hold view state and talk to the service ports; route handlers
//! mount one per request and render it with askama.

pub mod profile_dialog;
pub mod staff_editor;

pub use profile_dialog::{
    DialogComponent, DialogConfig, ModalHost, PROFILE_DIALOG_WIDTH, ProfileDialogData,
    ProfileDialogLauncher,
};
pub use staff_editor::{
    INDIVIDUAL_WORK, MISSING_ACCOUNT_MESSAGE, Selection, StaffEditor, StaffEditorError,
};
