//! Core types for the unit staff admin panel.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod profile;
pub mod role;

pub use id::*;
pub use profile::{ProfileMode, ProfileModeError};
pub use role::{RoleParseError, StaffRole, SystemRole};
