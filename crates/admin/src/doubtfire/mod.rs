//! Doubtfire REST API adapter.
//!
//! This module provides:
//! - [`DoubtfireClient`] implementing the unit, unit-role and user ports
//! - Wire types for the `/api` JSON resources
//! - [`DoubtfireError`] and its mapping onto [`ServiceError`]
//!
//! Requests authenticate with the `Username` and `Auth-Token` headers of a
//! Doubtfire service account.
//!
//! [`ServiceError`]: crate::services::ServiceError

mod client;
mod error;
mod types;

pub use client::DoubtfireClient;
pub use error::DoubtfireError;
pub use types::{GroupSetDto, UnitDto, UnitRoleDto, UserDto};
