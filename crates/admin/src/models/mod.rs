//! Domain models for the admin panel.
//!
//! - [`Unit`] - aggregate root owning the staff cache and group sets
//! - [`UnitRole`] - a user's staff assignment on a unit
//! - [`User`] - a Doubtfire account
//! - [`StaffCache`] - observable mirror of a unit's staff

pub mod staff_cache;
pub mod unit;
pub mod unit_role;
pub mod user;

pub use staff_cache::{StaffCache, StaffSubscription};
pub use unit::{GroupSet, Unit, UnitRecord};
pub use unit_role::UnitRole;
pub use user::User;
