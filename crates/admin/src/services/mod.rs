//! Service layer for the admin panel.
//!
//! # Services
//!
//! - `ports` - Traits the components talk to, plus [`ServiceError`]
//! - `memory` - Seeded in-memory backend for local development and tests
//! - `notifications` - Operator toasts delivered via `HX-Trigger`
//! - `unit_store` - Shared cache of loaded unit aggregates

pub mod memory;
pub mod notifications;
pub mod ports;
pub mod unit_store;

pub use memory::{InMemoryBackend, Operation};
pub use notifications::{
    ERROR_DURATION, Notification, NotificationKind, NotificationQueue, Notifier, SUCCESS_DURATION,
};
pub use ports::{Backend, ServiceError, UnitRoleService, UnitService, UserService};
pub use unit_store::UnitStore;
