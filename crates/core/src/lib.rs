//! Unit Admin Core - Shared types library.
//!
//! This crate provides the types shared by the unit staff admin panel:
//! - `admin` - Staff editor and profile dialogs (axum + askama)
//! - `integration-tests` - Router-level tests against in-memory fixtures
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps it
//! lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, staff and system roles,
//!   and profile dialog modes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
