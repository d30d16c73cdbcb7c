//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::services::{Backend, UnitStore};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    backend: Backend,
    units: UnitStore,
}

impl AppState {
    /// Build state over a backend. Loaded units stay shared until idle for
    /// `unit_cache_ttl`.
    #[must_use]
    pub fn new(backend: Backend, unit_cache_ttl: Duration) -> Self {
        let units = UnitStore::new(backend.units.clone(), unit_cache_ttl);
        Self {
            inner: Arc::new(AppStateInner { backend, units }),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    #[must_use]
    pub fn units(&self) -> &UnitStore {
        &self.inner.units
    }
}
