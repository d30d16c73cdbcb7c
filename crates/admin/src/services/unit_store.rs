//! Process-wide cache of loaded units.
//!
//! Every request for a unit page or mutation shares one [`Unit`] aggregate per
//! unit, so editors and event streams mounted on the same unit observe the same
//! staff cache. Units idle for longer than the configured TTL are evicted and
//! reloaded from the API on next use; [`UnitStore::refresh`] reloads a cached
//! unit in place so its subscribers see server-side changes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use unit_admin_core::UnitId;

use super::ports::{ServiceError, UnitService};
use crate::models::Unit;

/// Loads units once and shares them.
#[derive(Clone)]
pub struct UnitStore {
    units: Cache<UnitId, Arc<Unit>>,
    api: Arc<dyn UnitService>,
}

impl UnitStore {
    #[must_use]
    pub fn new(api: Arc<dyn UnitService>, time_to_idle: Duration) -> Self {
        Self {
            units: Cache::builder()
                .max_capacity(500)
                .time_to_idle(time_to_idle)
                .build(),
            api,
        }
    }

    /// Get a unit, loading it from the API on a miss.
    ///
    /// Concurrent misses for the same unit share one load.
    ///
    /// # Errors
    ///
    /// Returns the API error if the unit cannot be loaded.
    pub async fn get(&self, id: UnitId) -> Result<Arc<Unit>, ServiceError> {
        let api = Arc::clone(&self.api);
        self.units
            .try_get_with(id, async move {
                tracing::debug!(unit_id = %id, "Loading unit");
                let record = api.get_unit(id).await?;
                Ok::<_, ServiceError>(Arc::new(Unit::new(record, api)))
            })
            .await
            .map_err(|e: Arc<ServiceError>| (*e).clone())
    }

    /// Get a unit, reloading it from the API even when cached.
    ///
    /// A cached unit is updated in place, so editors and event streams
    /// already subscribed to it stay attached and observe the changes.
    ///
    /// # Errors
    ///
    /// Returns the API error if the unit cannot be loaded.
    pub async fn refresh(&self, id: UnitId) -> Result<Arc<Unit>, ServiceError> {
        let Some(unit) = self.units.get(&id).await else {
            return self.get(id).await;
        };
        let record = self.api.get_unit(id).await?;
        unit.sync(record);
        Ok(unit)
    }
}

impl std::fmt::Debug for UnitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitStore")
            .field("entries", &self.units.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use unit_admin_core::{StaffRole, SystemRole};

    use super::*;
    use crate::services::memory::{InMemoryBackend, Operation};

    fn store(backend: &Arc<InMemoryBackend>) -> UnitStore {
        UnitStore::new(backend.clone(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_units_are_shared_between_lookups() {
        let backend = Arc::new(InMemoryBackend::seeded());
        let units = store(&backend);

        let first = units.get(UnitId::new(1)).await.unwrap();
        let second = units.get(UnitId::new(1)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.calls(Operation::GetUnit), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let backend = Arc::new(InMemoryBackend::seeded());
        let units = store(&backend);

        backend.fail_next(Operation::GetUnit);
        assert!(units.get(UnitId::new(1)).await.is_err());
        assert!(units.get(UnitId::new(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_unit_is_not_found() {
        let backend = Arc::new(InMemoryBackend::seeded());
        let result = store(&backend).get(UnitId::new(99)).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_reloads_cached_unit_in_place() {
        let backend = Arc::new(InMemoryBackend::seeded());
        let units = store(&backend);

        let cached = units.get(UnitId::new(1)).await.unwrap();
        let mut subscription = cached.staff_cache().subscribe();
        let grace = backend.insert_user("Grace", "Murray", SystemRole::Tutor);
        backend
            .add_staff(UnitId::new(1), grace.id.unwrap(), StaffRole::Tutor)
            .await
            .unwrap();

        let refreshed = units.refresh(UnitId::new(1)).await.unwrap();
        assert!(Arc::ptr_eq(&cached, &refreshed));
        assert_eq!(backend.calls(Operation::GetUnit), 2);
        assert_eq!(subscription.changed().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_loads_uncached_unit_once() {
        let backend = Arc::new(InMemoryBackend::seeded());
        let units = store(&backend);

        units.refresh(UnitId::new(1)).await.unwrap();
        assert_eq!(backend.calls(Operation::GetUnit), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_unit() {
        let backend = Arc::new(InMemoryBackend::seeded());
        let units = store(&backend);

        let cached = units.get(UnitId::new(1)).await.unwrap();
        backend.fail_next(Operation::GetUnit);
        assert!(units.refresh(UnitId::new(1)).await.is_err());
        let again = units.get(UnitId::new(1)).await.unwrap();
        assert!(Arc::ptr_eq(&cached, &again));
    }
}
