//! Unit aggregate.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::instrument;
use unit_admin_core::{GroupSetId, StaffRole, UnitId, UnitRoleId};

use super::staff_cache::StaffCache;
use super::unit_role::UnitRole;
use super::user::User;
use crate::services::{ServiceError, UnitService};

/// A named set of groups students can form for group work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSet {
    pub id: GroupSetId,
    pub name: String,
}

/// A unit as loaded from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    pub id: UnitId,
    /// Unit code, e.g. "SIT101".
    pub code: String,
    pub name: String,
    /// Staff assignment of the main convenor.
    pub main_convenor_id: Option<UnitRoleId>,
    pub staff: Vec<UnitRole>,
    pub group_sets: Vec<GroupSet>,
}

/// A unit and its live staff cache.
///
/// Shared (behind `Arc`) by every editor mounted on the unit. Mutations go to
/// the API first and are mirrored into the cache once they succeed. Staff
/// subscribers are also woken when the main convenor changes, since it is
/// shown on the staff rows.
pub struct Unit {
    id: UnitId,
    code: String,
    name: String,
    main_convenor: RwLock<Option<UnitRoleId>>,
    staff_cache: StaffCache,
    group_sets_cache: RwLock<HashMap<GroupSetId, GroupSet>>,
    api: Arc<dyn UnitService>,
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("code", &self.code)
            .field("main_convenor", &self.main_convenor_id())
            .field("staff", &self.staff_cache.values().len())
            .finish_non_exhaustive()
    }
}

impl Unit {
    /// Build the aggregate from a loaded record.
    #[must_use]
    pub fn new(record: UnitRecord, api: Arc<dyn UnitService>) -> Self {
        Self {
            id: record.id,
            code: record.code,
            name: record.name,
            main_convenor: RwLock::new(record.main_convenor_id),
            staff_cache: StaffCache::new(record.staff),
            group_sets_cache: RwLock::new(index_group_sets(record.group_sets)),
            api,
        }
    }

    /// Bring the cached state in line with a freshly loaded record.
    ///
    /// Staff subscribers are woken if the staff list or the main convenor
    /// changed.
    pub fn sync(&self, record: UnitRecord) {
        let convenor_changed = {
            let mut current = self
                .main_convenor
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let changed = *current != record.main_convenor_id;
            *current = record.main_convenor_id;
            changed
        };
        *self
            .group_sets_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner) = index_group_sets(record.group_sets);

        let staff_changed = self.staff_cache.replace(record.staff);
        if convenor_changed && !staff_changed {
            self.staff_cache.touch();
        }
        tracing::debug!(unit_id = %self.id, staff_changed, convenor_changed, "Unit synced");
    }

    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Staff assignment of the current main convenor.
    #[must_use]
    pub fn main_convenor_id(&self) -> Option<UnitRoleId> {
        *self
            .main_convenor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn staff_cache(&self) -> &StaffCache {
        &self.staff_cache
    }

    /// Look up a group set by ID.
    #[must_use]
    pub fn group_set(&self, id: GroupSetId) -> Option<GroupSet> {
        self.group_sets_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// All group sets, ordered by ID.
    #[must_use]
    pub fn group_sets(&self) -> Vec<GroupSet> {
        let mut sets: Vec<_> = self
            .group_sets_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        sets.sort_by_key(|g| g.id.as_i64());
        sets
    }

    /// Assign a user to the unit as a tutor.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` if the user has no persisted ID, or the
    /// API error if the assignment is rejected.
    #[instrument(skip(self, user), fields(unit_id = %self.id, user_id = ?user.id))]
    pub async fn add_staff(&self, user: &User) -> Result<UnitRole, ServiceError> {
        let user_id = user
            .id
            .ok_or_else(|| ServiceError::Invalid("user has not been saved".to_string()))?;

        let role = self.api.add_staff(self.id, user_id, StaffRole::Tutor).await?;
        self.staff_cache.upsert(role.clone());
        tracing::info!(unit_role_id = %role.id, "Staff member added");
        Ok(role)
    }

    /// Make a staff member the unit's main convenor.
    ///
    /// # Errors
    ///
    /// Returns the API error if the change is rejected.
    #[instrument(skip(self, unit_role), fields(unit_id = %self.id, unit_role_id = %unit_role.id))]
    pub async fn change_main_convenor(&self, unit_role: &UnitRole) -> Result<(), ServiceError> {
        self.api.change_main_convenor(self.id, unit_role.id).await?;
        *self
            .main_convenor
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(unit_role.id);
        self.staff_cache.touch();
        tracing::info!("Main convenor changed");
        Ok(())
    }
}

fn index_group_sets(group_sets: Vec<GroupSet>) -> HashMap<GroupSetId, GroupSet> {
    group_sets.into_iter().map(|g| (g.id, g)).collect()
}
