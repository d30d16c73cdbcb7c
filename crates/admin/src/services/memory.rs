//! In-memory implementation of the service ports.
//!
//! Serves seeded fixture data when no Doubtfire API is configured, and backs
//! the component and router tests. Failures can be injected per operation with
//! [`InMemoryBackend::fail_next`], and every call is counted so tests can
//! assert that an operation never reached the backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use unit_admin_core::{
    GroupSetId, ProfileMode, StaffRole, SystemRole, UnitId, UnitRoleId, UserId,
};

use super::ports::{ServiceError, UnitRoleService, UnitService, UserService};
use crate::models::{GroupSet, UnitRecord, UnitRole, User};

/// Backend operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetUnit,
    AddStaff,
    ChangeMainConvenor,
    UpdateRole,
    DeleteRole,
    GetTutors,
    GetUser,
    SaveUser,
}

#[derive(Debug, Default)]
struct Store {
    units: HashMap<UnitId, UnitRecord>,
    users: Vec<User>,
    next_id: i64,
    failures: HashSet<Operation>,
    calls: HashMap<Operation, usize>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Count the call and consume an injected failure, if any.
    fn begin(&mut self, op: Operation) -> Result<(), ServiceError> {
        *self.calls.entry(op).or_insert(0) += 1;
        if self.failures.remove(&op) {
            return Err(ServiceError::Api {
                status: 422,
                message: format!("Simulated failure for {op:?}"),
            });
        }
        Ok(())
    }

    fn unit_mut(&mut self, id: UnitId) -> Result<&mut UnitRecord, ServiceError> {
        self.units
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("unit {id}")))
    }

    fn role_mut(&mut self, id: UnitRoleId) -> Result<&mut UnitRole, ServiceError> {
        self.units
            .values_mut()
            .flat_map(|u| u.staff.iter_mut())
            .find(|r| r.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("unit role {id}")))
    }
}

/// Fixture-backed implementation of every service port.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
}

impl InMemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend seeded with one unit (ID 1) and a handful of accounts.
    ///
    /// Unit 1 has Ada Lovelace as main convenor and Alan Turing as tutor.
    /// Grace Hopper and Barbara Liskov are eligible but unassigned; Edsger
    /// Dijkstra is a student and never offered as staff.
    #[must_use]
    pub fn seeded() -> Self {
        let backend = Self::new();
        let ada = backend.insert_user("Ada", "Lovelace", SystemRole::Convenor);
        let alan = backend.insert_user("Alan", "Turing", SystemRole::Tutor);
        backend.insert_user("Grace", "Hopper", SystemRole::Tutor);
        backend.insert_user("Barbara", "Liskov", SystemRole::Admin);
        backend.insert_user("Edsger", "Dijkstra", SystemRole::Student);

        backend.insert_unit(
            UnitId::new(1),
            "SIT101",
            "Introduction to Programming",
            vec![(ada, StaffRole::Convenor), (alan, StaffRole::Tutor)],
            vec![GroupSet {
                id: GroupSetId::new(1),
                name: "Assignment Teams".to_string(),
            }],
        );
        backend
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an account and return it with its new ID.
    pub fn insert_user(&self, first_name: &str, last_name: &str, system_role: SystemRole) -> User {
        let mut store = self.store();
        let id = store.next_id();
        let user = User {
            id: Some(UserId::new(id)),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            username: format!("{first_name}{last_name}").to_lowercase(),
            email: Some(format!("{}@doubtfire.test", first_name.to_lowercase())),
            system_role,
        };
        store.users.push(user.clone());
        user
    }

    /// Add a unit. The first convenor in `staff` becomes main convenor.
    pub fn insert_unit(
        &self,
        id: UnitId,
        code: &str,
        name: &str,
        staff: Vec<(User, StaffRole)>,
        group_sets: Vec<GroupSet>,
    ) {
        let mut store = self.store();
        let staff: Vec<UnitRole> = staff
            .into_iter()
            .map(|(user, role)| UnitRole {
                id: UnitRoleId::new(store.next_id()),
                user,
                role,
            })
            .collect();
        let main_convenor_id = staff
            .iter()
            .find(|r| r.role == StaffRole::Convenor)
            .map(|r| r.id);

        store.units.insert(
            id,
            UnitRecord {
                id,
                code: code.to_string(),
                name: name.to_string(),
                main_convenor_id,
                staff,
                group_sets,
            },
        );
    }

    /// Make the next call to `op` fail with an API error.
    pub fn fail_next(&self, op: Operation) {
        self.store().failures.insert(op);
    }

    /// Number of calls made to `op`, including failed ones.
    #[must_use]
    pub fn calls(&self, op: Operation) -> usize {
        self.store().calls.get(&op).copied().unwrap_or(0)
    }

    /// Current server-side state of a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<UnitRecord> {
        self.store().units.get(&id).cloned()
    }
}

#[async_trait]
impl UnitService for InMemoryBackend {
    async fn get_unit(&self, id: UnitId) -> Result<UnitRecord, ServiceError> {
        let mut store = self.store();
        store.begin(Operation::GetUnit)?;
        store.unit_mut(id).map(|u| u.clone())
    }

    async fn add_staff(
        &self,
        unit: UnitId,
        user: UserId,
        role: StaffRole,
    ) -> Result<UnitRole, ServiceError> {
        let mut store = self.store();
        store.begin(Operation::AddStaff)?;

        let account = store
            .users
            .iter()
            .find(|u| u.id == Some(user))
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("user {user}")))?;
        if !account.system_role.is_staff_eligible() {
            return Err(ServiceError::Api {
                status: 403,
                message: format!("{} does not have a staff account", account.name()),
            });
        }

        let id = UnitRoleId::new(store.next_id());
        let record = store.unit_mut(unit)?;
        if record.staff.iter().any(|r| r.is_for(&account)) {
            return Err(ServiceError::Api {
                status: 422,
                message: format!("{} is already staff on {}", account.name(), record.code),
            });
        }

        let unit_role = UnitRole {
            id,
            user: account,
            role,
        };
        record.staff.push(unit_role.clone());
        Ok(unit_role)
    }

    async fn change_main_convenor(
        &self,
        unit: UnitId,
        unit_role: UnitRoleId,
    ) -> Result<(), ServiceError> {
        let mut store = self.store();
        store.begin(Operation::ChangeMainConvenor)?;

        let record = store.unit_mut(unit)?;
        let is_convenor = record
            .staff
            .iter()
            .any(|r| r.id == unit_role && r.role == StaffRole::Convenor);
        if !is_convenor {
            return Err(ServiceError::Api {
                status: 422,
                message: "The main convenor must be a convenor of the unit".to_string(),
            });
        }
        record.main_convenor_id = Some(unit_role);
        Ok(())
    }
}

#[async_trait]
impl UnitRoleService for InMemoryBackend {
    async fn update(&self, unit_role: &UnitRole) -> Result<UnitRole, ServiceError> {
        let mut store = self.store();
        store.begin(Operation::UpdateRole)?;

        let stored = store.role_mut(unit_role.id)?;
        stored.role = unit_role.role;
        Ok(stored.clone())
    }

    async fn delete(&self, unit_role: &UnitRole) -> Result<(), ServiceError> {
        let mut store = self.store();
        store.begin(Operation::DeleteRole)?;

        let record = store
            .units
            .values_mut()
            .find(|u| u.staff.iter().any(|r| r.id == unit_role.id))
            .ok_or_else(|| ServiceError::NotFound(format!("unit role {}", unit_role.id)))?;
        if record.main_convenor_id == Some(unit_role.id) {
            return Err(ServiceError::Api {
                status: 422,
                message: "Cannot remove the main convenor".to_string(),
            });
        }
        record.staff.retain(|r| r.id != unit_role.id);
        Ok(())
    }
}

#[async_trait]
impl UserService for InMemoryBackend {
    async fn get_tutors(&self) -> Result<Vec<User>, ServiceError> {
        let mut store = self.store();
        store.begin(Operation::GetTutors)?;
        Ok(store.users.clone())
    }

    async fn get_user(&self, id: UserId) -> Result<User, ServiceError> {
        let mut store = self.store();
        store.begin(Operation::GetUser)?;
        store
            .users
            .iter()
            .find(|u| u.id == Some(id))
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("user {id}")))
    }

    async fn save_user(&self, user: &User, mode: ProfileMode) -> Result<User, ServiceError> {
        let mut store = self.store();
        store.begin(Operation::SaveUser)?;

        if mode.creates_account() {
            let mut created = user.clone();
            created.id = Some(UserId::new(store.next_id()));
            store.users.push(created.clone());
            return Ok(created);
        }

        let id = user
            .id
            .ok_or_else(|| ServiceError::Invalid("cannot edit an unsaved user".to_string()))?;
        let stored = store
            .users
            .iter_mut()
            .find(|u| u.id == Some(id))
            .ok_or_else(|| ServiceError::NotFound(format!("user {id}")))?;
        *stored = user.clone();
        Ok(stored.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_unit_has_main_convenor() {
        let backend = InMemoryBackend::seeded();
        let unit = backend.get_unit(UnitId::new(1)).await.unwrap();
        assert_eq!(unit.code, "SIT101");
        assert_eq!(unit.staff.len(), 2);
        let main = unit.main_convenor_id.unwrap();
        let convenor = unit.staff.iter().find(|r| r.id == main).unwrap();
        assert_eq!(convenor.user.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_fail_next_fails_exactly_once() {
        let backend = InMemoryBackend::seeded();
        backend.fail_next(Operation::GetTutors);
        assert!(backend.get_tutors().await.is_err());
        assert!(backend.get_tutors().await.is_ok());
        assert_eq!(backend.calls(Operation::GetTutors), 2);
    }

    #[tokio::test]
    async fn test_add_staff_rejects_duplicates_and_students() {
        let backend = InMemoryBackend::seeded();
        let users = backend.get_tutors().await.unwrap();
        let alan = users.iter().find(|u| u.first_name == "Alan").unwrap();
        let edsger = users.iter().find(|u| u.first_name == "Edsger").unwrap();

        let duplicate = backend
            .add_staff(UnitId::new(1), alan.id.unwrap(), StaffRole::Tutor)
            .await;
        assert!(matches!(duplicate, Err(ServiceError::Api { status: 422, .. })));

        let student = backend
            .add_staff(UnitId::new(1), edsger.id.unwrap(), StaffRole::Tutor)
            .await;
        assert!(matches!(student, Err(ServiceError::Api { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_main_convenor_cannot_be_deleted() {
        let backend = InMemoryBackend::seeded();
        let unit = backend.unit(UnitId::new(1)).unwrap();
        let main = unit
            .staff
            .iter()
            .find(|r| Some(r.id) == unit.main_convenor_id)
            .unwrap();
        assert!(backend.delete(main).await.is_err());
        assert_eq!(backend.unit(UnitId::new(1)).unwrap().staff.len(), 2);
    }

    #[tokio::test]
    async fn test_save_user_creates_then_updates() {
        let backend = InMemoryBackend::new();
        let mut user = User::unsaved("Margaret Hamilton");
        user.system_role = SystemRole::Tutor;

        let created = backend.save_user(&user, ProfileMode::Create).await.unwrap();
        assert!(created.is_persisted());

        let mut edited = created.clone();
        edited.email = Some("margaret@doubtfire.test".to_string());
        let saved = backend.save_user(&edited, ProfileMode::Edit).await.unwrap();
        assert_eq!(saved.email.as_deref(), Some("margaret@doubtfire.test"));

        let unsaved = backend.save_user(&user, ProfileMode::Edit).await;
        assert!(matches!(unsaved, Err(ServiceError::Invalid(_))));
    }
}
