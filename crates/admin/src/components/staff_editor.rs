//! Staff management editor for a unit.
//!
//! A [`StaffEditor`] is mounted on a shared [`Unit`] and drives the staff
//! panel: listing staff, autocompleting tutors to add, changing roles, picking
//! the main convenor and removing staff. Every remote call reports its outcome
//! through the [`Notifier`]; failures never leave the editor unusable.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;
use unit_admin_core::{GroupSetId, StaffRole, UnitRoleId, UserId};

use crate::models::{StaffSubscription, Unit, UnitRole, User};
use crate::services::{
    ERROR_DURATION, Notifier, SUCCESS_DURATION, ServiceError, UnitRoleService, UserService,
};

/// Label for an ID with no group set.
pub const INDIVIDUAL_WORK: &str = "Individual Work";

/// Shown when the selected candidate has no Doubtfire account.
pub const MISSING_ACCOUNT_MESSAGE: &str =
    "Unable to add staff member. Ensure they have a tutor or convenor account in User admin first.";

/// Errors returned by editor operations.
///
/// By the time one of these is returned the operator has already been
/// notified (except for [`StaffEditorError::UnknownStaff`]).
#[derive(Debug, Error)]
pub enum StaffEditorError {
    /// The selected candidate has no persisted account.
    #[error("selected staff member has no account")]
    MissingIdentity,

    /// No staff assignment with this ID on the unit.
    #[error("unknown staff assignment {0}")]
    UnknownStaff(UnitRoleId),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Autocomplete state: the typed text and the chosen candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub query: String,
    /// A tutor picked from the suggestions, or the typed text as an unsaved
    /// user when nothing was picked.
    pub candidate: Option<User>,
}

/// Editor over one unit's staff.
pub struct StaffEditor {
    unit: Arc<Unit>,
    roles: Arc<dyn UnitRoleService>,
    notifier: Arc<dyn Notifier>,
    staff: Option<StaffSubscription>,
    tutors: Vec<User>,
    selection: Selection,
}

impl std::fmt::Debug for StaffEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaffEditor")
            .field("unit", &self.unit.id())
            .field("mounted", &self.staff.is_some())
            .field("tutors", &self.tutors.len())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl StaffEditor {
    /// Attach an editor to a unit without loading the tutor directory.
    ///
    /// Enough for role, main convenor and removal operations; suggestions
    /// stay empty until [`StaffEditor::load_tutors`] runs.
    #[must_use]
    pub fn attach(
        unit: Arc<Unit>,
        roles: Arc<dyn UnitRoleService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let staff = Some(unit.staff_cache().subscribe());
        Self {
            unit,
            roles,
            notifier,
            staff,
            tutors: Vec::new(),
            selection: Selection::default(),
        }
    }

    /// Mount an editor on a unit.
    ///
    /// Subscribes to the unit's staff cache and loads the tutor directory
    /// once.
    #[instrument(skip_all, fields(unit_id = %unit.id()))]
    pub async fn mount(
        unit: Arc<Unit>,
        users: &dyn UserService,
        roles: Arc<dyn UnitRoleService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut editor = Self::attach(unit, roles, notifier);
        editor.load_tutors(users).await;
        editor
    }

    /// Load the tutor directory, keeping only accounts allowed to hold a
    /// staff role. A failed lookup is notified and leaves the list empty.
    pub async fn load_tutors(&mut self, users: &dyn UserService) {
        self.tutors = match users.get_tutors().await {
            Ok(users) => users
                .into_iter()
                .filter(|u| u.system_role.is_staff_eligible())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load tutors");
                self.notifier.error(&e.to_string(), ERROR_DURATION);
                Vec::new()
            }
        };
    }

    #[must_use]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Current staff of the unit. Empty once disposed.
    #[must_use]
    pub fn unit_staff(&self) -> Vec<UnitRole> {
        self.staff
            .as_ref()
            .map(StaffSubscription::current)
            .unwrap_or_default()
    }

    /// Staff-eligible accounts.
    #[must_use]
    pub fn tutors(&self) -> &[User] {
        &self.tutors
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Record typed text. The candidate becomes the text as an unsaved user.
    pub fn set_query(&mut self, query: &str) {
        self.selection.query = query.to_string();
        self.selection.candidate = if query.is_empty() {
            None
        } else {
            Some(User::unsaved(query))
        };
    }

    /// Pick a tutor from the directory. Returns `false` if there is no such
    /// eligible tutor, leaving the selection unchanged.
    pub fn select_tutor(&mut self, id: UserId) -> bool {
        let Some(tutor) = self.tutors.iter().find(|t| t.id == Some(id)) else {
            return false;
        };
        self.selection = Selection {
            query: tutor.name(),
            candidate: Some(tutor.clone()),
        };
        true
    }

    /// Tutors whose name contains the typed text (ignoring case) and who are
    /// not already staff. The text is matched as typed, spaces included.
    #[must_use]
    pub fn suggestions(&self) -> Vec<&User> {
        let needle = self.selection.query.to_lowercase();
        let staff = self.unit_staff();
        self.tutors
            .iter()
            .filter(|t| needle.is_empty() || t.name_contains(&needle))
            .filter(|t| Self::not_in(&staff, t))
            .collect()
    }

    /// Whether `candidate` is not yet on the unit's staff.
    #[must_use]
    pub fn filter_staff(&self, candidate: &User) -> bool {
        Self::not_in(&self.unit_staff(), candidate)
    }

    fn not_in(staff: &[UnitRole], candidate: &User) -> bool {
        !staff.iter().any(|r| r.user.id == candidate.id)
    }

    /// Change a staff member's role.
    ///
    /// The cached entry is updated before the request; if the request fails
    /// the error is notified and the previous role restored.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStaff` if the assignment is not on the unit, or the
    /// service error if the update was rejected.
    #[instrument(skip(self), fields(unit_id = %self.unit.id()))]
    pub async fn change_role(
        &self,
        id: UnitRoleId,
        role: StaffRole,
    ) -> Result<UnitRole, StaffEditorError> {
        let cache = self.unit.staff_cache();
        let previous = cache
            .set_role(id, role)
            .ok_or(StaffEditorError::UnknownStaff(id))?;
        let updated = cache.get(id).ok_or(StaffEditorError::UnknownStaff(id))?;

        match self.roles.update(&updated).await {
            Ok(saved) => {
                self.notifier.success("Role changed", SUCCESS_DURATION);
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Role change failed");
                self.notifier.error(&e.to_string(), ERROR_DURATION);
                cache.set_role(id, previous);
                Err(e.into())
            }
        }
    }

    /// Make a staff member the main convenor.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStaff` if the assignment is not on the unit, or the
    /// service error if the change was rejected.
    #[instrument(skip(self), fields(unit_id = %self.unit.id()))]
    pub async fn change_main_convenor(&self, id: UnitRoleId) -> Result<(), StaffEditorError> {
        let candidate = self
            .unit
            .staff_cache()
            .get(id)
            .ok_or(StaffEditorError::UnknownStaff(id))?;

        self.report(
            self.unit.change_main_convenor(&candidate).await,
            "Change main convenor",
            "Main convenor changed",
        )
    }

    /// Add the selected candidate to the unit as a tutor.
    ///
    /// A candidate without an account is rejected before any request. The
    /// selection is cleared only when the add succeeds.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentity` for a candidate without an account, or the
    /// service error if the add was rejected.
    #[instrument(skip(self), fields(unit_id = %self.unit.id()))]
    pub async fn add_selected_staff(&mut self) -> Result<UnitRole, StaffEditorError> {
        let Some(candidate) = self
            .selection
            .candidate
            .as_ref()
            .filter(|c| c.is_persisted())
        else {
            self.notifier.error(MISSING_ACCOUNT_MESSAGE, ERROR_DURATION);
            return Err(StaffEditorError::MissingIdentity);
        };

        let added = self.unit.add_staff(candidate).await;
        match added {
            Ok(role) => {
                self.notifier.success("Staff member added", SUCCESS_DURATION);
                self.selection = Selection::default();
                Ok(role)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Add staff failed");
                self.notifier.error(&e.to_string(), ERROR_DURATION);
                Err(e.into())
            }
        }
    }

    /// Remove a staff member from the unit.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStaff` if the assignment is not on the unit, or the
    /// service error if the deletion was rejected.
    #[instrument(skip(self), fields(unit_id = %self.unit.id()))]
    pub async fn remove_staff(&self, id: UnitRoleId) -> Result<(), StaffEditorError> {
        let unit_role = self
            .unit
            .staff_cache()
            .get(id)
            .ok_or(StaffEditorError::UnknownStaff(id))?;

        self.report(
            self.roles
                .delete_cached(&unit_role, self.unit.staff_cache())
                .await,
            "Remove staff",
            "Staff member removed",
        )
    }

    /// Name of a group set, or "Individual Work" for unknown IDs.
    #[must_use]
    pub fn group_set_name(&self, id: GroupSetId) -> String {
        self.unit
            .group_set(id)
            .map_or_else(|| INDIVIDUAL_WORK.to_string(), |g| g.name)
    }

    /// Release the staff subscription.
    pub fn dispose(&mut self) {
        if self.staff.take().is_some() {
            tracing::debug!(unit_id = %self.unit.id(), "Staff editor disposed");
        }
    }

    fn report(
        &self,
        result: Result<(), ServiceError>,
        operation: &str,
        success: &str,
    ) -> Result<(), StaffEditorError> {
        match result {
            Ok(()) => {
                self.notifier.success(success, SUCCESS_DURATION);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, operation, "Staff operation failed");
                self.notifier.error(&e.to_string(), ERROR_DURATION);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use unit_admin_core::{SystemRole, UnitId};

    use super::*;
    use crate::models::GroupSet;
    use crate::services::{
        InMemoryBackend, NotificationKind, NotificationQueue, Operation, UnitService,
    };

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        notifications: Arc<NotificationQueue>,
        editor: StaffEditor,
    }

    async fn mount(backend: InMemoryBackend) -> Fixture {
        let backend = Arc::new(backend);
        let record = backend.get_unit(UnitId::new(1)).await.unwrap();
        let unit = Arc::new(Unit::new(record, backend.clone()));
        let notifications = Arc::new(NotificationQueue::new());
        let editor = StaffEditor::mount(
            unit,
            backend.as_ref(),
            backend.clone(),
            notifications.clone(),
        )
        .await;
        Fixture {
            backend,
            notifications,
            editor,
        }
    }

    /// Unit 1 with staff [A as Tutor]; directory [A, B, C].
    fn abc_backend() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        let a = backend.insert_user("A", "", SystemRole::Tutor);
        backend.insert_user("B", "", SystemRole::Tutor);
        backend.insert_user("C", "", SystemRole::Convenor);
        backend.insert_user("S", "", SystemRole::Student);
        backend.insert_unit(
            UnitId::new(1),
            "SIT102",
            "Programming",
            vec![(a, StaffRole::Tutor)],
            vec![GroupSet {
                id: GroupSetId::new(9),
                name: "Project Teams".to_string(),
            }],
        );
        backend
    }

    fn last(queue: &NotificationQueue) -> (NotificationKind, String, u64) {
        let n = queue.snapshot().pop().unwrap();
        (n.kind, n.message, n.duration_ms)
    }

    fn names(users: &[&User]) -> Vec<String> {
        users.iter().map(|u| u.name()).collect()
    }

    #[tokio::test]
    async fn test_typing_b_suggests_only_b() {
        let mut f = mount(abc_backend()).await;
        f.editor.set_query("b");
        assert_eq!(names(&f.editor.suggestions()), vec!["B"]);
    }

    #[tokio::test]
    async fn test_empty_query_offers_eligible_tutors_minus_staff() {
        let f = mount(abc_backend()).await;
        assert_eq!(names(&f.editor.suggestions()), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_unmatched_query_yields_no_suggestions() {
        let mut f = mount(abc_backend()).await;
        f.editor.set_query("zzz");
        assert!(f.editor.suggestions().is_empty());
    }

    #[tokio::test]
    async fn test_query_is_matched_as_typed() {
        let backend = InMemoryBackend::seeded();
        let mut f = mount(backend).await;

        f.editor.set_query("  ");
        assert!(f.editor.suggestions().is_empty());

        f.editor.set_query("grace ");
        assert!(f.editor.suggestions().is_empty());

        f.editor.set_query("e h");
        assert_eq!(names(&f.editor.suggestions()), vec!["Grace Hopper"]);
    }

    #[tokio::test]
    async fn test_attached_editor_skips_tutor_directory() {
        let backend = Arc::new(abc_backend());
        backend.fail_next(Operation::GetTutors);
        let record = backend.get_unit(UnitId::new(1)).await.unwrap();
        let unit = Arc::new(Unit::new(record, backend.clone()));
        let notifications = Arc::new(NotificationQueue::new());

        let editor = StaffEditor::attach(unit, backend.clone(), notifications.clone());
        assert_eq!(backend.calls(Operation::GetTutors), 0);
        assert!(editor.tutors().is_empty());
        assert_eq!(editor.unit_staff().len(), 1);

        let a = editor.unit_staff().first().unwrap().id;
        editor.remove_staff(a).await.unwrap();
        let kinds: Vec<_> = notifications.snapshot().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Success]);
    }

    #[tokio::test]
    async fn test_students_are_not_offered() {
        let f = mount(abc_backend()).await;
        assert!(f.editor.tutors().iter().all(|t| t.name() != "S"));
    }

    #[tokio::test]
    async fn test_filter_staff() {
        let f = mount(abc_backend()).await;
        for tutor in f.editor.tutors() {
            let on_staff = f.editor.unit_staff().iter().any(|r| r.is_for(tutor));
            assert_eq!(f.editor.filter_staff(tutor), !on_staff);
        }
        assert!(f.editor.filter_staff(&User::unsaved("Nobody")));
    }

    #[tokio::test]
    async fn test_failed_tutor_lookup_notifies_and_leaves_list_empty() {
        let backend = abc_backend();
        backend.fail_next(Operation::GetTutors);
        let f = mount(backend).await;
        assert!(f.editor.tutors().is_empty());
        assert_eq!(last(&f.notifications).0, NotificationKind::Error);
        assert_eq!(f.editor.unit_staff().len(), 1);
    }

    #[tokio::test]
    async fn test_group_set_name() {
        let f = mount(abc_backend()).await;
        assert_eq!(f.editor.group_set_name(GroupSetId::new(9)), "Project Teams");
        assert_eq!(f.editor.group_set_name(GroupSetId::new(10)), INDIVIDUAL_WORK);
    }

    #[tokio::test]
    async fn test_change_role_applies_and_notifies() {
        let f = mount(abc_backend()).await;
        let a = f.editor.unit_staff().first().unwrap().id;

        let saved = f.editor.change_role(a, StaffRole::Convenor).await.unwrap();
        assert_eq!(saved.role, StaffRole::Convenor);
        assert_eq!(saved.role_id(), 3);

        let cached = f.editor.unit_staff().first().unwrap().clone();
        assert_eq!(cached.role, StaffRole::Convenor);
        assert_eq!(cached.role_id(), 3);
        assert_eq!(
            last(&f.notifications),
            (NotificationKind::Success, "Role changed".to_string(), 2000)
        );
    }

    #[tokio::test]
    async fn test_failed_role_change_notifies_then_rolls_back() {
        let f = mount(abc_backend()).await;
        let a = f.editor.unit_staff().first().unwrap().id;
        f.backend.fail_next(Operation::UpdateRole);

        let result = f.editor.change_role(a, StaffRole::Convenor).await;
        assert!(matches!(result, Err(StaffEditorError::Service(_))));

        let cached = f.editor.unit_staff().first().unwrap().clone();
        assert_eq!(cached.role, StaffRole::Tutor);
        assert_eq!(cached.role_id(), 2);
        let (kind, _, duration) = last(&f.notifications);
        assert_eq!((kind, duration), (NotificationKind::Error, 6000));
    }

    #[tokio::test]
    async fn test_change_role_on_unknown_staff() {
        let f = mount(abc_backend()).await;
        let result = f.editor.change_role(UnitRoleId::new(999), StaffRole::Tutor).await;
        assert!(matches!(result, Err(StaffEditorError::UnknownStaff(_))));
        assert_eq!(f.backend.calls(Operation::UpdateRole), 0);
    }

    #[tokio::test]
    async fn test_add_without_account_never_calls_service() {
        let mut f = mount(abc_backend()).await;
        f.editor.set_query("Someone New");

        let result = f.editor.add_selected_staff().await;
        assert!(matches!(result, Err(StaffEditorError::MissingIdentity)));
        assert_eq!(f.backend.calls(Operation::AddStaff), 0);
        assert_eq!(
            last(&f.notifications),
            (NotificationKind::Error, MISSING_ACCOUNT_MESSAGE.to_string(), 6000)
        );
        // Selection kept for another attempt
        assert_eq!(f.editor.selection().query, "Someone New");
    }

    #[tokio::test]
    async fn test_add_with_nothing_selected_shows_same_message() {
        let mut f = mount(abc_backend()).await;
        assert!(f.editor.add_selected_staff().await.is_err());
        assert_eq!(last(&f.notifications).1, MISSING_ACCOUNT_MESSAGE);
        assert_eq!(f.backend.calls(Operation::AddStaff), 0);
    }

    #[tokio::test]
    async fn test_add_selected_staff_adds_tutor_and_clears_selection() {
        let mut f = mount(abc_backend()).await;
        let b = f.editor.suggestions().first().unwrap().id.unwrap();
        assert!(f.editor.select_tutor(b));

        let role = f.editor.add_selected_staff().await.unwrap();
        assert_eq!(role.role, StaffRole::Tutor);
        assert_eq!(f.editor.unit_staff().len(), 2);
        assert_eq!(f.editor.selection(), &Selection::default());
        assert_eq!(names(&f.editor.suggestions()), vec!["C"]);
        assert_eq!(last(&f.notifications).1, "Staff member added");
    }

    #[tokio::test]
    async fn test_failed_add_keeps_selection() {
        let mut f = mount(abc_backend()).await;
        let b = f.editor.suggestions().first().unwrap().id.unwrap();
        f.editor.select_tutor(b);
        f.backend.fail_next(Operation::AddStaff);

        assert!(f.editor.add_selected_staff().await.is_err());
        assert_eq!(f.editor.selection().query, "B");
        assert_eq!(f.editor.unit_staff().len(), 1);
        assert_eq!(last(&f.notifications).0, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_select_unknown_tutor_is_rejected() {
        let mut f = mount(abc_backend()).await;
        assert!(!f.editor.select_tutor(UserId::new(12345)));
        assert!(f.editor.selection().candidate.is_none());
    }

    #[tokio::test]
    async fn test_change_main_convenor() {
        let f = mount(InMemoryBackend::seeded()).await;
        let staff = f.editor.unit_staff();
        let tutor = staff.iter().find(|r| r.role == StaffRole::Tutor).unwrap().id;

        // The backend only accepts convenors
        assert!(f.editor.change_main_convenor(tutor).await.is_err());
        assert_eq!(last(&f.notifications).0, NotificationKind::Error);

        f.editor.change_role(tutor, StaffRole::Convenor).await.unwrap();
        f.editor.change_main_convenor(tutor).await.unwrap();
        assert_eq!(f.editor.unit().main_convenor_id(), Some(tutor));
        assert_eq!(last(&f.notifications).1, "Main convenor changed");
    }

    #[tokio::test]
    async fn test_remove_staff_evicts_from_cache() {
        let f = mount(InMemoryBackend::seeded()).await;
        let tutor = f
            .editor
            .unit_staff()
            .iter()
            .find(|r| r.role == StaffRole::Tutor)
            .unwrap()
            .id;

        f.editor.remove_staff(tutor).await.unwrap();
        assert_eq!(f.editor.unit_staff().len(), 1);
        assert_eq!(last(&f.notifications).1, "Staff member removed");
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_entry() {
        let f = mount(InMemoryBackend::seeded()).await;
        let main = f.editor.unit().main_convenor_id().unwrap();

        assert!(f.editor.remove_staff(main).await.is_err());
        assert_eq!(f.editor.unit_staff().len(), 2);
        assert_eq!(last(&f.notifications).0, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_dispose_releases_subscription() {
        let mut f = mount(abc_backend()).await;
        let cache_subscribers = f.editor.unit().staff_cache().subscriber_count();
        assert_eq!(cache_subscribers, 1);

        f.editor.dispose();
        assert_eq!(f.editor.unit().staff_cache().subscriber_count(), 0);
        assert!(f.editor.unit_staff().is_empty());
    }
}
