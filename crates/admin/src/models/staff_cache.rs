//! Observable cache of a unit's staff assignments.
//!
//! The cache is a `tokio::sync::watch` channel. The owning [`Unit`] holds the
//! sender; every editor or event stream holds a [`StaffSubscription`]. Dropping
//! the subscription is the only way to stop observing, so nothing is delivered
//! to a view after it is gone.
//!
//! [`Unit`]: super::Unit

use tokio::sync::watch;
use unit_admin_core::{StaffRole, UnitRoleId};

use super::unit_role::UnitRole;

/// Locally held mirror of a unit's current staff assignments.
#[derive(Debug)]
pub struct StaffCache {
    tx: watch::Sender<Vec<UnitRole>>,
}

impl StaffCache {
    /// Create a cache seeded with the staff loaded from the API.
    #[must_use]
    pub fn new(staff: Vec<UnitRole>) -> Self {
        let (tx, _rx) = watch::channel(staff);
        Self { tx }
    }

    /// Snapshot of the current staff list.
    #[must_use]
    pub fn values(&self) -> Vec<UnitRole> {
        self.tx.borrow().clone()
    }

    /// Look up a single assignment.
    #[must_use]
    pub fn get(&self, id: UnitRoleId) -> Option<UnitRole> {
        self.tx.borrow().iter().find(|r| r.id == id).cloned()
    }

    /// Start observing the cache.
    #[must_use]
    pub fn subscribe(&self) -> StaffSubscription {
        StaffSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Insert an assignment, replacing any entry with the same ID.
    pub fn upsert(&self, role: UnitRole) {
        self.tx.send_modify(|staff| {
            if let Some(existing) = staff.iter_mut().find(|r| r.id == role.id) {
                *existing = role;
            } else {
                staff.push(role);
            }
        });
    }

    /// Remove an assignment. Returns the removed entry, if any.
    pub fn remove(&self, id: UnitRoleId) -> Option<UnitRole> {
        let mut removed = None;
        self.tx.send_if_modified(|staff| {
            let index = staff.iter().position(|r| r.id == id);
            removed = index.map(|i| staff.remove(i));
            removed.is_some()
        });
        removed
    }

    /// Replace the whole list with a fresh copy from the API. Subscribers are
    /// only woken if something changed.
    pub fn replace(&self, staff: Vec<UnitRole>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == staff {
                return false;
            }
            *current = staff;
            true
        })
    }

    /// Wake subscribers without changing the list.
    pub fn touch(&self) {
        self.tx.send_modify(|_| {});
    }

    /// Set the role of an assignment. Returns the role it had before.
    pub fn set_role(&self, id: UnitRoleId, role: StaffRole) -> Option<StaffRole> {
        let mut previous = None;
        self.tx.send_if_modified(|staff| {
            let Some(entry) = staff.iter_mut().find(|r| r.id == id) else {
                return false;
            };
            previous = Some(entry.role);
            entry.role = role;
            true
        });
        previous
    }
}

/// A live view of a [`StaffCache`].
///
/// Released when dropped.
#[derive(Debug)]
pub struct StaffSubscription {
    rx: watch::Receiver<Vec<UnitRole>>,
}

impl StaffSubscription {
    /// The staff list as of the latest update.
    #[must_use]
    pub fn current(&self) -> Vec<UnitRole> {
        self.rx.borrow().clone()
    }

    /// Wait for the next update.
    ///
    /// Returns `None` once the owning unit has been dropped.
    pub async fn changed(&mut self) -> Option<Vec<UnitRole>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use unit_admin_core::{SystemRole, UserId};

    use super::*;
    use crate::models::User;

    fn role(id: i64, name: &str, role: StaffRole) -> UnitRole {
        let mut user = User::unsaved(name);
        user.id = Some(UserId::new(id));
        user.system_role = SystemRole::Tutor;
        UnitRole {
            id: UnitRoleId::new(id),
            user,
            role,
        }
    }

    #[test]
    fn test_set_role_returns_previous_role() {
        let cache = StaffCache::new(vec![role(1, "Ada Lovelace", StaffRole::Tutor)]);
        let previous = cache.set_role(UnitRoleId::new(1), StaffRole::Convenor);
        assert_eq!(previous, Some(StaffRole::Tutor));
        assert_eq!(
            cache.get(UnitRoleId::new(1)).unwrap().role,
            StaffRole::Convenor
        );
    }

    #[test]
    fn test_set_role_on_unknown_entry_is_a_no_op() {
        let cache = StaffCache::new(vec![]);
        assert_eq!(cache.set_role(UnitRoleId::new(5), StaffRole::Tutor), None);
    }

    #[test]
    fn test_upsert_replaces_existing_entry() {
        let cache = StaffCache::new(vec![role(1, "Ada Lovelace", StaffRole::Tutor)]);
        cache.upsert(role(1, "Ada Lovelace", StaffRole::Convenor));
        cache.upsert(role(2, "Alan Turing", StaffRole::Tutor));
        let staff = cache.values();
        assert_eq!(staff.len(), 2);
        assert_eq!(staff.first().unwrap().role, StaffRole::Convenor);
    }

    #[test]
    fn test_remove_returns_removed_entry() {
        let cache = StaffCache::new(vec![role(1, "Ada Lovelace", StaffRole::Tutor)]);
        assert!(cache.remove(UnitRoleId::new(1)).is_some());
        assert!(cache.remove(UnitRoleId::new(1)).is_none());
        assert!(cache.values().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_observes_updates() {
        let cache = StaffCache::new(vec![]);
        let mut subscription = cache.subscribe();
        assert_eq!(cache.subscriber_count(), 1);

        cache.upsert(role(3, "Edsger Dijkstra", StaffRole::Tutor));
        let staff = subscription.changed().await.unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(subscription.current().len(), 1);

        drop(subscription);
        assert_eq!(cache.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_wakes_subscribers_only_on_change() {
        let cache = StaffCache::new(vec![role(1, "Ada Lovelace", StaffRole::Tutor)]);
        let mut subscription = cache.subscribe();

        assert!(!cache.replace(vec![role(1, "Ada Lovelace", StaffRole::Tutor)]));
        assert!(cache.replace(vec![
            role(1, "Ada Lovelace", StaffRole::Tutor),
            role(2, "Alan Turing", StaffRole::Tutor),
        ]));
        assert_eq!(subscription.changed().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_touch_wakes_subscribers() {
        let cache = StaffCache::new(vec![role(1, "Ada Lovelace", StaffRole::Tutor)]);
        let mut subscription = cache.subscribe();

        cache.touch();
        let staff = tokio::time::timeout(std::time::Duration::from_secs(1), subscription.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(staff.len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_ends_when_cache_is_dropped() {
        let cache = StaffCache::new(vec![]);
        let mut subscription = cache.subscribe();
        drop(cache);
        assert!(subscription.changed().await.is_none());
    }
}
