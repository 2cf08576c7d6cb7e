use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Duration;

use crate::model::{
    profile::Profile,
    punch::{NewPunch, Punch, PunchPatch},
};
use crate::store::{AttendanceStore, ProfileFilter, PunchFilter, StoreError};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    /// Insertion order.
    punches: Vec<Punch>,
}

/// An in-memory implementation of [`AttendanceStore`].
///
/// Enforces the same duplicate-punch guard as the MySQL schema.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    duplicate_window: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            duplicate_window: Duration::seconds(60),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::new();
        for profile in profiles {
            store.insert_profile(profile);
        }
        store
    }

    pub fn duplicate_window(mut self, window: Duration) -> Self {
        self.duplicate_window = window;
        self
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.id.clone(), profile);
    }

    pub fn punch_count(&self) -> usize {
        self.lock().punches.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a test panicked mid-write.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.lock().profiles.get(id).cloned())
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        let mut profiles: Vec<Profile> = self
            .lock()
            .profiles
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name).then_with(|| a.id.cmp(&b.id)));
        Ok(profiles)
    }

    async fn insert_punch(&self, punch: &NewPunch) -> Result<Punch, StoreError> {
        let mut tables = self.lock();

        if !tables.profiles.contains_key(&punch.user_id) {
            return Err(StoreError::Rejected(format!(
                "punch owner {} does not exist",
                punch.user_id
            )));
        }

        let window = self.duplicate_window;
        let duplicate = tables.punches.iter().any(|p| {
            let gap = p.occurred_at.signed_duration_since(punch.occurred_at);
            p.user_id == punch.user_id && p.p_type == punch.p_type && gap < window && gap > -window
        });
        if duplicate {
            return Err(StoreError::Rejected(format!(
                "duplicate punch: '{}' already recorded within {} seconds",
                punch.p_type,
                self.duplicate_window.num_seconds()
            )));
        }

        let stored = punch.clone().into_pending();
        tables.punches.push(stored.clone());
        Ok(stored)
    }

    async fn find_punch(&self, id: &str) -> Result<Option<Punch>, StoreError> {
        Ok(self.lock().punches.iter().find(|p| p.id == id).cloned())
    }

    async fn select_punches(&self, filter: &PunchFilter) -> Result<Vec<Punch>, StoreError> {
        // Newest insert first so that equal timestamps keep recency order.
        let mut punches: Vec<Punch> = self
            .lock()
            .punches
            .iter()
            .rev()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        punches.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        punches.truncate(filter.limit as usize);
        Ok(punches)
    }

    async fn update_punch(
        &self,
        id: &str,
        patch: &PunchPatch,
    ) -> Result<Option<Punch>, StoreError> {
        let mut tables = self.lock();
        let Some(punch) = tables.punches.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if patch
            .require_status
            .is_some_and(|status| punch.approval_status != status)
        {
            return Ok(None);
        }
        patch.apply(punch);
        Ok(Some(punch.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::punch::{ApprovalStatus, PunchType};
    use crate::model::role::Role;
    use chrono::Utc;

    fn profile(id: &str, manager_id: Option<&str>) -> Profile {
        Profile {
            id: id.into(),
            full_name: Some(id.to_uppercase()),
            role: Role::Employee,
            manager_id: manager_id.map(String::from),
        }
    }

    fn new_punch(id: &str, user: &str, p_type: PunchType, seconds_ago: i64) -> NewPunch {
        NewPunch {
            id: id.into(),
            user_id: user.into(),
            p_type,
            occurred_at: Utc::now() - Duration::seconds(seconds_ago),
            latitude: None,
            longitude: None,
            accuracy: None,
            source: "web".into(),
            note: None,
            created_by: user.into(),
        }
    }

    fn all(limit: u32) -> PunchFilter {
        PunchFilter {
            owners: None,
            exclude_owner: None,
            user_id: None,
            start: None,
            end: None,
            limit,
        }
    }

    #[actix_web::test]
    async fn duplicate_guard_rejects_same_type_inside_window() {
        let store = MemoryStore::with_profiles([profile("e1", None)]);

        store.insert_punch(&new_punch("a", "e1", PunchType::In, 10)).await.unwrap();
        let err = store
            .insert_punch(&new_punch("b", "e1", PunchType::In, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Rejected(msg) if msg.contains("duplicate punch")));
        store.insert_punch(&new_punch("c", "e1", PunchType::Out, 0)).await.unwrap();
        store.insert_punch(&new_punch("d", "e1", PunchType::In, 600)).await.unwrap();
        assert_eq!(store.punch_count(), 3);
    }

    #[actix_web::test]
    async fn narrower_window_admits_spaced_punches() {
        let store = MemoryStore::new().duplicate_window(Duration::seconds(5));
        store.insert_profile(profile("e1", None));

        store.insert_punch(&new_punch("a", "e1", PunchType::In, 10)).await.unwrap();
        store.insert_punch(&new_punch("b", "e1", PunchType::In, 0)).await.unwrap();

        let err = store.insert_punch(&new_punch("c", "e1", PunchType::In, 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(msg) if msg.contains("within 5 seconds")));

        let err = store.insert_punch(&new_punch("d", "ghost", PunchType::In, 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[actix_web::test]
    async fn select_orders_newest_first_and_honours_limit() {
        let store = MemoryStore::with_profiles([profile("e1", None), profile("e2", None)]);
        store.insert_punch(&new_punch("old", "e1", PunchType::In, 300)).await.unwrap();
        store.insert_punch(&new_punch("mid", "e2", PunchType::In, 200)).await.unwrap();
        store.insert_punch(&new_punch("new", "e1", PunchType::Out, 100)).await.unwrap();

        let ids: Vec<_> = store
            .select_punches(&all(2))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ["new", "mid"]);

        let mut only_e1 = all(10);
        only_e1.owners = Some(vec!["e1".into()]);
        let ids: Vec<_> = store
            .select_punches(&only_e1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ["new", "old"]);
    }

    #[actix_web::test]
    async fn conditional_update_skips_decided_rows() {
        let store = MemoryStore::with_profiles([profile("e1", None)]);
        store.insert_punch(&new_punch("a", "e1", PunchType::In, 0)).await.unwrap();

        let mut patch = PunchPatch {
            note: None,
            occurred_at: None,
            edited_by: "m1".into(),
            edited_at: Utc::now(),
            approval: Some(crate::model::punch::ApprovalStamp {
                status: ApprovalStatus::Rejected,
                approved_by: "m1".into(),
                approved_at: Utc::now(),
            }),
            require_status: Some(ApprovalStatus::Pending),
        };
        let first = store.update_punch("a", &patch).await.unwrap();
        assert_eq!(first.unwrap().approval_status, ApprovalStatus::Rejected);

        patch.approval.as_mut().unwrap().status = ApprovalStatus::Approved;
        assert!(store.update_punch("a", &patch).await.unwrap().is_none());
        assert!(store.update_punch("missing", &patch).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn profile_filter_selects_direct_reports() {
        let store = MemoryStore::with_profiles([
            profile("m1", None),
            profile("e1", Some("m1")),
            profile("e2", Some("m1")),
            profile("e3", Some("m2")),
        ]);
        let filter = ProfileFilter {
            manager_id: Some("m1".into()),
            ..ProfileFilter::default()
        };

        let ids: Vec<_> = store
            .list_profiles(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ["e1", "e2"]);
    }
}
