//! Adapter boundary to the external relational store.
//!
//! The store owns durability and cross-request consistency (for example the
//! duplicate-punch guard). Everything that reaches it has already been
//! shaped, validated and scoped by the ledger.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    profile::Profile,
    punch::{NewPunch, Punch, PunchPatch},
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// Errors reported by a store implementation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The store refused the write on business grounds (duplicate guard,
    /// constraint). The message is meant for operators and is passed through.
    #[error("{0}")]
    Rejected(String),

    /// Connection, driver or decoding failure.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Filter over `profiles`. All set fields must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFilter {
    pub id: Option<String>,
    pub manager_id: Option<String>,
    pub exclude_id: Option<String>,
}

impl ProfileFilter {
    pub fn matches(&self, profile: &Profile) -> bool {
        self.id.as_ref().is_none_or(|id| &profile.id == id)
            && self
                .manager_id
                .as_ref()
                .is_none_or(|m| profile.manager_id.as_ref() == Some(m))
            && self.exclude_id.as_ref().is_none_or(|x| &profile.id != x)
    }
}

/// Filter over `punches`. Results are ordered newest `occurred_at` first.
#[derive(Debug, Clone, PartialEq)]
pub struct PunchFilter {
    /// Restrict to these owners. `None` means no owner restriction.
    pub owners: Option<Vec<String>>,
    pub exclude_owner: Option<String>,
    pub user_id: Option<String>,
    /// Inclusive.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive.
    pub end: Option<DateTime<Utc>>,
    pub limit: u32,
}

impl PunchFilter {
    pub fn matches(&self, punch: &Punch) -> bool {
        self.owners
            .as_ref()
            .is_none_or(|owners| owners.iter().any(|o| o == &punch.user_id))
            && self.exclude_owner.as_ref().is_none_or(|x| &punch.user_id != x)
            && self.user_id.as_ref().is_none_or(|u| &punch.user_id == u)
            && self.start.is_none_or(|s| punch.occurred_at >= s)
            && self.end.is_none_or(|e| punch.occurred_at <= e)
    }
}

/// Narrow select/insert/update surface over `profiles` and `punches`.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_profile(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError>;

    /// Insert a punch and return the stored row.
    ///
    /// Business-rule refusals come back as [`StoreError::Rejected`].
    async fn insert_punch(&self, punch: &NewPunch) -> Result<Punch, StoreError>;

    async fn find_punch(&self, id: &str) -> Result<Option<Punch>, StoreError>;

    async fn select_punches(&self, filter: &PunchFilter) -> Result<Vec<Punch>, StoreError>;

    /// Apply `patch` atomically. Returns `None` when no row with `id` exists
    /// or when `patch.require_status` no longer matches.
    async fn update_punch(&self, id: &str, patch: &PunchPatch)
    -> Result<Option<Punch>, StoreError>;
}
