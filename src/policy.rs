//! Role-keyed access decisions.
//!
//! Every scope the service applies to a query or a mutation is computed here
//! and nowhere else. The functions are pure: no storage access, no clock.
use strum_macros::Display;

use crate::model::{profile::Profile, role::Role};
use crate::store::ProfileFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    ReadOwn,
    CreateOwn,
    ReadTeam,
    EditAnyInScope,
    ApproveAnyInScope,
}

/// The set of profiles (and through them, punches) an action may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only records owned by this profile id.
    Own(String),
    /// Profiles whose `manager_id` is this id. One level only.
    DirectReportsOf(String),
    EveryoneExcept(String),
    Everyone,
}

impl Scope {
    /// Whether a record owned by `user_id` (whose manager is `manager_id`)
    /// falls inside the scope.
    pub fn admits(&self, user_id: &str, manager_id: Option<&str>) -> bool {
        match self {
            Scope::Own(id) => user_id == id,
            Scope::DirectReportsOf(manager) => manager_id == Some(manager.as_str()),
            Scope::EveryoneExcept(id) => user_id != id,
            Scope::Everyone => true,
        }
    }

    pub fn admits_profile(&self, profile: &Profile) -> bool {
        self.admits(&profile.id, profile.manager_id.as_deref())
    }

    /// Admission depends on the owner's manager link, which the caller has to
    /// look up.
    pub fn needs_manager_link(&self) -> bool {
        matches!(self, Scope::DirectReportsOf(_))
    }

    pub fn profile_filter(&self) -> ProfileFilter {
        match self {
            Scope::Own(id) => ProfileFilter {
                id: Some(id.clone()),
                ..ProfileFilter::default()
            },
            Scope::DirectReportsOf(manager) => ProfileFilter {
                manager_id: Some(manager.clone()),
                ..ProfileFilter::default()
            },
            Scope::EveryoneExcept(id) => ProfileFilter {
                exclude_id: Some(id.clone()),
                ..ProfileFilter::default()
            },
            Scope::Everyone => ProfileFilter::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow(Scope),
    Deny,
}

impl Access {
    pub fn scope(self) -> Option<Scope> {
        match self {
            Access::Allow(scope) => Some(scope),
            Access::Deny => None,
        }
    }
}

/// Decide whether `profile` may perform `action`, and over which scope.
///
/// A `Deny` must be turned into a rejection by the caller. The one exception
/// is the team listing, where an employee simply has no team.
pub fn decide(profile: &Profile, action: Action) -> Access {
    let me = || profile.id.clone();

    match (profile.role, action) {
        (_, Action::ReadOwn | Action::CreateOwn) => Access::Allow(Scope::Own(me())),
        (Role::Employee, _) => Access::Deny,
        (Role::Manager, Action::ReadTeam | Action::EditAnyInScope | Action::ApproveAnyInScope) => {
            Access::Allow(Scope::DirectReportsOf(me()))
        }
        (Role::Admin, Action::ReadTeam) => Access::Allow(Scope::EveryoneExcept(me())),
        (Role::Admin, Action::EditAnyInScope | Action::ApproveAnyInScope) => {
            Access::Allow(Scope::Everyone)
        }
    }
}
