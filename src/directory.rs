use tracing::info;

use crate::auth::auth::Principal;
use crate::error::AppError;
use crate::model::profile::Profile;
use crate::policy::{Access, Action, decide};
use crate::store::AttendanceStore;

/// Map a verified principal to its profile. Re-read on every request.
pub async fn resolve(store: &dyn AttendanceStore, principal: &Principal) -> Result<Profile, AppError> {
    store.find_profile(&principal.user_id).await?.ok_or_else(|| {
        info!(user_id = %principal.user_id, "Valid token without profile");
        AppError::NotFound("Profile not found".to_string())
    })
}

/// Profiles the caller manages. Non-reviewers have no team and get an empty
/// list rather than a refusal.
pub async fn team(store: &dyn AttendanceStore, profile: &Profile) -> Result<Vec<Profile>, AppError> {
    match decide(profile, Action::ReadTeam) {
        Access::Allow(scope) => Ok(store.list_profiles(&scope.profile_filter()).await?),
        Access::Deny => Ok(Vec::new()),
    }
}
