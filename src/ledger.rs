//! Punch lifecycle: creation, correction, approval and scoped listing.
//!
//! The ledger is the only writer of punches. Inputs arrive as validated
//! commands, every mutation is checked against the access policy and the
//! state machine, and only then handed to the store.
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::model::{
    profile::Profile,
    punch::{
        ApprovalStamp, ApprovalStatus, NewPunch, Punch, PunchPatch, PunchType, ReviewDecision,
    },
};
use crate::policy::{Action, Scope, decide};
use crate::store::{AttendanceStore, PunchFilter};

const SOURCE_WEB: &str = "web";

/// Parse an RFC 3339 timestamp and normalize it to UTC.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::Validation(format!("{field} must be an RFC 3339 timestamp: {e}")))
}

fn required_id(id: Option<String>) -> Result<String, AppError> {
    id.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("id is required".to_string()))
}

fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Optional geolocation reported by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
}

impl Location {
    fn validate(&self) -> Result<(), AppError> {
        let in_range = |value: Option<f64>, bound: f64| {
            value.is_none_or(|v| v.is_finite() && (-bound..=bound).contains(&v))
        };
        if !in_range(self.latitude, 90.0) {
            return Err(AppError::Validation("lat must be within [-90, 90]".to_string()));
        }
        if !in_range(self.longitude, 180.0) {
            return Err(AppError::Validation("lon must be within [-180, 180]".to_string()));
        }
        if self.accuracy.is_some_and(|a| !a.is_finite() || a < 0.0) {
            return Err(AppError::Validation("accuracy must be a non-negative number".to_string()));
        }
        Ok(())
    }
}

/// A validated self-clock request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockCommand {
    pub p_type: PunchType,
    pub location: Location,
    pub note: Option<String>,
}

impl ClockCommand {
    pub fn new(
        p_type: Option<&str>,
        location: Location,
        note: Option<String>,
    ) -> Result<Self, AppError> {
        let raw = p_type.unwrap_or_default();
        let p_type =
            PunchType::from_str(raw).map_err(|_| AppError::InvalidPunchType(raw.to_string()))?;
        location.validate()?;

        Ok(Self {
            p_type,
            location,
            note: clean_note(note),
        })
    }
}

/// A validated correction of an existing punch.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub punch_id: String,
    /// `Some(None)` clears the note.
    pub note: Option<Option<String>>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Correction {
    pub fn new(
        id: Option<String>,
        note: Option<Option<String>>,
        occurred_at: Option<&str>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            punch_id: required_id(id)?,
            note: note.map(clean_note),
            occurred_at: occurred_at
                .map(|raw| parse_timestamp("occurred_at", raw))
                .transpose()?,
        })
    }
}

/// A validated approval decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub punch_id: String,
    pub decision: ReviewDecision,
}

impl Review {
    pub fn new(id: Option<String>, decision: Option<&str>) -> Result<Self, AppError> {
        let punch_id = required_id(id)?;
        let decision = decision
            .and_then(|d| ReviewDecision::from_str(d).ok())
            .ok_or_else(|| {
                AppError::Validation("decision must be 'approved' or 'rejected'".to_string())
            })?;
        Ok(Self { punch_id, decision })
    }
}

/// Caller-supplied listing filters. Authorization scope is applied on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunchQuery {
    pub user_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl PunchQuery {
    pub fn new(
        user_id: Option<String>,
        start: Option<&str>,
        end: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Self, AppError> {
        let start = start.map(|s| parse_timestamp("start", s)).transpose()?;
        let end = end.map(|e| parse_timestamp("end", e)).transpose()?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AppError::Validation("start must not be after end".to_string()));
            }
        }

        Ok(Self {
            user_id: user_id.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            start,
            end,
            limit,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListLimits {
    pub own_default: u32,
    pub team_default: u32,
    pub max: u32,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            own_default: 50,
            team_default: 20,
            max: 500,
        }
    }
}

impl From<&Config> for ListLimits {
    fn from(config: &Config) -> Self {
        Self {
            own_default: config.my_punches_limit,
            team_default: config.team_punches_limit,
            max: config.max_punches_limit,
        }
    }
}

impl ListLimits {
    fn resolve(&self, requested: Option<u32>, default: u32) -> u32 {
        requested.unwrap_or(default).min(self.max).max(1)
    }
}

#[derive(Clone)]
pub struct PunchLedger {
    store: Arc<dyn AttendanceStore>,
    limits: ListLimits,
}

impl PunchLedger {
    pub fn new(store: Arc<dyn AttendanceStore>, limits: ListLimits) -> Self {
        Self { store, limits }
    }

    fn scope_for(profile: &Profile, action: Action) -> Result<Scope, AppError> {
        decide(profile, action).scope().ok_or_else(|| {
            info!(user_id = %profile.id, role = %profile.role, %action, "Access denied");
            AppError::Forbidden(format!("{action} is not permitted for role {}", profile.role))
        })
    }

    /// Record a punch for the caller at the current server time.
    #[instrument(skip(self, profile, cmd), fields(user_id = %profile.id, p_type = %cmd.p_type))]
    pub async fn create(&self, profile: &Profile, cmd: ClockCommand) -> Result<Punch, AppError> {
        let owner = match Self::scope_for(profile, Action::CreateOwn)? {
            Scope::Own(id) => id,
            other => {
                return Err(AppError::Internal(format!("unexpected create scope {other:?}")));
            }
        };

        let punch = NewPunch {
            id: Uuid::new_v4().to_string(),
            user_id: owner.clone(),
            p_type: cmd.p_type,
            occurred_at: Utc::now(),
            latitude: cmd.location.latitude,
            longitude: cmd.location.longitude,
            accuracy: cmd.location.accuracy,
            source: SOURCE_WEB.to_string(),
            note: cmd.note,
            created_by: owner,
        };

        let stored = self.store.insert_punch(&punch).await?;
        info!(punch_id = %stored.id, "Punch recorded");
        Ok(stored)
    }

    /// The caller's own punches, newest first.
    pub async fn list_own(&self, profile: &Profile, query: &PunchQuery) -> Result<Vec<Punch>, AppError> {
        self.list(profile, Action::ReadOwn, query, self.limits.own_default)
            .await
    }

    /// Punches of the caller's team, newest first. Employees are refused.
    pub async fn list_team(&self, profile: &Profile, query: &PunchQuery) -> Result<Vec<Punch>, AppError> {
        self.list(profile, Action::ReadTeam, query, self.limits.team_default)
            .await
    }

    async fn list(
        &self,
        profile: &Profile,
        action: Action,
        query: &PunchQuery,
        default_limit: u32,
    ) -> Result<Vec<Punch>, AppError> {
        let scope = Self::scope_for(profile, action)?;

        // The caller's user_id filter narrows the result; the scope below is
        // what authorizes it.
        let mut filter = PunchFilter {
            owners: None,
            exclude_owner: None,
            user_id: query.user_id.clone(),
            start: query.start,
            end: query.end,
            limit: self.limits.resolve(query.limit, default_limit),
        };

        match &scope {
            Scope::Own(id) => filter.owners = Some(vec![id.clone()]),
            Scope::DirectReportsOf(_) => {
                let members = self.store.list_profiles(&scope.profile_filter()).await?;
                if members.is_empty() {
                    return Ok(Vec::new());
                }
                filter.owners = Some(members.into_iter().map(|p| p.id).collect());
            }
            Scope::EveryoneExcept(id) => filter.exclude_owner = Some(id.clone()),
            Scope::Everyone => {}
        }

        Ok(self.store.select_punches(&filter).await?)
    }

    /// Fetch a punch and make sure it lies inside `scope`. Missing and
    /// out-of-scope punches produce the same error.
    async fn load_in_scope(&self, scope: &Scope, punch_id: &str) -> Result<Punch, AppError> {
        let punch = self
            .store
            .find_punch(punch_id)
            .await?
            .ok_or(AppError::NotFoundOrForbidden)?;

        let admitted = if scope.needs_manager_link() {
            self.store
                .find_profile(&punch.user_id)
                .await?
                .is_some_and(|owner| scope.admits_profile(&owner))
        } else {
            scope.admits(&punch.user_id, None)
        };

        if !admitted {
            info!(punch_id, owner = %punch.user_id, "Punch outside caller scope");
            return Err(AppError::NotFoundOrForbidden);
        }
        Ok(punch)
    }

    /// Correct note and/or time of a punch in the caller's scope.
    ///
    /// Decided punches may still be corrected; their status is kept.
    #[instrument(skip(self, profile, cmd), fields(user_id = %profile.id, punch_id = %cmd.punch_id))]
    pub async fn update(&self, profile: &Profile, cmd: Correction) -> Result<Punch, AppError> {
        let scope = Self::scope_for(profile, Action::EditAnyInScope)?;
        self.load_in_scope(&scope, &cmd.punch_id).await?;

        let patch = PunchPatch {
            note: cmd.note,
            occurred_at: cmd.occurred_at,
            edited_by: profile.id.clone(),
            edited_at: Utc::now(),
            approval: None,
            require_status: None,
        };

        let updated = self
            .store
            .update_punch(&cmd.punch_id, &patch)
            .await?
            .ok_or(AppError::NotFoundOrForbidden)?;
        info!("Punch corrected");
        Ok(updated)
    }

    /// Approve or reject a pending punch in the caller's scope.
    #[instrument(
        skip(self, profile, cmd),
        fields(user_id = %profile.id, punch_id = %cmd.punch_id, decision = %cmd.decision)
    )]
    pub async fn decide(&self, profile: &Profile, cmd: Review) -> Result<Punch, AppError> {
        let scope = Self::scope_for(profile, Action::ApproveAnyInScope)?;
        let punch = self.load_in_scope(&scope, &cmd.punch_id).await?;

        if punch.approval_status.is_terminal() {
            return Err(already_decided(punch.approval_status));
        }

        let now = Utc::now();
        let patch = PunchPatch {
            note: None,
            occurred_at: None,
            edited_by: profile.id.clone(),
            edited_at: now,
            approval: Some(ApprovalStamp {
                status: cmd.decision.into(),
                approved_by: profile.id.clone(),
                approved_at: now,
            }),
            require_status: Some(ApprovalStatus::Pending),
        };

        match self.store.update_punch(&cmd.punch_id, &patch).await? {
            Some(updated) => {
                info!("Punch decided");
                Ok(updated)
            }
            // Lost a race with another reviewer, or the row disappeared.
            None => match self.store.find_punch(&cmd.punch_id).await? {
                Some(current) => Err(already_decided(current.approval_status)),
                None => Err(AppError::NotFoundOrForbidden),
            },
        }
    }
}

fn already_decided(status: ApprovalStatus) -> AppError {
    AppError::Conflict(format!("punch already {status}"))
}
