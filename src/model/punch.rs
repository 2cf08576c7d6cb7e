use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PunchType {
    In,
    Out,
    BreakStart,
    BreakEnd,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// Outcome a reviewer may record on a pending punch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ApprovalStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ApprovalStatus::Approved,
            ReviewDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// One attendance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "0f7d3c52-8a1e-4b7b-9c55-6f1d2e3a4b5c",
    "user_id": "7b1c2a9e-43f5-4c4e-9a57-0d9f3c1e2b10",
    "p_type": "in",
    "occurred_at": "2026-01-05T11:58:03Z",
    "latitude": -23.5505,
    "longitude": -46.6333,
    "accuracy": 12.5,
    "source": "web",
    "note": null,
    "created_by": "7b1c2a9e-43f5-4c4e-9a57-0d9f3c1e2b10",
    "edited_by": null,
    "edited_at": null,
    "approval_status": "pending",
    "approved_by": null,
    "approved_at": null
}))]
pub struct Punch {
    pub id: String,
    pub user_id: String,
    pub p_type: PunchType,
    #[schema(example = "2026-01-05T11:58:03Z", format = "date-time", value_type = String)]
    pub occurred_at: DateTime<Utc>,
    #[schema(nullable = true)]
    pub latitude: Option<f64>,
    #[schema(nullable = true)]
    pub longitude: Option<f64>,
    #[schema(nullable = true)]
    pub accuracy: Option<f64>,
    #[schema(example = "web")]
    pub source: String,
    #[schema(nullable = true)]
    pub note: Option<String>,
    pub created_by: String,
    #[schema(nullable = true)]
    pub edited_by: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>, nullable = true)]
    pub edited_at: Option<DateTime<Utc>>,
    pub approval_status: ApprovalStatus,
    #[schema(nullable = true)]
    pub approved_by: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>, nullable = true)]
    pub approved_at: Option<DateTime<Utc>>,
}

/// Fully shaped row handed to the store on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPunch {
    pub id: String,
    pub user_id: String,
    pub p_type: PunchType,
    pub occurred_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub source: String,
    pub note: Option<String>,
    pub created_by: String,
}

// Only the in-memory store builds rows itself; MySQL fills the defaults.
#[cfg(test)]
impl NewPunch {
    pub fn into_pending(self) -> Punch {
        Punch {
            id: self.id,
            user_id: self.user_id,
            p_type: self.p_type,
            occurred_at: self.occurred_at,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            source: self.source,
            note: self.note,
            created_by: self.created_by,
            edited_by: None,
            edited_at: None,
            approval_status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
        }
    }
}

/// Approval fields, always written together.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalStamp {
    pub status: ApprovalStatus,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
}

/// A single-statement update of a punch.
///
/// `edited_by`/`edited_at` are mandatory so every write leaves an audit trail.
/// When `require_status` is set the store must only apply the patch if the
/// punch still carries that status.
#[derive(Debug, Clone, PartialEq)]
pub struct PunchPatch {
    /// `None` leaves the note alone, `Some(None)` clears it.
    pub note: Option<Option<String>>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub edited_by: String,
    pub edited_at: DateTime<Utc>,
    pub approval: Option<ApprovalStamp>,
    pub require_status: Option<ApprovalStatus>,
}

#[cfg(test)]
impl PunchPatch {
    pub fn apply(&self, punch: &mut Punch) {
        if let Some(note) = &self.note {
            punch.note = note.clone();
        }
        if let Some(occurred_at) = self.occurred_at {
            punch.occurred_at = occurred_at;
        }
        punch.edited_by = Some(self.edited_by.clone());
        punch.edited_at = Some(self.edited_at);
        if let Some(stamp) = &self.approval {
            punch.approval_status = stamp.status;
            punch.approved_by = Some(stamp.approved_by.clone());
            punch.approved_at = Some(stamp.approved_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn pending() -> Punch {
        NewPunch {
            id: "p1".into(),
            user_id: "u1".into(),
            p_type: PunchType::In,
            occurred_at: Utc::now(),
            latitude: None,
            longitude: None,
            accuracy: None,
            source: "web".into(),
            note: Some("late bus".into()),
            created_by: "u1".into(),
        }
        .into_pending()
    }

    #[test]
    fn punch_types_use_wire_names() {
        assert_eq!(PunchType::from_str("break_start").unwrap(), PunchType::BreakStart);
        assert_eq!(PunchType::BreakEnd.as_ref(), "break_end");
        assert!(PunchType::from_str("lunch").is_err());
        assert_eq!(
            serde_json::to_value(PunchType::BreakStart).unwrap(),
            serde_json::json!("break_start")
        );
    }

    #[test]
    fn pending_is_the_only_open_status() {
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
        assert!(ReviewDecision::from_str("pending").is_err());
    }

    #[test]
    fn approval_patch_stamps_every_audit_field() {
        let mut punch = pending();
        let now = Utc::now();
        let patch = PunchPatch {
            note: None,
            occurred_at: None,
            edited_by: "m1".into(),
            edited_at: now,
            approval: Some(ApprovalStamp {
                status: ApprovalStatus::Approved,
                approved_by: "m1".into(),
                approved_at: now,
            }),
            require_status: Some(ApprovalStatus::Pending),
        };

        patch.apply(&mut punch);

        assert_eq!(punch.approval_status, ApprovalStatus::Approved);
        assert_eq!(punch.approved_by.as_deref(), Some("m1"));
        assert_eq!(punch.approved_at, Some(now));
        assert_eq!(punch.edited_by.as_deref(), Some("m1"));
        assert_eq!(punch.edited_at, Some(now));
        assert_eq!(punch.note.as_deref(), Some("late bus"));
    }

    #[test]
    fn explicit_null_note_clears_it() {
        let mut punch = pending();
        let patch = PunchPatch {
            note: Some(None),
            occurred_at: None,
            edited_by: "m1".into(),
            edited_at: Utc::now(),
            approval: None,
            require_status: None,
        };

        patch.apply(&mut punch);

        assert_eq!(punch.note, None);
        assert_eq!(punch.approval_status, ApprovalStatus::Pending);
        assert!(punch.approved_by.is_none());
    }
}
