use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::{error, warn};

use crate::model::{
    profile::Profile,
    punch::{NewPunch, Punch, PunchPatch},
    role::Role,
};
use crate::store::{AttendanceStore, ProfileFilter, PunchFilter, StoreError};

const PROFILE_COLUMNS: &str = "id, full_name, role, manager_id";

const PUNCH_COLUMNS: &str = r#"
    id, user_id, p_type, occurred_at, latitude, longitude, accuracy, source, note,
    created_by, edited_by, edited_at, approval_status, approved_by, approved_at
"#;

/// SQLSTATEs the schema uses for business-rule refusals: `45000` is raised by
/// the duplicate-punch trigger, `23000` covers key and FK violations.
const REJECTION_STATES: [&str; 2] = ["45000", "23000"];

#[derive(FromRow)]
struct ProfileRow {
    id: String,
    full_name: Option<String>,
    role: String,
    manager_id: Option<String>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| StoreError::Backend(format!("unknown role '{}'", row.role)))?;
        Ok(Profile {
            id: row.id,
            full_name: row.full_name,
            role,
            manager_id: row.manager_id,
        })
    }
}

#[derive(FromRow)]
struct PunchRow {
    id: String,
    user_id: String,
    p_type: String,
    occurred_at: DateTime<Utc>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    source: String,
    note: Option<String>,
    created_by: String,
    edited_by: Option<String>,
    edited_at: Option<DateTime<Utc>>,
    approval_status: String,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
}

impl TryFrom<PunchRow> for Punch {
    type Error = StoreError;

    fn try_from(row: PunchRow) -> Result<Self, Self::Error> {
        let p_type = row
            .p_type
            .parse()
            .map_err(|_| StoreError::Backend(format!("unknown p_type '{}'", row.p_type)))?;
        let approval_status = row.approval_status.parse().map_err(|_| {
            StoreError::Backend(format!("unknown approval_status '{}'", row.approval_status))
        })?;
        Ok(Punch {
            id: row.id,
            user_id: row.user_id,
            p_type,
            occurred_at: row.occurred_at,
            latitude: row.latitude,
            longitude: row.longitude,
            accuracy: row.accuracy,
            source: row.source,
            note: row.note,
            created_by: row.created_by,
            edited_by: row.edited_by,
            edited_at: row.edited_at,
            approval_status,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
        })
    }
}

// Helper enum for typed SQLx binding
#[derive(Debug)]
enum SqlValue {
    Str(String),
    OptStr(Option<String>),
    Time(DateTime<Utc>),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if let Some(code) = db_err.code() {
                if REJECTION_STATES.contains(&code.as_ref()) {
                    return StoreError::Rejected(db_err.message().to_string());
                }
            }
        }
        StoreError::Backend(e.to_string())
    }
}

/// Log the outcome of one store operation, however many statements it ran.
fn logged<T>(op: &'static str, result: Result<T, StoreError>) -> Result<T, StoreError> {
    match &result {
        Err(StoreError::Rejected(message)) => warn!(op, %message, "Store rejected write"),
        Err(StoreError::Backend(message)) => error!(op, error = %message, "Store backend failure"),
        Ok(_) => {}
    }
    result
}

/// Build `UPDATE punches SET ... WHERE id = ?` for a patch.
///
/// Every column of the patch lands in the same statement, so audit and
/// approval fields can never be observed half-written.
fn build_punch_update(id: &str, patch: &PunchPatch) -> (String, Vec<SqlValue>) {
    let mut sets = vec!["edited_by = ?", "edited_at = ?"];
    let mut values = vec![
        SqlValue::Str(patch.edited_by.clone()),
        SqlValue::Time(patch.edited_at),
    ];

    if let Some(note) = &patch.note {
        sets.push("note = ?");
        values.push(SqlValue::OptStr(note.clone()));
    }
    if let Some(occurred_at) = patch.occurred_at {
        sets.push("occurred_at = ?");
        values.push(SqlValue::Time(occurred_at));
    }
    if let Some(stamp) = &patch.approval {
        sets.extend(["approval_status = ?", "approved_by = ?", "approved_at = ?"]);
        values.push(SqlValue::Str(stamp.status.to_string()));
        values.push(SqlValue::Str(stamp.approved_by.clone()));
        values.push(SqlValue::Time(stamp.approved_at));
    }

    let mut sql = format!("UPDATE punches SET {} WHERE id = ?", sets.join(", "));
    values.push(SqlValue::Str(id.to_string()));

    if let Some(status) = patch.require_status {
        sql.push_str(" AND approval_status = ?");
        values.push(SqlValue::Str(status.to_string()));
    }

    (sql, values)
}

/// Build the WHERE clause for a punch filter.
fn build_punch_where(filter: &PunchFilter) -> (String, Vec<SqlValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(owners) = &filter.owners {
        if owners.is_empty() {
            where_sql.push_str(" AND 1=0");
        } else {
            let marks = vec!["?"; owners.len()].join(", ");
            where_sql.push_str(&format!(" AND user_id IN ({marks})"));
            args.extend(owners.iter().cloned().map(SqlValue::Str));
        }
    }
    if let Some(excluded) = &filter.exclude_owner {
        where_sql.push_str(" AND user_id <> ?");
        args.push(SqlValue::Str(excluded.clone()));
    }
    if let Some(user_id) = &filter.user_id {
        where_sql.push_str(" AND user_id = ?");
        args.push(SqlValue::Str(user_id.clone()));
    }
    if let Some(start) = filter.start {
        where_sql.push_str(" AND occurred_at >= ?");
        args.push(SqlValue::Time(start));
    }
    if let Some(end) = filter.end {
        where_sql.push_str(" AND occurred_at <= ?");
        args.push(SqlValue::Time(end));
    }

    (where_sql, args)
}

/// [`AttendanceStore`] backed by a MySQL pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_punch(
        tx: &mut Transaction<'_, MySql>,
        id: &str,
    ) -> Result<Option<Punch>, StoreError> {
        let sql = format!("SELECT {PUNCH_COLUMNS} FROM punches WHERE id = ?");
        sqlx::query_as::<_, PunchRow>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .map(Punch::try_from)
            .transpose()
    }

    async fn select_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn select_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<&str> = Vec::new();

        if let Some(id) = filter.id.as_deref() {
            where_sql.push_str(" AND id = ?");
            args.push(id);
        }
        if let Some(manager_id) = filter.manager_id.as_deref() {
            where_sql.push_str(" AND manager_id = ?");
            args.push(manager_id);
        }
        if let Some(excluded) = filter.exclude_id.as_deref() {
            where_sql.push_str(" AND id <> ?");
            args.push(excluded);
        }

        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles{where_sql} ORDER BY full_name, id"
        );
        let mut query = sqlx::query_as::<_, ProfileRow>(&sql);
        for arg in args {
            query = query.bind(arg);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Profile::try_from)
            .collect()
    }

    async fn insert_punch_row(&self, punch: &NewPunch) -> Result<Punch, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO punches
                (id, user_id, p_type, occurred_at, latitude, longitude, accuracy,
                 source, note, created_by, approval_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(&punch.id)
        .bind(&punch.user_id)
        .bind(punch.p_type.as_ref())
        .bind(punch.occurred_at)
        .bind(punch.latitude)
        .bind(punch.longitude)
        .bind(punch.accuracy)
        .bind(&punch.source)
        .bind(&punch.note)
        .bind(&punch.created_by)
        .execute(&mut *tx)
        .await?;

        let stored = Self::fetch_punch(&mut tx, &punch.id)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("inserted punch {} vanished", punch.id)))?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn select_punch(&self, id: &str) -> Result<Option<Punch>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let punch = Self::fetch_punch(&mut tx, id).await?;
        tx.commit().await?;
        Ok(punch)
    }

    async fn select_punch_rows(&self, filter: &PunchFilter) -> Result<Vec<Punch>, StoreError> {
        let (where_sql, args) = build_punch_where(filter);
        let sql = format!(
            r#"
            SELECT {PUNCH_COLUMNS}
            FROM punches
            {where_sql}
            ORDER BY occurred_at DESC, created_at DESC
            LIMIT ?
            "#
        );

        let mut query = sqlx::query_as::<_, PunchRow>(&sql);
        for arg in args {
            query = match arg {
                SqlValue::Str(v) => query.bind(v),
                SqlValue::OptStr(v) => query.bind(v),
                SqlValue::Time(v) => query.bind(v),
            };
        }

        query
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Punch::try_from)
            .collect()
    }

    async fn update_punch_row(
        &self,
        id: &str,
        patch: &PunchPatch,
    ) -> Result<Option<Punch>, StoreError> {
        let (sql, values) = build_punch_update(id, patch);
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(&sql);
        for value in values {
            query = match value {
                SqlValue::Str(v) => query.bind(v),
                SqlValue::OptStr(v) => query.bind(v),
                SqlValue::Time(v) => query.bind(v),
            };
        }
        let result = query.execute(&mut *tx).await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let updated = Self::fetch_punch(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        logged("find_profile", self.select_profile(id).await)
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        logged("list_profiles", self.select_profiles(filter).await)
    }

    async fn insert_punch(&self, punch: &NewPunch) -> Result<Punch, StoreError> {
        logged("insert_punch", self.insert_punch_row(punch).await)
    }

    async fn find_punch(&self, id: &str) -> Result<Option<Punch>, StoreError> {
        logged("find_punch", self.select_punch(id).await)
    }

    async fn select_punches(&self, filter: &PunchFilter) -> Result<Vec<Punch>, StoreError> {
        logged("select_punches", self.select_punch_rows(filter).await)
    }

    async fn update_punch(
        &self,
        id: &str,
        patch: &PunchPatch,
    ) -> Result<Option<Punch>, StoreError> {
        logged("update_punch", self.update_punch_row(id, patch).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_errors_convert_without_side_effects() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(&err, StoreError::Backend(_)));

        let passed: Result<(), StoreError> = logged("find_punch", Err(err));
        assert!(matches!(passed, Err(StoreError::Backend(msg)) if msg.contains("no rows")));
        assert_eq!(logged("find_punch", Ok(3)).unwrap(), 3);
    }
    use crate::model::punch::{ApprovalStamp, ApprovalStatus};

    #[test]
    fn approval_update_is_one_conditional_statement() {
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

        let (sql, values) = build_punch_update("p1", &patch);

        assert_eq!(
            sql,
            "UPDATE punches SET edited_by = ?, edited_at = ?, approval_status = ?, \
             approved_by = ?, approved_at = ? WHERE id = ? AND approval_status = ?"
        );
        assert_eq!(values.len(), 7);
        assert!(matches!(&values[2], SqlValue::Str(s) if s == "approved"));
        assert!(matches!(&values[6], SqlValue::Str(s) if s == "pending"));
    }

    #[test]
    fn cleared_note_binds_null() {
        let patch = PunchPatch {
            note: Some(None),
            occurred_at: None,
            edited_by: "m1".into(),
            edited_at: Utc::now(),
            approval: None,
            require_status: None,
        };

        let (sql, values) = build_punch_update("p1", &patch);

        assert_eq!(
            sql,
            "UPDATE punches SET edited_by = ?, edited_at = ?, note = ? WHERE id = ?"
        );
        assert!(matches!(&values[2], SqlValue::OptStr(None)));
    }

    #[test]
    fn empty_owner_set_matches_nothing() {
        let filter = PunchFilter {
            owners: Some(vec![]),
            exclude_owner: None,
            user_id: Some("e1".into()),
            start: None,
            end: None,
            limit: 20,
        };

        let (where_sql, args) = build_punch_where(&filter);

        assert_eq!(where_sql, " WHERE 1=1 AND 1=0 AND user_id = ?");
        assert_eq!(args.len(), 1);
    }
}
