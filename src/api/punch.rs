use actix_web::{HttpResponse, web};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::Principal,
    error::{AppError, ErrorResponse},
    ledger::{ClockCommand, Correction, Location, PunchQuery, Review},
    model::punch::Punch,
    service::AttendanceService,
};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Deserialize, ToSchema)]
pub struct ClockRequest {
    /// One of in, out, break_start, break_end
    #[serde(rename = "type")]
    #[schema(example = "in")]
    pub p_type: Option<String>,
    #[schema(example = json!(-23.5505))]
    pub lat: Option<f64>,
    #[schema(example = json!(-46.6333))]
    pub lon: Option<f64>,
    /// Reported accuracy radius in meters
    #[schema(example = 12.5)]
    pub accuracy: Option<f64>,
    pub note: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct PunchUpdateRequest {
    #[schema(example = "0f7d3c52-8a1e-4b7b-9c55-6f1d2e3a4b5c")]
    pub id: Option<String>,
    /// Omit to keep the note, `null` to clear it
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable = true)]
    pub note: Option<Option<String>>,
    #[schema(example = "2026-01-05T08:00:00-03:00", format = "date-time", value_type = Option<String>)]
    pub occurred_at: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct PunchApproveRequest {
    #[schema(example = "0f7d3c52-8a1e-4b7b-9c55-6f1d2e3a4b5c")]
    pub id: Option<String>,
    #[schema(example = "approved")]
    /// approved or rejected
    pub decision: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PunchFilterParams {
    /// Only punches of this user (still limited to what the caller may see)
    pub user_id: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z")]
    /// Inclusive lower bound on occurred_at (RFC 3339)
    pub start: Option<String>,
    #[schema(example = "2026-01-31T23:59:59Z")]
    /// Inclusive upper bound on occurred_at (RFC 3339)
    pub end: Option<String>,
    #[schema(example = 20)]
    /// Maximum number of punches returned
    pub limit: Option<u32>,
}

impl PunchFilterParams {
    fn to_query(&self) -> Result<PunchQuery, AppError> {
        PunchQuery::new(
            self.user_id.clone(),
            self.start.as_deref(),
            self.end.as_deref(),
            self.limit,
        )
    }
}

#[derive(Serialize, ToSchema)]
pub struct PunchEnvelope {
    #[schema(example = true)]
    pub ok: bool,
    pub punch: Punch,
}

impl PunchEnvelope {
    fn ok(punch: Punch) -> Self {
        Self { ok: true, punch }
    }
}

/// Caller's own punches, newest first
#[utoipa::path(
    get,
    path = "/api/my-punches",
    params(PunchFilterParams),
    responses(
        (status = 200, description = "Caller's punches (default 50)", body = [Punch]),
        (status = 400, description = "Malformed filter", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Punch"
)]
#[instrument(name = "api_my_punches", skip_all, fields(user_id = %principal.user_id))]
pub async fn my_punches(
    principal: Principal,
    service: web::Data<AttendanceService>,
    params: web::Query<PunchFilterParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query()?;
    let punches = service.my_punches(&principal, &query).await?;
    Ok(HttpResponse::Ok().json(punches))
}

/// Record a punch for the caller
#[utoipa::path(
    post,
    path = "/api/clock",
    request_body(
        content = ClockRequest,
        description = "Punch type and optional geolocation",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Punch recorded", body = PunchEnvelope),
        (status = 400, description = "Invalid type or location, or refused by the store (e.g. duplicate punch)", body = ErrorResponse, example = json!({
            "error": "conflict",
            "detail": "duplicate punch: 'in' already recorded within 60 seconds"
        })),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Punch"
)]
#[instrument(name = "api_clock", skip_all, fields(user_id = %principal.user_id))]
pub async fn clock(
    principal: Principal,
    service: web::Data<AttendanceService>,
    payload: web::Json<ClockRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    let cmd = ClockCommand::new(
        body.p_type.as_deref(),
        Location {
            latitude: body.lat,
            longitude: body.lon,
            accuracy: body.accuracy,
        },
        body.note,
    )?;

    let punch = service.clock(&principal, cmd).await?;
    Ok(HttpResponse::Ok().json(PunchEnvelope::ok(punch)))
}

/// Punches of the caller's team (manager/admin)
#[utoipa::path(
    get,
    path = "/api/team-punches",
    params(PunchFilterParams),
    responses(
        (status = 200, description = "Team punches (default 20), newest first", body = [Punch]),
        (status = 400, description = "Malformed filter", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not a manager or admin", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Punch"
)]
#[instrument(name = "api_team_punches", skip_all, fields(user_id = %principal.user_id))]
pub async fn team_punches(
    principal: Principal,
    service: web::Data<AttendanceService>,
    params: web::Query<PunchFilterParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query()?;
    let punches = service.team_punches(&principal, &query).await?;
    Ok(HttpResponse::Ok().json(punches))
}

/// Correct the note or time of a team member's punch
#[utoipa::path(
    post,
    path = "/api/punch-update",
    request_body(
        content = PunchUpdateRequest,
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Punch corrected", body = PunchEnvelope),
        (status = 400, description = "Missing id or malformed occurred_at", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller may not edit punches", body = ErrorResponse),
        (status = 404, description = "Punch not found or out of scope", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Punch"
)]
#[instrument(name = "api_punch_update", skip_all, fields(user_id = %principal.user_id))]
pub async fn punch_update(
    principal: Principal,
    service: web::Data<AttendanceService>,
    payload: web::Json<PunchUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    let cmd = Correction::new(body.id, body.note, body.occurred_at.as_deref())?;

    let punch = service.correct(&principal, cmd).await?;
    Ok(HttpResponse::Ok().json(PunchEnvelope::ok(punch)))
}

/// Approve or reject a pending punch
#[utoipa::path(
    post,
    path = "/api/punch-approve",
    request_body(
        content = PunchApproveRequest,
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Decision recorded", body = PunchEnvelope),
        (status = 400, description = "Missing id, bad decision, or punch already decided", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller may not approve punches", body = ErrorResponse),
        (status = 404, description = "Punch not found or out of scope", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Punch"
)]
#[instrument(name = "api_punch_approve", skip_all, fields(user_id = %principal.user_id))]
pub async fn punch_approve(
    principal: Principal,
    service: web::Data<AttendanceService>,
    payload: web::Json<PunchApproveRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    let cmd = Review::new(body.id, body.decision.as_deref())?;

    let punch = service.review(&principal, cmd).await?;
    Ok(HttpResponse::Ok().json(PunchEnvelope::ok(punch)))
}
