use actix_web::{HttpResponse, web};
use tracing::instrument;

use crate::{
    auth::auth::Principal,
    error::{AppError, ErrorResponse},
    model::profile::Profile,
    service::AttendanceService,
};

/// Caller's own profile
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Caller profile", body = Profile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Token is valid but no profile exists", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile"
)]
#[instrument(name = "api_me", skip_all, fields(user_id = %principal.user_id))]
pub async fn me(
    principal: Principal,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    let profile = service.me(&principal).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Team listing
///
/// Managers get their direct reports, admins everyone but themselves,
/// employees an empty list.
#[utoipa::path(
    get,
    path = "/api/team",
    responses(
        (status = 200, description = "Profiles in the caller's team", body = [Profile]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile"
)]
#[instrument(name = "api_team", skip_all, fields(user_id = %principal.user_id))]
pub async fn team(
    principal: Principal,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    let team = service.team(&principal).await?;
    Ok(HttpResponse::Ok().json(team))
}
