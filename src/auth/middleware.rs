use crate::auth::jwt::{JwtVerifier, bearer_token};
use crate::error::AppError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

fn reject(req: ServiceRequest, detail: &str) -> ServiceResponse<BoxBody> {
    debug!(path = req.path(), detail, "Rejected unauthenticated request");
    let resp = AppError::Unauthorized(detail.to_string()).error_response();
    req.into_response(resp)
}

/// Resolves the bearer credential into a [`Principal`](crate::auth::auth::Principal)
/// before any handler runs.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let verifier = req
        .app_data::<Data<JwtVerifier>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("Token verifier missing".to_string()))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v,
            Err(_) => return Ok(reject(req, "Invalid Authorization header encoding")),
        },
        None => return Ok(reject(req, "Missing Authorization header")),
    };

    let token = match bearer_token(header_value) {
        Some(t) => t,
        None => return Ok(reject(req, "Authorization header must be 'Bearer <token>'")),
    };

    let principal = match verifier.verify(token) {
        Ok(p) => p,
        Err(e) => {
            let detail = e.to_string();
            return Ok(reject(req, &detail));
        }
    };

    debug!(
        user_id = %principal.user_id,
        email = principal.email.as_deref().unwrap_or("-"),
        "Authenticated request"
    );
    req.extensions_mut().insert(principal);

    next.call(req).await
}
