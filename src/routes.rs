use crate::{
    api::{profile, punch},
    auth::middleware::auth_middleware,
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

pub type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiter shared by every protected route.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: Limiter) {
    // Malformed bodies and query strings share the validation error shape.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );

    // Every route below needs a verified bearer token
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(profile::me)))
            .service(web::resource("/team").route(web::get().to(profile::team)))
            .service(web::resource("/my-punches").route(web::get().to(punch::my_punches)))
            .service(web::resource("/team-punches").route(web::get().to(punch::team_punches)))
            .service(web::resource("/clock").route(web::post().to(punch::clock)))
            .service(web::resource("/punch-update").route(web::post().to(punch::punch_update)))
            .service(web::resource("/punch-approve").route(web::post().to(punch::punch_approve))),
    );
}

// CLOCK
//  └─ POST /api/clock (employee, own punch, pending)

// REVIEW
//  ├─ GET  /api/team-punches (manager: direct reports, admin: everyone else)
//  ├─ POST /api/punch-update
//  └─ POST /api/punch-approve (pending -> approved | rejected)
