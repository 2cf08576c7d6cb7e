use crate::api::punch::{
    ClockRequest, PunchApproveRequest, PunchEnvelope, PunchFilterParams, PunchUpdateRequest,
};
use crate::error::ErrorResponse;
use crate::model::profile::Profile;
use crate::model::punch::{ApprovalStatus, Punch, PunchType};
use crate::model::role::Role;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Punchclock API",
        version = "1.0.0",
        description = r#"
## Employee time clock

Employees record punches (clock in, clock out, break start, break end) with
optional geolocation. Managers and admins review the punches of their team:
they correct notes and times, and approve or reject pending punches.

### 🔐 Security
Every `/api` endpoint expects an identity-provider access token in
`Authorization: Bearer <token>`. The token subject is the caller's profile id.

### 👥 Visibility
- **employee**: own punches only
- **manager**: own punches plus those of direct reports
- **admin**: everyone

### 📦 Errors
Failures share one body: `{"error": "<kind>", "detail": "<text>"}`.
"#,
    ),
    paths(
        crate::api::profile::me,
        crate::api::profile::team,

        crate::api::punch::my_punches,
        crate::api::punch::clock,
        crate::api::punch::team_punches,
        crate::api::punch::punch_update,
        crate::api::punch::punch_approve
    ),
    components(
        schemas(
            Profile,
            Role,
            Punch,
            PunchType,
            ApprovalStatus,
            ClockRequest,
            PunchUpdateRequest,
            PunchApproveRequest,
            PunchFilterParams,
            PunchEnvelope,
            ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Profile", description = "Caller profile and team directory"),
        (name = "Punch", description = "Clocking, correction and approval of punches"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
