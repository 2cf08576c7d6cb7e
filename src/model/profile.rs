use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Role-bearing record of a person, keyed by the identity provider's subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "7b1c2a9e-43f5-4c4e-9a57-0d9f3c1e2b10",
        "full_name": "Maria Souza",
        "role": "employee",
        "manager_id": "c0a8f1d2-5e6b-4a3c-8d7e-9f0a1b2c3d4e"
    })
)]
pub struct Profile {
    #[schema(example = "7b1c2a9e-43f5-4c4e-9a57-0d9f3c1e2b10")]
    pub id: String,

    #[schema(example = "Maria Souza", nullable = true)]
    pub full_name: Option<String>,

    pub role: Role,

    /// Direct manager; only this one level is consulted for team scope.
    #[schema(nullable = true)]
    pub manager_id: Option<String>,
}
