use serde::{Deserialize, Serialize};

/// Claims read from identity-provider access tokens.
///
/// `exp` and `aud` are checked by the validator; only `sub` identifies the
/// principal.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
}
