use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{auth::auth::Principal, config::Config, error::AppError, models::Claims};

/// Verifies identity-provider access tokens (HS256, shared secret).
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.jwt_audience.as_deref())
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AppError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid or expired token: {e}")))?;

        if claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Token has no subject".to_string()));
        }

        Ok(Principal {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_AUDIENCE, TEST_SECRET, token_for, token_with_claims};
    use serde_json::json;

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(TEST_SECRET, Some(TEST_AUDIENCE))
    }

    #[test]
    fn accepts_valid_token() {
        let principal = verifier().verify(&token_for("user-1")).unwrap();
        assert_eq!(principal.user_id, "user-1");
    }

    #[test]
    fn rejects_expired_token() {
        let token = token_with_claims(json!({
            "sub": "user-1",
            "aud": TEST_AUDIENCE,
            "exp": 1_000_000,
        }));
        let err = verifier().verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn rejects_wrong_audience_and_empty_subject() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let wrong_aud = token_with_claims(json!({"sub": "u", "aud": "service_role", "exp": exp}));
        assert!(verifier().verify(&wrong_aud).is_err());

        let no_sub = token_with_claims(json!({"sub": " ", "aud": TEST_AUDIENCE, "exp": exp}));
        assert!(verifier().verify(&no_sub).is_err());
    }

    #[test]
    fn rejects_foreign_signature() {
        let other = JwtVerifier::new("another-secret", Some(TEST_AUDIENCE));
        assert!(other.verify(&token_for("user-1")).is_err());
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
