//! HS256 access tokens.
//!
//! Access tokens are never stored. They ride in response bodies and come
//! back as `Authorization: Bearer`; the refresh cookie is what outlives them.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use classmark_config::JwtConfig;
use classmark_core::AppError;

use crate::claims::{AccessClaims, PrincipalKind};

fn rejected() -> AppError {
    AppError::unauthorized("Invalid or expired token".to_string())
}

fn claims_at(subject: Uuid, kind: PrincipalKind, issued_at: i64, ttl_secs: i64) -> AccessClaims {
    let iat = issued_at.max(0) as usize;
    AccessClaims {
        sub: subject.to_string(),
        kind,
        iat,
        exp: iat.saturating_add(ttl_secs.max(0) as usize),
    }
}

fn sign(claims: &AccessClaims, jwt_config: &JwtConfig) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to sign access token: {}", e)))
}

/// Mints an access token for `subject` valid for
/// [`JwtConfig::access_token_expiry`] seconds.
pub fn create_access_token(
    subject: Uuid,
    kind: PrincipalKind,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let claims = claims_at(
        subject,
        kind,
        Utc::now().timestamp(),
        jwt_config.access_token_expiry,
    );
    sign(&claims, jwt_config)
}

/// Verifies signature and expiry (no leeway) and that the token was minted
/// for `kind`. Every failure is the same 401.
pub fn verify_access_token(
    token: &str,
    kind: PrincipalKind,
    jwt_config: &JwtConfig,
) -> Result<AccessClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &validation,
    )
    .map_err(|_| rejected())?
    .claims;

    if claims.kind != kind {
        return Err(rejected());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_expiry: 900,
        }
    }

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    #[test]
    fn test_round_trip_keeps_subject_and_kind() {
        let config = config(SECRET);
        let teacher_id = Uuid::new_v4();

        let token = create_access_token(teacher_id, PrincipalKind::Teacher, &config).unwrap();
        let claims = verify_access_token(&token, PrincipalKind::Teacher, &config).unwrap();

        assert_eq!(claims.sub, teacher_id.to_string());
        assert_eq!(claims.kind, PrincipalKind::Teacher);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_student_token_is_not_a_teacher_token() {
        let config = config(SECRET);
        let token = create_access_token(Uuid::new_v4(), PrincipalKind::Student, &config).unwrap();

        let err = verify_access_token(&token, PrincipalKind::Teacher, &config).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_rejected_without_leeway() {
        let config = config(SECRET);
        let issued = Utc::now().timestamp() - 910;
        let claims = claims_at(Uuid::new_v4(), PrincipalKind::Student, issued, 900);
        let token = sign(&claims, &config).unwrap();

        assert!(verify_access_token(&token, PrincipalKind::Student, &config).is_err());
    }

    #[test]
    fn test_garbage_and_foreign_signatures() {
        let ours = config(SECRET);
        let theirs = config("different-secret-key-at-least-32-characters");
        let token = create_access_token(Uuid::new_v4(), PrincipalKind::Teacher, &theirs).unwrap();

        assert!(verify_access_token("not.a.jwt", PrincipalKind::Teacher, &ours).is_err());
        assert!(verify_access_token(&token, PrincipalKind::Teacher, &ours).is_err());
    }
}
