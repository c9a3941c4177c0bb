//! Service-token authentication for the internal operation-API surface.
//!
//! The core never owns credentials — identity always originates from the
//! chat platform. This HMAC-signed JWT carries a platform user/team pair,
//! not a local login.

use crate::error::{Error, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceClaims {
    /// Platform user id (not an internal UUID — resolved via `get_or_create_user`).
    pub sub: String,
    pub team: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
    pub iat: i64,
}

pub fn generate_service_token(
    platform_user_id: &str,
    platform_team_id: &str,
    admin: bool,
    secret: &str,
    expiration_minutes: i64,
) -> Result<String> {
    let now = Utc::now();
    let claims = ServiceClaims {
        sub: platform_user_id.to_string(),
        team: platform_team_id.to_string(),
        admin,
        exp: (now + Duration::minutes(expiration_minutes)).timestamp(),
        iat: now.timestamp(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| Error::Internal(format!("failed to generate service token: {}", e)))
}

pub fn verify_service_token(token: &str, secret: &str) -> Result<ServiceClaims> {
    decode::<ServiceClaims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            let msg = e.to_string().to_lowercase();
            if msg.contains("expired") {
                Error::Unauthorized("service token has expired".to_string())
            } else {
                Error::Unauthorized(format!("invalid service token: {}", e))
            }
        })
}

pub fn authenticate_from_header(auth_header: Option<&str>, secret: &str) -> Result<ServiceClaims> {
    let token = extract_bearer(auth_header)?;
    verify_service_token(&token, secret)
}

fn extract_bearer(auth_header: Option<&str>) -> Result<String> {
    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            let token = header[7..].to_string();
            if token.is_empty() {
                return Err(Error::Unauthorized("empty bearer token".to_string()));
            }
            Ok(token)
        }
        Some(_) => Err(Error::Unauthorized(
            "invalid Authorization header, expected 'Bearer <token>'".to_string(),
        )),
        None => Err(Error::Unauthorized("missing Authorization header".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims() {
        let token = generate_service_token("U123", "T456", false, "a-secret-key-that-is-long-enough", 15).unwrap();
        let claims = verify_service_token(&token, "a-secret-key-that-is-long-enough").unwrap();
        assert_eq!(claims.sub, "U123");
        assert_eq!(claims.team, "T456");
        assert!(!claims.admin);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = generate_service_token("U123", "T456", false, "secret-one-long-enough", 15).unwrap();
        assert!(verify_service_token(&token, "secret-two-long-enough").is_err());
    }

    #[test]
    fn rejects_missing_header() {
        assert!(authenticate_from_header(None, "secret").is_err());
    }
}
