pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use password::{hash_password, verify_dummy_password, verify_password, PasswordError};

/// Claims carried by the admin portal session cookie
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl AdminClaims {
    pub fn new(admin_id: Uuid, email: String, name: String, expiry_hours: i64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours)).timestamp();

        Self {
            sub: admin_id,
            email,
            name,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Claims of the practitioner session token issued by the auth provider
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Authenticated admin, decoded from the admin session cookie
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminSession {
    pub admin_id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<AdminClaims> for AdminSession {
    fn from(claims: AdminClaims) -> Self {
        Self {
            admin_id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token generation error: {0}")]
    Generation(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,
}

pub fn issue_admin_token(claims: &AdminClaims, secret: &str) -> Result<String, TokenError> {
    encode_claims(claims, secret)
}

pub fn decode_admin_token(token: &str, secret: &str) -> Result<AdminSession, TokenError> {
    decode_claims::<AdminClaims>(token, secret).map(AdminSession::from)
}

pub fn decode_user_token(token: &str, secret: &str) -> Result<UserClaims, TokenError> {
    decode_claims(token, secret)
}

fn encode_claims<T: Serialize>(claims: &T, secret: &str) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Generation("signing secret not configured".to_string()));
    }

    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| TokenError::Generation(e.to_string()))
}

fn decode_claims<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Invalid("signing secret not configured".to_string()));
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<T>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-unit-test-secret";

    #[test]
    fn test_admin_token_decodes_to_session() {
        let admin_id = Uuid::new_v4();
        let claims = AdminClaims::new(admin_id, "ops@example.com".into(), "Ops".into(), 1);
        let token = issue_admin_token(&claims, SECRET).unwrap();

        let session = decode_admin_token(&token, SECRET).unwrap();
        assert_eq!(session.admin_id, admin_id);
        assert_eq!(session.email, "ops@example.com");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let claims = AdminClaims::new(Uuid::new_v4(), "ops@example.com".into(), "Ops".into(), 1);
        let token = issue_admin_token(&claims, SECRET).unwrap();

        assert!(matches!(
            decode_admin_token(&token, "another-secret-another-secret-xx"),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_user_token_is_reported_as_expired() {
        let claims = UserClaims {
            sub: Uuid::new_v4(),
            email: "therapist@example.com".into(),
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
            iat: (Utc::now() - Duration::hours(3)).timestamp(),
        };
        let token = encode_claims(&claims, SECRET).unwrap();

        assert!(matches!(decode_user_token(&token, SECRET), Err(TokenError::Expired)));
    }

    #[test]
    fn test_empty_secret_refuses_to_sign() {
        let claims = AdminClaims::new(Uuid::new_v4(), "a@b.c".into(), "A".into(), 1);
        assert!(matches!(issue_admin_token(&claims, ""), Err(TokenError::Generation(_))));
    }
}
