use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::domain::UserId;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub jti: String,
}

pub fn new_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Hex SHA-256 of `salt:password`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    secrets_match(&hash_password(password, salt), expected_hash)
}

/// Compares SHA-256 digests of both values without short-circuiting, so the
/// time taken does not depend on where the inputs differ.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

pub fn mint_session_token(
    cfg: &AuthConfig,
    user_id: UserId,
) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(cfg.session_ttl_seconds);
    let jti = Uuid::new_v4().to_string();
    let claims = Claims {
        sub: format!("user:{}", user_id.0),
        jti: jti.clone(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )?;
    Ok(IssuedToken {
        token,
        jti,
        expires_at,
    })
}

/// Checks signature and expiry. Returns `None` for any token that does not
/// verify or whose subject is not a user.
pub fn verify_session_token(cfg: &AuthConfig, token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()?;
    let user_id = data.claims.sub.strip_prefix("user:")?.parse().ok()?;
    Some(TokenClaims {
        user_id: UserId(user_id),
        jti: data.claims.jti,
    })
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
