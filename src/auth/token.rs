//! Session token issuing and validation.
//!
//! Tokens are HS256 JWTs. The issuer and the validator are built from the same
//! [`JwtSettings`] and hold no per-session state.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::error::AppError;
use crate::models::User;

/// Fixed validity window of every token.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Identity claims embedded in a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User id, as a string per JWT convention.
    pub sub: String,
    pub email: String,
    pub name: String,
    /// Unique token id.
    pub jti: String,
    /// Issued at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch. The token is valid while `now < exp`.
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    /// The numeric user id, if `sub` holds one.
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// A freshly minted token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub claims: Claims,
}

/// Why a presented token was refused. Kept for local diagnostics only; callers
/// over HTTP always see a plain 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token issuer does not match")]
    WrongIssuer,
    #[error("token audience does not match")]
    WrongAudience,
    #[error("token has expired")]
    Expired,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    pub fn issue(&self, user: &User) -> Result<SessionToken, AppError> {
        self.issue_at(user, Utc::now())
    }

    /// Mints a token as if the current time were `now`.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<SessionToken, AppError> {
        let issued_at = now.timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at,
            exp: issued_at + Duration::hours(TOKEN_LIFETIME_HOURS).num_seconds(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::ServerFault(format!("Failed to generate token: {}", e)))?;
        Ok(SessionToken { token, claims })
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl TokenValidator {
    pub fn new(settings: &JwtSettings) -> Self {
        // jsonwebtoken only checks the signature here. Issuer, audience and
        // expiry are checked below so they run in a fixed order with `now < exp`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenRejection> {
        self.validate_at(token, Utc::now())
    }

    /// Checks signature, issuer, audience, then expiry against `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenRejection> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                _ => TokenRejection::Malformed,
            })?
            .claims;

        if claims.iss != self.issuer {
            return Err(TokenRejection::WrongIssuer);
        }
        if claims.aud != self.audience {
            return Err(TokenRejection::WrongAudience);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenRejection::Expired);
        }
        Ok(claims)
    }
}
