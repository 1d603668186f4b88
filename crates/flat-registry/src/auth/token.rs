//! Signed identity tokens (HS256 JWT) carrying a user id, a role and an absolute expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{Identity, Role, UserId};
use crate::config::AuthConfig;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds, rounded up so the JWT check never fires first)
    pub exp: i64,
    /// Expiration (unix milliseconds); the authoritative instant
    pub exp_ms: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies tokens with a process-wide secret fixed at construction.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the current instant with no skew allowance.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            default_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let ttl = Duration::from_std(config.token_ttl).map_err(|_| TokenError::ExpiryOutOfRange)?;
        Ok(Self::new(config.signing_secret.as_bytes(), ttl))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Produce a signed token for `user_id` valid for `ttl` from now.
    pub fn issue(&self, user_id: UserId, role: Role, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;

        let exp_ms = expires_at.timestamp_millis();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp_ms.div_euclid(1000) + i64::from(exp_ms.rem_euclid(1000) != 0),
            exp_ms,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Validate signature and expiry, returning the identity the token asserts.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            }
        })?;

        if Utc::now().timestamp_millis() >= data.claims.exp_ms {
            return Err(TokenError::Expired);
        }

        let user_id = data
            .claims
            .sub
            .parse::<Uuid>()
            .map(UserId)
            .map_err(|_| TokenError::Malformed)?;

        Ok(Identity {
            user_id,
            role: data.claims.role,
        })
    }
}
