use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::IdentityError;

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user email
    pub uid: String, // user ID as a string
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
}

/// Signs and parses session tokens. Keys are derived from the configured
/// secret once, at construction.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::seconds(config.ttl_seconds),
        }
    }

    pub fn issue(&self, email: &str, uid: Uuid) -> Result<String, IdentityError> {
        self.issue_at(email, uid, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        email: &str,
        uid: Uuid,
        now: OffsetDateTime,
    ) -> Result<String, IdentityError> {
        let exp = now + self.ttl;
        let claims = Claims {
            sub: email.to_string(),
            uid: uid.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| IdentityError::Internal(anyhow::anyhow!("token signing failed: {e}")))?;
        debug!(uid = %uid, "session token signed");
        Ok(token)
    }

    /// Verify signature and expiration, returning the claims.
    pub fn parse(&self, token: &str) -> Result<Claims, IdentityError> {
        let mut validation = Validation::default();
        // No leeway: a token is invalid the second its exp passes.
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::TokenInvalid,
            }
        })?;
        debug!(uid = %data.claims.uid, "session token verified");
        Ok(data.claims)
    }
}
