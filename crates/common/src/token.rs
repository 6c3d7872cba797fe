//! Signed, expiring bearer tokens (JWT, HMAC-SHA256).
//!
//! Tokens carry a single subject identity plus issue and expiry times. They
//! are signed with one shared server secret; any HMAC variant is accepted on
//! verification, every other algorithm is rejected.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Claim set embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The identity this token speaks for
    pub sub: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds); the token is invalid once `now >= exp`
    pub exp: i64,
}

impl Claims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Issues and verifies tokens for a single shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_lifetime(secret, DEFAULT_TOKEN_LIFETIME)
    }

    pub fn with_lifetime(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // expiry is checked against `now >= exp` below, without leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Build claims for `subject` valid from now for the configured lifetime,
    /// and sign them.
    pub fn issue(&self, subject: &str) -> Result<(String, Claims), TokenError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.lifetime.as_secs() as i64,
        };
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    /// Sign an arbitrary claim set with HS256.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify `token` as of the unix time `now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        if data.claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

/// Issue a token for `subject` signed with `secret`, using the default lifetime.
pub fn issue(secret: &[u8], subject: &str) -> Result<(String, Claims), TokenError> {
    TokenCodec::new(secret).issue(subject)
}

/// Verify `token` against `secret`.
pub fn verify(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    TokenCodec::new(secret).verify(token)
}
