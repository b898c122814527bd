use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shortest accepted symmetric signing key, in bytes
pub const MIN_SECRET_KEY_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,

    #[error("invalid key size: must be at least {MIN_SECRET_KEY_SIZE} bytes, got {0}")]
    InvalidKey(usize),

    #[error("token duration must be at least one second")]
    InvalidDuration,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Verified contents of a session token. Never persisted; rebuilt from the
/// signed token on every verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPayload {
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenPayload {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Wire claims. Timestamps are unix seconds.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    jti: Uuid,
    iat: i64,
    exp: i64,
}

impl TryFrom<Claims> for TokenPayload {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::InvalidToken)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::InvalidToken)?;
        if expires_at <= issued_at {
            return Err(TokenError::InvalidToken);
        }
        Ok(Self {
            id: claims.jti,
            username: claims.sub,
            issued_at,
            expires_at,
        })
    }
}

/// Issues and verifies signed, time-bounded session tokens
pub trait TokenMaker: Send + Sync {
    fn issue(&self, username: &str, duration: Duration) -> Result<(String, TokenPayload), TokenError>;
    fn verify(&self, token: &str) -> Result<TokenPayload, TokenError>;
}

/// HS256 JWT token maker. The key is handed in once at construction and
/// lives as long as the maker.
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtMaker {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::InvalidKey(secret.len()));
        }

        // Expiry is checked against our own clock in verify_at, with no leeway
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Issue a token as of `now`. Sub-second parts of `now` and `duration`
    /// are dropped so the signed payload round-trips exactly.
    pub fn issue_at(
        &self,
        username: &str,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(String, TokenPayload), TokenError> {
        let seconds = duration.num_seconds();
        if seconds <= 0 {
            return Err(TokenError::InvalidDuration);
        }

        let claims = Claims {
            sub: username.to_string(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: now.timestamp() + seconds,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let payload = TokenPayload::try_from(claims)?;

        Ok((token, payload))
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenPayload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;
        let payload = TokenPayload::try_from(data.claims)?;

        if !payload.is_valid_at(now) {
            return Err(TokenError::InvalidToken);
        }
        Ok(payload)
    }
}

impl TokenMaker for JwtMaker {
    fn issue(&self, username: &str, duration: Duration) -> Result<(String, TokenPayload), TokenError> {
        self.issue_at(username, duration, Utc::now())
    }

    fn verify(&self, token: &str) -> Result<TokenPayload, TokenError> {
        self.verify_at(token, Utc::now())
    }
}
