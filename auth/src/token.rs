use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtHandler;
use crate::jwt::TokenError;

/// A freshly minted access token together with its identifying metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Encoded bearer token
    pub token: String,
    /// Unique token identifier (`jti`)
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Claims extracted from a token whose signature has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<Claims> for VerifiedToken {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let to_datetime = |secs: i64, name: &str| {
            Utc.timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| TokenError::Malformed(format!("Invalid '{}' claim", name)))
        };

        if claims.jti.is_empty() {
            return Err(TokenError::Malformed("Empty 'jti' claim".to_string()));
        }

        Ok(Self {
            issued_at: to_datetime(claims.iat, "iat")?,
            expires_at: to_datetime(claims.exp, "exp")?,
            subject: claims.sub,
            token_id: claims.jti,
        })
    }
}

/// Mints and verifies signed, time-bound access tokens.
///
/// Stateless: holds only the signing keys and the lifetime ceiling, so a single
/// instance can be shared across tasks without coordination.
pub struct TokenEngine {
    jwt_handler: Option<JwtHandler>,
    max_ttl: Duration,
}

impl TokenEngine {
    /// Create a token engine.
    ///
    /// # Arguments
    /// * `secret` - HMAC signing secret; an empty secret leaves the engine without a key
    /// * `max_ttl` - Upper bound applied to every requested token lifetime
    pub fn new(secret: &[u8], max_ttl: Duration) -> Self {
        let jwt_handler = if secret.is_empty() {
            None
        } else {
            Some(JwtHandler::new(secret))
        };

        Self {
            jwt_handler,
            max_ttl,
        }
    }

    /// Issue a token for `subject` expiring after `ttl`, capped at the engine's maximum.
    ///
    /// # Errors
    /// * `Signing` - No signing key is configured or encoding failed
    pub fn issue(&self, subject: impl ToString, ttl: Duration) -> Result<IssuedToken, TokenError> {
        let handler = self.handler()?;

        let lifetime = ttl.min(self.max_ttl);
        if lifetime <= Duration::zero() {
            return Err(TokenError::Signing(
                "Token lifetime must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let claims = Claims::new(subject, now, lifetime);
        let token = handler.encode(&claims)?;
        let verified = VerifiedToken::try_from(claims)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            token_id: verified.token_id,
            issued_at: verified.issued_at,
            expires_at: verified.expires_at,
        })
    }

    /// Verify signature and expiry of `token`.
    ///
    /// # Errors
    /// * `Expired` - Token is past its expiry
    /// * `InvalidSignature` - Signature does not match
    /// * `Malformed` - Token is structurally invalid
    /// * `Signing` - No key is configured to verify with
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.handler()?.decode(token)?.try_into()
    }

    /// Verify the signature of `token`, accepting it even if expired.
    pub fn verify_ignoring_expiry(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.handler()?.decode_allow_expired(token)?.try_into()
    }

    fn handler(&self) -> Result<&JwtHandler, TokenError> {
        self.jwt_handler
            .as_ref()
            .ok_or_else(|| TokenError::Signing("Signing key is not configured".to_string()))
    }
}
