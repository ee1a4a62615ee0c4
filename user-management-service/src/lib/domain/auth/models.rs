use std::fmt;

use chrono::DateTime;
use chrono::Utc;

use crate::auth::errors::SecretError;

/// Plaintext secret presented at registration or login.
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 128;

    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    /// Borrow the plaintext for hashing or verification.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check registration format rules: 8 to 128 printable ASCII characters,
    /// no whitespace.
    ///
    /// # Errors
    /// * `TooShort` - Fewer than 8 characters
    /// * `TooLong` - More than 128 characters
    /// * `InvalidCharacters` - Contains whitespace, control or non-ASCII characters
    pub fn check_format(&self) -> Result<(), SecretError> {
        let length = self.0.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(SecretError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(SecretError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }
        if !self.0.chars().all(|c| c.is_ascii_graphic()) {
            return Err(SecretError::InvalidCharacters);
        }
        Ok(())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<String> for Secret {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl From<&str> for Secret {
    fn from(secret: &str) -> Self {
        Self::new(secret.to_string())
    }
}

/// Unique token identifier (the token's `jti` claim), the session cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Bearer token handed back by a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub token_id: TokenId,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("token_id", &self.token_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
