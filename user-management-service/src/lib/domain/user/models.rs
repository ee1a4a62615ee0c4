use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::LoginIdError;
use crate::user::errors::UserIdError;

/// User aggregate entity.
///
/// Owned by the credential store. Only the password hash changes after creation.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub login: LoginId,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    ///
    /// # Returns
    /// UserId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Login identifier value type (an e-mail address).
///
/// Surrounding whitespace is trimmed and the address is lower-cased so that
/// uniqueness is enforced case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoginId(String);

impl LoginId {
    const MAX_LENGTH: usize = 254;

    /// Create a new validated login identifier.
    ///
    /// # Errors
    /// * `Empty` - Nothing left after trimming
    /// * `TooLong` - Longer than 254 characters
    /// * `InvalidFormat` - Not an RFC 5322 address
    pub fn new(login: String) -> Result<Self, LoginIdError> {
        let login = login.trim().to_lowercase();

        if login.is_empty() {
            return Err(LoginIdError::Empty);
        }

        let length = login.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(LoginIdError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        email_address::EmailAddress::from_str(&login)
            .map(|_| LoginId(login))
            .map_err(|e| LoginIdError::InvalidFormat(e.to_string()))
    }

    /// Get login as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_id_normalizes() {
        let login = LoginId::new("  Alice@X.com ".to_string()).unwrap();
        assert_eq!(login.as_str(), "alice@x.com");
    }

    #[test]
    fn test_login_id_rejects_invalid_email() {
        assert!(matches!(
            LoginId::new("not-an-email".to_string()),
            Err(LoginIdError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_login_id_rejects_empty() {
        assert_eq!(LoginId::new("   ".to_string()), Err(LoginIdError::Empty));
    }

    #[test]
    fn test_login_id_rejects_too_long() {
        let login = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            LoginId::new(login),
            Err(LoginIdError::TooLong { max: 254, .. })
        ));
    }

    #[test]
    fn test_user_id_round_trip() {
        let id = UserId::new();
        assert_eq!(UserId::from_string(&id.to_string()), Ok(id));
        assert!(UserId::from_string("nope").is_err());
    }
}
