use auth::TokenError;
use thiserror::Error;

use crate::user::errors::LoginIdError;

/// Error for secret format validation at registration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Password too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error("Password contains invalid characters (only printable ASCII without spaces allowed)")]
    InvalidCharacters,
}

/// User-correctable input errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid login: {0}")]
    Login(#[from] LoginIdError),

    #[error("Invalid password: {0}")]
    Secret(#[from] SecretError),
}

/// Error for credential store operations
#[derive(Debug, Clone, Error)]
pub enum CredentialStoreError {
    #[error("Login already exists")]
    LoginAlreadyExists,

    #[error("Stored record is invalid: {0}")]
    CorruptRecord(String),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

/// Error for session cache operations
#[derive(Debug, Clone, Error)]
pub enum SessionCacheError {
    #[error("Failed to encode session record: {0}")]
    Serialization(String),

    #[error("Session cache unavailable: {0}")]
    Unavailable(String),
}

/// Error for event publishing operations
#[derive(Debug, Clone, Error)]
pub enum EventPublisherError {
    #[error("Failed to serialize event: {0}")]
    SerializationFailed(String),

    #[error("Failed to publish event to broker: {0}")]
    PublishFailed(String),

    #[error("Event queue closed: {0}")]
    QueueClosed(String),
}

/// Top-level error for authentication operations
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Login is already registered")]
    Conflict,

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Token-level failures
    #[error("Token is expired")]
    ExpiredToken,

    #[error("Token is malformed: {0}")]
    MalformedToken(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Session is no longer active")]
    SessionRevoked,

    // Infrastructure errors
    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Session cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the error belongs to the single externally visible
    /// "unauthorized" outcome.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::ExpiredToken
                | AuthError::MalformedToken(_)
                | AuthError::InvalidSignature
                | AuthError::SessionRevoked
        )
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => AuthError::Signing(msg),
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Malformed(msg) => AuthError::MalformedToken(msg),
            TokenError::InvalidSignature => AuthError::InvalidSignature,
        }
    }
}

impl From<CredentialStoreError> for AuthError {
    fn from(err: CredentialStoreError) -> Self {
        match err {
            CredentialStoreError::LoginAlreadyExists => AuthError::Conflict,
            CredentialStoreError::CorruptRecord(msg) => AuthError::Internal(msg),
            CredentialStoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl From<SessionCacheError> for AuthError {
    fn from(err: SessionCacheError) -> Self {
        match err {
            SessionCacheError::Serialization(msg) | SessionCacheError::Unavailable(msg) => {
                AuthError::CacheUnavailable(msg)
            }
        }
    }
}
