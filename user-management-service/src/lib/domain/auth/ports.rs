use std::time::Duration;

use async_trait::async_trait;

use crate::auth::errors::AuthError;
use crate::auth::errors::CredentialStoreError;
use crate::auth::errors::EventPublisherError;
use crate::auth::errors::SessionCacheError;
use crate::auth::events::AuthEvent;
use crate::auth::models::AccessToken;
use crate::auth::models::Secret;
use crate::auth::models::TokenId;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Port for authentication and session operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new user with a login and secret.
    ///
    /// # Returns
    /// Identifier of the created user
    ///
    /// # Errors
    /// * `Validation` - Login or secret fails format rules
    /// * `Conflict` - Login is already registered
    /// * `StoreUnavailable` - Credential store failed
    async fn register(&self, login: &str, secret: Secret) -> Result<UserId, AuthError>;

    /// Verify credentials and open a session.
    ///
    /// # Returns
    /// Signed access token backed by a session record
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown login or wrong secret (deliberately undifferentiated)
    /// * `Signing` / `StoreUnavailable` / `CacheUnavailable` - Infrastructure failed
    async fn login(&self, login: &str, secret: Secret) -> Result<AccessToken, AuthError>;

    /// Resolve a bearer token to the user owning its active session.
    ///
    /// # Errors
    /// * `ExpiredToken` / `MalformedToken` / `InvalidSignature` - Token rejected
    /// * `SessionRevoked` - Signature valid but session ended (logout or expiry)
    /// * `CacheUnavailable` - Session cache failed
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;

    /// End the session behind a token. Expired tokens are accepted; repeating
    /// the call is a no-op.
    ///
    /// # Errors
    /// * `MalformedToken` / `InvalidSignature` - Token rejected
    /// * `CacheUnavailable` - Session cache failed
    async fn logout(&self, token: &str) -> Result<(), AuthError>;
}

/// Durable persistence of user identity and hashed credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Retrieve user by login.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn find_by_login(&self, login: &LoginId) -> Result<Option<User>, CredentialStoreError>;

    /// Persist a new user.
    ///
    /// # Errors
    /// * `LoginAlreadyExists` - Uniqueness constraint on login rejected the insert
    /// * `Unavailable` - Storage operation failed
    async fn create_user(
        &self,
        login: &LoginId,
        password_hash: String,
    ) -> Result<User, CredentialStoreError>;

    /// Compare a candidate secret with a stored Argon2 hash.
    ///
    /// Runs the memory-hard verification on the blocking pool.
    ///
    /// # Errors
    /// * `CorruptRecord` - Stored hash is not a valid PHC string
    /// * `Unavailable` - Verification task failed
    async fn verify_password_hash(
        &self,
        candidate: &Secret,
        stored_hash: &str,
    ) -> Result<bool, CredentialStoreError> {
        let candidate = candidate.clone();
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || {
            auth::PasswordHasher::new().verify(candidate.expose(), &stored_hash)
        })
        .await
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))?
        .map_err(|e| CredentialStoreError::CorruptRecord(e.to_string()))
    }
}

/// TTL-bound storage for active session records.
#[async_trait]
pub trait SessionCache: Send + Sync + 'static {
    /// Store a session record, replacing any record with the same token ID.
    ///
    /// # Errors
    /// * `Unavailable` - Cache operation failed
    async fn put(
        &self,
        token_id: &TokenId,
        user_id: &UserId,
        ttl: Duration,
    ) -> Result<(), SessionCacheError>;

    /// Look up the user owning an active session.
    ///
    /// # Returns
    /// Optional user ID (None once the record expired or was deleted)
    ///
    /// # Errors
    /// * `Unavailable` - Cache operation failed
    async fn get(&self, token_id: &TokenId) -> Result<Option<UserId>, SessionCacheError>;

    /// Remove a session record.
    ///
    /// # Returns
    /// Whether a record was removed; an absent key is not an error
    ///
    /// # Errors
    /// * `Unavailable` - Cache operation failed
    async fn delete(&self, token_id: &TokenId) -> Result<bool, SessionCacheError>;
}

/// Event publishing for authentication events.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    /// Publish an authentication event.
    ///
    /// # Errors
    /// * `SerializationFailed` - Event serialization failed
    /// * `PublishFailed` - Failed to publish to broker
    /// * `QueueClosed` - Background dispatcher is no longer running
    async fn publish(&self, event: &AuthEvent) -> Result<(), EventPublisherError>;
}
