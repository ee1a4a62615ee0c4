use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenEngine;
use chrono::Utc;
use tokio::sync::OnceCell;

use crate::auth::errors::AuthError;
use crate::auth::errors::ValidationError;
use crate::auth::events::AuthEvent;
use crate::auth::models::AccessToken;
use crate::auth::models::Secret;
use crate::auth::models::TokenId;
use crate::auth::ports::AuthServicePort;
use crate::auth::ports::CredentialStore;
use crate::auth::ports::EventPublisher;
use crate::auth::ports::SessionCache;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::UserId;

/// Shortest TTL handed to the session cache. Never longer than the token's
/// remaining lifetime unless that lifetime is already spent.
const MIN_SESSION_TTL: Duration = Duration::from_millis(1);

/// Tunables for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Lifetime requested for each issued token (the token engine caps it)
    pub token_ttl: chrono::Duration,
}

/// Domain service orchestrating credential checks, token issuance, session
/// records and authentication events.
///
/// Holds no mutable state of its own; every request works against the store
/// and cache, so instances are shared behind an `Arc` without locking.
pub struct AuthService<CS, SC, EP>
where
    CS: CredentialStore,
    SC: SessionCache,
    EP: EventPublisher,
{
    store: Arc<CS>,
    cache: Arc<SC>,
    event_publisher: Arc<EP>,
    token_engine: TokenEngine,
    password_hasher: PasswordHasher,
    settings: AuthSettings,
    // Hash compared against when a login is unknown, so both paths pay for a verification
    decoy_hash: OnceCell<String>,
}

impl<CS, SC, EP> AuthService<CS, SC, EP>
where
    CS: CredentialStore,
    SC: SessionCache,
    EP: EventPublisher,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential persistence implementation
    /// * `cache` - Session record cache implementation
    /// * `event_publisher` - Event publishing implementation (should not wait on the broker)
    /// * `token_engine` - Token signer/verifier
    /// * `settings` - Token lifetime settings
    pub fn new(
        store: Arc<CS>,
        cache: Arc<SC>,
        event_publisher: Arc<EP>,
        token_engine: TokenEngine,
        settings: AuthSettings,
    ) -> Self {
        Self {
            store,
            cache,
            event_publisher,
            token_engine,
            password_hasher: PasswordHasher::new(),
            settings,
            decoy_hash: OnceCell::new(),
        }
    }

    /// Replace the password hasher used for new registrations.
    pub fn with_password_hasher(mut self, password_hasher: PasswordHasher) -> Self {
        self.password_hasher = password_hasher;
        self
    }

    async fn hash_secret(&self, secret: Secret) -> Result<String, AuthError> {
        let hasher = self.password_hasher.clone();

        tokio::task::spawn_blocking(move || hasher.hash(secret.expose()))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Burn a verification against a decoy hash so unknown logins take as
    /// long as wrong passwords.
    async fn verify_decoy(&self, secret: &Secret) {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hash_secret(Secret::from("decoy-credential")))
            .await;

        match decoy {
            Ok(hash) => {
                let _ = self.store.verify_password_hash(secret, hash).await;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to prepare decoy password hash"),
        }
    }

    async fn publish(&self, event: AuthEvent) {
        if let Err(e) = self.event_publisher.publish(&event).await {
            tracing::error!(
                event_type = event.kind.as_str(),
                event_id = %event.event_id,
                user_id = %event.user_id,
                error = %e,
                "Failed to publish auth event"
            );
        }
    }
}

#[async_trait]
impl<CS, SC, EP> AuthServicePort for AuthService<CS, SC, EP>
where
    CS: CredentialStore,
    SC: SessionCache,
    EP: EventPublisher,
{
    async fn register(&self, login: &str, secret: Secret) -> Result<UserId, AuthError> {
        let login = LoginId::new(login.to_string()).map_err(ValidationError::from)?;
        secret.check_format().map_err(ValidationError::from)?;

        let password_hash = self.hash_secret(secret).await?;
        let user = self.store.create_user(&login, password_hash).await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.publish(AuthEvent::registered(user.id)).await;

        Ok(user.id)
    }

    async fn login(&self, login: &str, secret: Secret) -> Result<AccessToken, AuthError> {
        // A login that cannot exist is reported like any other credential mismatch
        let login = match LoginId::new(login.to_string()) {
            Ok(login) => login,
            Err(_) => {
                self.verify_decoy(&secret).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let user = match self.store.find_by_login(&login).await? {
            Some(user) => user,
            None => {
                self.verify_decoy(&secret).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self
            .store
            .verify_password_hash(&secret, &user.password_hash)
            .await?
        {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self
            .token_engine
            .issue(user.id, self.settings.token_ttl)?;
        let token_id = TokenId::new(issued.token_id);
        let ttl = (issued.expires_at - Utc::now())
            .to_std()
            .unwrap_or(MIN_SESSION_TTL)
            .max(MIN_SESSION_TTL);

        let pending = PendingSession::new(Arc::clone(&self.cache), token_id.clone());
        self.cache.put(&token_id, &user.id, ttl).await?;
        self.publish(AuthEvent::login(user.id)).await;
        pending.commit();

        tracing::info!(user_id = %user.id, token_id = %token_id, "Session opened");

        Ok(AccessToken {
            token: issued.token,
            token_id,
            expires_at: issued.expires_at,
        })
    }

    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let verified = self.token_engine.verify(token)?;
        let user_id = UserId::from_string(&verified.subject)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        let token_id = TokenId::new(verified.token_id);

        match self.cache.get(&token_id).await? {
            Some(owner) if owner == user_id => Ok(user_id),
            Some(owner) => {
                tracing::warn!(
                    token_id = %token_id,
                    token_subject = %user_id,
                    session_owner = %owner,
                    "Session owner does not match token subject"
                );
                Err(AuthError::SessionRevoked)
            }
            None => {
                tracing::debug!(token_id = %token_id, "No active session for token");
                Err(AuthError::SessionRevoked)
            }
        }
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let verified = self.token_engine.verify_ignoring_expiry(token)?;
        let user_id = UserId::from_string(&verified.subject)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        let token_id = TokenId::new(verified.token_id);

        if self.cache.delete(&token_id).await? {
            tracing::info!(user_id = %user_id, token_id = %token_id, "Session closed");
            self.publish(AuthEvent::logout(user_id)).await;
        } else {
            tracing::debug!(token_id = %token_id, "Session already closed");
        }

        Ok(())
    }
}

/// Session record written during a login that has not yet returned its token.
///
/// Dropping it without `commit` (the login future was cancelled or failed after
/// the write) schedules removal of the record, so a token that never reached
/// the caller leaves no live session behind.
struct PendingSession<SC: SessionCache> {
    cache: Arc<SC>,
    token_id: Option<TokenId>,
}

impl<SC: SessionCache> PendingSession<SC> {
    fn new(cache: Arc<SC>, token_id: TokenId) -> Self {
        Self {
            cache,
            token_id: Some(token_id),
        }
    }

    fn commit(mut self) {
        self.token_id = None;
    }
}

impl<SC: SessionCache> Drop for PendingSession<SC> {
    fn drop(&mut self) {
        let Some(token_id) = self.token_id.take() else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(token_id = %token_id, "No runtime to remove abandoned session");
            return;
        };

        let cache = Arc::clone(&self.cache);
        runtime.spawn(async move {
            match cache.delete(&token_id).await {
                Ok(_) => tracing::debug!(token_id = %token_id, "Abandoned session removed"),
                Err(e) => tracing::warn!(
                    token_id = %token_id,
                    error = %e,
                    "Failed to remove abandoned session"
                ),
            }
        });
    }
}
