#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenEngine;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::sync::Semaphore;
use user_management_service::auth::errors::CredentialStoreError;
use user_management_service::auth::errors::EventPublisherError;
use user_management_service::auth::events::AuthEvent;
use user_management_service::auth::ports::CredentialStore;
use user_management_service::auth::ports::EventPublisher;
use user_management_service::auth::service::AuthService;
use user_management_service::auth::service::AuthSettings;
use user_management_service::domain::user::models::LoginId;
use user_management_service::domain::user::models::User;
use user_management_service::domain::user::models::UserId;
use user_management_service::domain::user::ports::UserRepository;
use user_management_service::domain::user::service::UserService;
use user_management_service::inbound::http::router::create_router;
use user_management_service::outbound::cache::InMemorySessionCache;
use user_management_service::outbound::events::EventDispatcher;
use user_management_service::user::errors::UserError;

pub const TOKEN_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server backed by in-memory adapters
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub users: Arc<InMemoryUserStore>,
    pub sessions: Arc<InMemorySessionCache>,
    pub token_engine: TokenEngine,
    events: Mutex<mpsc::UnboundedReceiver<AuthEvent>>,
    broker_gate: Arc<Semaphore>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with_token_ttl(chrono::Duration::hours(1)).await
    }

    pub async fn spawn_with_token_ttl(token_ttl: chrono::Duration) -> Self {
        Self::spawn_with(token_ttl, 16, true).await
    }

    /// Spawn with a one-slot event queue whose broker holds every delivery
    /// until `open_broker` is called
    pub async fn spawn_with_stalled_broker() -> Self {
        Self::spawn_with(chrono::Duration::hours(1), 1, false).await
    }

    async fn spawn_with(token_ttl: chrono::Duration, queue_capacity: usize, broker_open: bool) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let users = Arc::new(InMemoryUserStore::default());
        let sessions = Arc::new(InMemorySessionCache::new());

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let broker_gate = Arc::new(Semaphore::new(usize::from(broker_open)));
        let publisher = RecordingPublisher {
            tx: events_tx,
            gate: Arc::clone(&broker_gate),
        };
        let (dispatcher, _worker) = EventDispatcher::spawn(Arc::new(publisher), queue_capacity, 1);

        let auth_service = AuthService::new(
            Arc::clone(&users),
            Arc::clone(&sessions),
            Arc::new(dispatcher),
            TokenEngine::new(TOKEN_SECRET, chrono::Duration::hours(24)),
            AuthSettings { token_ttl },
        )
        .with_password_hasher(PasswordHasher::with_params(1024, 1, 1).unwrap());
        let user_service = UserService::new(Arc::clone(&users));

        let router = create_router(
            Arc::new(auth_service),
            Arc::new(user_service),
            Duration::from_secs(10),
        );

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::new(),
            users,
            sessions,
            token_engine: TokenEngine::new(TOKEN_SECRET, chrono::Duration::hours(24)),
            events: Mutex::new(events_rx),
            broker_gate,
        }
    }

    /// Let a stalled broker start accepting events
    pub fn open_broker(&self) {
        self.broker_gate.add_permits(1);
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    pub async fn register(&self, login: &str, password: &str) -> reqwest::Response {
        self.post("/auth/register")
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, login: &str, password: &str) -> reqwest::Response {
        self.post("/auth/login")
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn logout(&self, token: &str) -> reqwest::Response {
        self.post_authenticated("/auth/logout", token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register a user and return its id
    pub async fn register_user(&self, login: &str, password: &str) -> String {
        let body: serde_json::Value = self
            .register(login, password)
            .await
            .json()
            .await
            .expect("Failed to parse response");
        body["data"]["user_id"]
            .as_str()
            .expect("Missing user_id")
            .to_string()
    }

    /// Log in and return the bearer token
    pub async fn login_token(&self, login: &str, password: &str) -> String {
        let body: serde_json::Value = self
            .login(login, password)
            .await
            .json()
            .await
            .expect("Failed to parse response");
        body["data"]["token"]
            .as_str()
            .expect("Missing token")
            .to_string()
    }

    /// Wait for the next event delivered by the background dispatcher
    pub async fn next_event(&self) -> AuthEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.lock().await.recv())
            .await
            .expect("Timed out waiting for event")
            .expect("Event channel closed")
    }

    /// Assert that no further event is delivered within a short grace period
    pub async fn assert_no_event(&self) {
        let next =
            tokio::time::timeout(Duration::from_millis(200), self.events.lock().await.recv()).await;
        assert!(next.is_err(), "Unexpected event: {:?}", next);
    }
}

/// Credential store keeping users in memory
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<LoginId, User>>,
}

impl InMemoryUserStore {
    pub async fn count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserStore {
    async fn find_by_login(&self, login: &LoginId) -> Result<Option<User>, CredentialStoreError> {
        Ok(self.users.lock().await.get(login).cloned())
    }

    async fn create_user(
        &self,
        login: &LoginId,
        password_hash: String,
    ) -> Result<User, CredentialStoreError> {
        let mut users = self.users.lock().await;
        if users.contains_key(login) {
            return Err(CredentialStoreError::LoginAlreadyExists);
        }

        let user = User {
            id: UserId::new(),
            login: login.clone(),
            password_hash,
            created_at: Utc::now(),
        };
        users.insert(login.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.id == *id)
            .cloned())
    }
}

/// Publisher forwarding every delivered event to the test once its gate is open
struct RecordingPublisher {
    tx: mpsc::UnboundedSender<AuthEvent>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &AuthEvent) -> Result<(), EventPublisherError> {
        let _open = self
            .gate
            .acquire()
            .await
            .map_err(|e| EventPublisherError::PublishFailed(e.to_string()))?;
        self.tx
            .send(event.clone())
            .map_err(|e| EventPublisherError::PublishFailed(e.to_string()))
    }
}
