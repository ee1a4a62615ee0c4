use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::errors::CredentialStoreError;
use crate::auth::ports::CredentialStore;
use crate::domain::user::models::LoginId;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

const LOGIN_UNIQUE_CONSTRAINT: &str = "users_login_key";

/// PostgreSQL-backed credential store and user record repository.
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    login: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CredentialStoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let login = LoginId::new(row.login)
            .map_err(|e| CredentialStoreError::CorruptRecord(e.to_string()))?;

        Ok(User {
            id: UserId(row.id),
            login,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CredentialStore for PostgresUserRepository {
    async fn find_by_login(&self, login: &LoginId) -> Result<Option<User>, CredentialStoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login, password_hash, created_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))?;

        row.map(User::try_from).transpose()
    }

    async fn create_user(
        &self,
        login: &LoginId,
        password_hash: String,
    ) -> Result<User, CredentialStoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, login, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, login, password_hash, created_at
            "#,
        )
        .bind(UserId::new().0)
        .bind(login.as_str())
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(LOGIN_UNIQUE_CONSTRAINT)
                {
                    return CredentialStoreError::LoginAlreadyExists;
                }
            }
            CredentialStoreError::Unavailable(e.to_string())
        })?;

        User::try_from(row)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.map(User::try_from)
            .transpose()
            .map_err(|e| UserError::DatabaseError(e.to_string()))
    }
}
