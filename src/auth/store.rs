use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::password::PasswordHasher;

/// Canonical form of an email for storage and lookup: trimmed, lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// User record without credential material; the default read shape.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Same record with the stored hash; fetched only when a password
/// has to be checked.
#[derive(Debug, Clone, FromRow)]
pub struct UserWithHash {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl UserWithHash {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Validated registration input; the only way into `UserStore::create`.
/// The plaintext password never leaves this struct unhashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    password: String,
}

impl NewUser {
    /// Trims the name, normalizes the email and checks required fields.
    pub fn new(name: &str, email: &str, password: &str) -> Result<Self, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".into()));
        }
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthError::Validation(
                "Please enter a valid email address".into(),
            ));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".into()));
        }
        Ok(Self {
            name: name.to_string(),
            email,
            password: password.to_string(),
        })
    }

    /// Read once by the store when hashing, immediately before the write.
    pub fn raw_password(&self) -> &str {
        &self.password
    }
}

/// Persistence contract for user records. Lookups accept any-case input
/// and match on the normalized email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email, without credential material.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Same lookup, including the stored hash.
    async fn find_by_email_with_hash(&self, email: &str)
        -> Result<Option<UserWithHash>, AuthError>;

    /// Hashes the password and inserts the record. A duplicate email is
    /// `EmailAlreadyExists`, even when two creates race.
    async fn create(&self, new_user: NewUser) -> Result<User, AuthError>;
}

pub struct PgUserStore {
    pool: PgPool,
    hasher: PasswordHasher,
}

impl PgUserStore {
    pub fn new(pool: PgPool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(user)
    }

    async fn find_by_email_with_hash(
        &self,
        email: &str,
    ) -> Result<Option<UserWithHash>, AuthError> {
        let user = sqlx::query_as::<_, UserWithHash>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AuthError> {
        // Hash before the row is written; argon2 is CPU-bound, so it runs
        // off the async workers.
        let hasher = self.hasher.clone();
        let password = new_user.raw_password().to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))??;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(create_error)?;
        Ok(user)
    }
}

fn store_error(err: sqlx::Error) -> AuthError {
    error!(error = %err, "user store query failed");
    AuthError::Store(err.to_string())
}

/// The unique index on email backs the duplicate check, so a racing
/// second insert surfaces as `EmailAlreadyExists` instead of a 500.
fn create_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return AuthError::EmailAlreadyExists;
        }
    }
    store_error(err)
}

/// In-memory store for tests and local experiments.
pub mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStore {
        users: Mutex<HashMap<String, UserWithHash>>,
        hasher: PasswordHasher,
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users
                .get(&normalize_email(email))
                .cloned()
                .map(UserWithHash::into_user))
        }

        async fn find_by_email_with_hash(
            &self,
            email: &str,
        ) -> Result<Option<UserWithHash>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&normalize_email(email)).cloned())
        }

        async fn create(&self, new_user: NewUser) -> Result<User, AuthError> {
            let password_hash = self.hasher.hash(new_user.raw_password())?;
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&new_user.email) {
                return Err(AuthError::EmailAlreadyExists);
            }
            let now = OffsetDateTime::now_utc();
            let record = UserWithHash {
                id: Uuid::new_v4(),
                name: new_user.name.clone(),
                email: new_user.email.clone(),
                password_hash,
                created_at: now,
                updated_at: now,
            };
            users.insert(record.email.clone(), record.clone());
            Ok(record.into_user())
        }
    }
}
