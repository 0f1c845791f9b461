use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;

use crate::auth::claims::SUPERUSER;
use crate::users::dto::UserUpdate;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing, default)]
    pub scopes: Option<Vec<String>>,
    #[serde(skip_serializing, default)]
    pub hashed_password: Option<String>,
}

impl User {
    pub fn is_superuser(&self) -> bool {
        self.has_scope(SUPERUSER)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|s| s == scope)
    }

    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

/// Transport or connection failure talking to the user store. "Not found" is
/// never an error; lookups return `Ok(None)`.
#[derive(Debug, Error)]
#[error("user store unavailable: {0}")]
pub struct StoreError(#[from] pub sqlx::Error);

/// Persistence collaborator for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by id.
    async fn get(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user record.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    /// Apply a partial update to an existing user. `Ok(None)` when the user
    /// does not exist.
    async fn update(&self, id: &str, update: &UserUpdate) -> Result<Option<User>, StoreError>;
}

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, status, data, scopes, hashed_password
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, status, data, scopes, hashed_password)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, email, status, data, scopes, hashed_password
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.status)
        .bind(&user.data)
        .bind(&user.scopes)
        .bind(&user.hashed_password)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: &str, update: &UserUpdate) -> Result<Option<User>, StoreError> {
        let Some(mut user) = self.get(id).await? else {
            return Ok(None);
        };
        update.apply_to(&mut user);
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, email = $3, status = $4, data = $5
            WHERE id = $1
            RETURNING id, name, email, status, data, scopes, hashed_password
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.status)
        .bind(&user.data)
        .fetch_optional(&self.db)
        .await?;
        Ok(updated)
    }
}

/// In-memory user store backing `AppState::fake` and the tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().expect("user store lock poisoned");
        Ok(users.get(id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().expect("user store lock poisoned");
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update(&self, id: &str, update: &UserUpdate) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().expect("user store lock poisoned");
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        update.apply_to(user);
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
pub(crate) fn test_user(id: &str, scopes: &[&str]) -> User {
    User {
        id: id.to_string(),
        name: None,
        email: None,
        status: STATUS_ACTIVE.to_string(),
        data: None,
        scopes: Some(scopes.iter().map(|s| s.to_string()).collect()),
        hashed_password: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_get_returns_none_for_unknown_id() {
        let store = MemoryUserStore::new();
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_insert_then_get() {
        let store = MemoryUserStore::new();
        store
            .insert(test_user("alice", &["user:read"]))
            .await
            .unwrap();
        let user = store.get("alice").await.unwrap().expect("inserted user");
        assert_eq!(user.id, "alice");
        assert!(user.has_scope("user:read"));
        assert!(!user.is_superuser());
    }

    #[tokio::test]
    async fn memory_store_update_applies_only_set_fields() {
        let store = MemoryUserStore::new();
        let mut seeded = test_user("alice", &[]);
        seeded.name = Some("Alice".to_string());
        store.insert(seeded).await.unwrap();

        let update = UserUpdate {
            name: None,
            email: Some("alice@example.com".to_string()),
            status: Some(STATUS_INACTIVE.to_string()),
            data: None,
        };
        let user = store
            .update("alice", &update)
            .await
            .unwrap()
            .expect("existing user");
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert!(!user.is_active());
    }

    #[tokio::test]
    async fn memory_store_update_missing_user_is_none() {
        let store = MemoryUserStore::new();
        let update = UserUpdate {
            name: Some("Ghost".to_string()),
            email: None,
            status: None,
            data: None,
        };
        assert!(store.update("ghost", &update).await.unwrap().is_none());
    }

    #[test]
    fn superuser_tag_is_detected_in_stored_scopes() {
        let user = test_user("root", &["superuser"]);
        assert!(user.is_superuser());
        let user = test_user("alice", &["user:read", "resources:read"]);
        assert!(!user.is_superuser());
    }

    #[test]
    fn user_serialization_never_leaks_the_hash() {
        let mut user = test_user("alice", &["user:read"]);
        user.hashed_password = Some("$argon2id$...".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("scopes"));
    }
}
