use tracing::{debug, info};

use crate::auth::claims::SUPERUSER;
use crate::auth::password::{hash_password, verify_password};
use crate::config::AuthConfig;
use crate::users::store::{StoreError, User, UserStore, STATUS_ACTIVE};

/// Verify a user id and password against the store. Unknown id, missing
/// stored hash and wrong password all collapse to `Ok(None)` so callers
/// cannot tell which one happened; only a store failure is surfaced.
pub async fn authenticate_user(
    store: &dyn UserStore,
    user_id: &str,
    password: &str,
) -> Result<Option<User>, StoreError> {
    let Some(user) = store.get(user_id).await? else {
        debug!(user_id, "authentication for unknown user");
        return Ok(None);
    };
    let Some(hash) = user.hashed_password.as_deref() else {
        debug!(user_id, "user has no password set");
        return Ok(None);
    };
    if !verify_password(password, hash) {
        debug!(user_id, "password verification failed");
        return Ok(None);
    }
    Ok(Some(user))
}

/// Intersect the space-separated requested scopes with the user's stored
/// scopes. A superuser is granted everything requested.
pub fn grant_scopes(requested: &str, user: &User) -> Vec<String> {
    let superuser = user.is_superuser();
    requested
        .split_whitespace()
        .filter(|scope| superuser || user.has_scope(scope))
        .map(str::to_owned)
        .collect()
}

/// Bootstrap-only: create the configured superuser when absent.
pub async fn seed_superuser(store: &dyn UserStore, auth: &AuthConfig) -> anyhow::Result<()> {
    if store.get(&auth.superuser).await?.is_some() {
        return Ok(());
    }
    let hashed = hash_password(&auth.superuser_password)?;
    store
        .insert(User {
            id: auth.superuser.clone(),
            name: None,
            email: None,
            status: STATUS_ACTIVE.to_string(),
            data: None,
            scopes: Some(vec![SUPERUSER.to_string()]),
            hashed_password: Some(hashed),
        })
        .await?;
    info!(user_id = %auth.superuser, "superuser seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::store::{test_user, MemoryUserStore};

    async fn store_with_password(id: &str, password: &str, scopes: &[&str]) -> MemoryUserStore {
        let store = MemoryUserStore::new();
        let mut user = test_user(id, scopes);
        user.hashed_password = Some(hash_password(password).expect("hash"));
        store.insert(user).await.expect("insert");
        store
    }

    #[tokio::test]
    async fn authenticate_accepts_valid_credentials() {
        let store = store_with_password("alice", "s3cret", &["user:read"]).await;
        let user = authenticate_user(&store, "alice", "s3cret")
            .await
            .expect("no store failure")
            .expect("authenticated");
        assert_eq!(user.id, "alice");
    }

    #[tokio::test]
    async fn authenticate_is_uniformly_none_on_any_failure() {
        let store = store_with_password("alice", "s3cret", &[]).await;
        // wrong password
        assert!(authenticate_user(&store, "alice", "wrong")
            .await
            .unwrap()
            .is_none());
        // unknown user
        assert!(authenticate_user(&store, "bob", "s3cret")
            .await
            .unwrap()
            .is_none());
        // no password on record
        store.insert(test_user("carol", &[])).await.unwrap();
        assert!(authenticate_user(&store, "carol", "s3cret")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn authenticate_treats_malformed_hash_as_failure() {
        let store = MemoryUserStore::new();
        let mut user = test_user("alice", &[]);
        user.hashed_password = Some("$2b$12$legacy-bcrypt-blob".to_string());
        store.insert(user).await.unwrap();
        assert!(authenticate_user(&store, "alice", "anything")
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn granted_scopes_are_the_intersection_with_stored_scopes() {
        let user = test_user("alice", &["user:read", "resources:read"]);
        let granted = grant_scopes("user:read resources:write", &user);
        assert_eq!(granted, vec!["user:read".to_string()]);
        assert!(grant_scopes("", &user).is_empty());
    }

    #[test]
    fn superuser_is_granted_everything_requested() {
        let user = test_user("root", &["superuser"]);
        let granted = grant_scopes("user:read resources:admin superuser", &user);
        assert_eq!(granted, vec!["user:read", "resources:admin", "superuser"]);
    }

    #[tokio::test]
    async fn seed_superuser_is_idempotent() {
        let store = MemoryUserStore::new();
        let auth = AuthConfig {
            secret_key: "test".into(),
            algorithm: "HS256".into(),
            token_ttl_minutes: 5,
            superuser: "admin".into(),
            superuser_password: "admin".into(),
        };
        seed_superuser(&store, &auth).await.expect("first seed");
        let seeded = store.get("admin").await.unwrap().expect("seeded");
        assert!(seeded.is_superuser());
        assert!(seeded.is_active());
        let hash = seeded.hashed_password.clone().expect("password set");

        seed_superuser(&store, &auth).await.expect("second seed");
        let unchanged = store.get("admin").await.unwrap().expect("still there");
        assert_eq!(unchanged.hashed_password.as_deref(), Some(hash.as_str()));
    }
}
