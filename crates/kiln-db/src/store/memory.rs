use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::UserStore;
use crate::{
    error::{DbError, DbResult},
    model::{
        krb5_login::{Krb5Login, NewKrb5Login},
        user::{NewUser, User},
    },
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<uuid::Uuid, User>,
    /// username -> user id
    names: HashMap<String, uuid::Uuid>,
    krb5_logins: HashMap<String, Krb5Login>,
}

/// ## Summary
/// Process-local `UserStore` backed by hash maps.
///
/// All mutations take the write lock, so concurrent logins of the same user
/// cannot create duplicates.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user_by_name(&self, name: &str) -> DbResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .names
            .get(name)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn get_user_by_id(&self, id: uuid::Uuid) -> DbResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    #[tracing::instrument(skip(self, new_user), fields(user = %new_user.name))]
    async fn create_user(&self, new_user: NewUser) -> DbResult<User> {
        let mut tables = self.tables.write().await;

        if tables.names.contains_key(&new_user.name) {
            return Err(DbError::Conflict(format!(
                "user '{}' already exists",
                new_user.name
            )));
        }

        let user = User {
            id: uuid::Uuid::now_v7(),
            name: new_user.name,
            mail: new_user.mail,
            timezone: new_user.timezone,
            admin: false,
            openid_groups: None,
            updated_at: chrono::Utc::now(),
        };

        tables.names.insert(user.name.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        tracing::debug!(user_id = %user.id, "User record inserted");
        Ok(user)
    }

    #[tracing::instrument(skip(self, user), fields(user = %user.name))]
    async fn save_user(&self, user: &User) -> DbResult<User> {
        let mut tables = self.tables.write().await;

        let Some(stored) = tables.users.get(&user.id) else {
            return Err(DbError::NotFound(format!("user id {}", user.id)));
        };

        if stored.name != user.name {
            if tables.names.contains_key(&user.name) {
                return Err(DbError::Conflict(format!(
                    "user '{}' already exists",
                    user.name
                )));
            }
            let old_name = stored.name.clone();
            tables.names.remove(&old_name);
            tables.names.insert(user.name.clone(), user.id);
        }

        let mut saved = user.clone();
        saved.updated_at = chrono::Utc::now();
        tables.users.insert(saved.id, saved.clone());

        Ok(saved)
    }

    async fn get_krb5_login(&self, primary: &str) -> DbResult<Option<Krb5Login>> {
        Ok(self.tables.read().await.krb5_logins.get(primary).cloned())
    }

    #[tracing::instrument(skip(self, new_login), fields(principal = %new_login.primary))]
    async fn create_krb5_login(&self, new_login: NewKrb5Login) -> DbResult<Krb5Login> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&new_login.user_id) {
            return Err(DbError::NotFound(format!("user id {}", new_login.user_id)));
        }
        if tables.krb5_logins.contains_key(&new_login.primary) {
            return Err(DbError::Conflict(format!(
                "principal '{}' is already bound",
                new_login.primary
            )));
        }

        let login = Krb5Login {
            primary: new_login.primary,
            user_id: new_login.user_id,
        };
        tables
            .krb5_logins
            .insert(login.primary.clone(), login.clone());

        Ok(login)
    }
}
