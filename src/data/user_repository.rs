use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User, UserId};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

#[derive(Default)]
struct Storage {
    users: HashMap<UserId, User>,
    next_id: UserId,
}

impl Storage {
    fn find_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }
}

/// Process-local user store. Emails are matched case-sensitively.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<Storage>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.storage.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        trace!("Acquiring read lock for user storage");
        let storage = self.storage.read().await;
        let user = storage.find_by_email(email).cloned();
        match &user {
            Some(u) => debug!(user_id = u.id, "User found in storage"),
            None => trace!("User not found in storage"),
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let storage = self.storage.read().await;
        Ok(storage.find_by_email(email).is_some())
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn save_and_flush(&self, user: NewUser) -> Result<User> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;

        // Uniqueness check and insert share the write lock.
        if storage.find_by_email(&user.email).is_some() {
            return Err(DomainError::DuplicateAccount(user.email).into());
        }

        storage.next_id += 1;
        let user = user.into_user(storage.next_id);
        storage.users.insert(user.id, user.clone());
        debug!(user_id = user.id, "User inserted into storage");
        Ok(user)
    }

    #[instrument(skip(self, user), fields(user_id = user.id, email = %user.email))]
    async fn save(&self, user: User) -> Result<User> {
        let mut storage = self.storage.write().await;

        if let Some(other) = storage.find_by_email(&user.email)
            && other.id != user.id
        {
            return Err(DomainError::DuplicateAccount(user.email).into());
        }
        if !storage.users.contains_key(&user.id) {
            return Err(anyhow!("User {} does not exist", user.id));
        }

        storage.users.insert(user.id, user.clone());
        debug!("User updated in storage");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: UserId) -> Result<()> {
        let mut storage = self.storage.write().await;
        match storage.users.remove(&id) {
            Some(user) => debug!(email = %user.email, "User removed from storage"),
            None => trace!("No user to remove"),
        }
        Ok(())
    }
}
