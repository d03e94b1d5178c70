use crate::domain::user::{NewUser, User, UserId};
use anyhow::Result;
use async_trait::async_trait;

/// Storage for user accounts.
///
/// Implementations must make `save_and_flush` atomic with respect to email
/// uniqueness: if another account with the same email already exists the
/// call fails with `DomainError::DuplicateAccount` and stores nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn exists_by_email(&self, email: &str) -> Result<bool>;
    /// Inserts a new account; the write is visible to readers on return.
    async fn save_and_flush(&self, user: NewUser) -> Result<User>;
    async fn save(&self, user: User) -> Result<User>;
    /// Removes an account. Used to undo a signup that could not complete.
    async fn delete(&self, id: UserId) -> Result<()>;
}
