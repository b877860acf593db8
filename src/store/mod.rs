//! Persistence boundary.
//!
//! Handlers talk to a `Store` trait object and never to a concrete database.
//! Every method is a single atomic operation from the caller's point of view:
//! token changes are appended or removed in place rather than by rewriting the
//! whole user, task updates and deletes are conditional on both id and author,
//! and deleting a user always removes that user's tasks in the same operation.

#[cfg(test)]
pub mod faulty;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Task, TaskFilter, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another user already owns this email address.
    #[error("Email already registered")]
    DuplicateEmail,

    /// The backend failed (connection, query, serialization...).
    #[error("Store failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new user. Fails with `DuplicateEmail` if the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user only if `token` is currently in that user's token set.
    /// The avatar is not loaded.
    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>>;

    /// Persists name, email, password hash and age. Tokens and avatar are untouched.
    async fn update_profile(&self, user: &User) -> StoreResult<Option<User>>;

    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<()>;

    async fn remove_token(&self, id: Uuid, token: &str) -> StoreResult<()>;

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()>;

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<()>;

    /// Deletes the user and every task authored by that user.
    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_task(&self, task: &Task) -> StoreResult<()>;

    async fn find_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>>;

    async fn list_tasks(&self, author: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Writes description, completed and updated_at where both id and author match.
    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>>;

    /// Deletes the task where both id and author match, returning it.
    async fn delete_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>>;
}
