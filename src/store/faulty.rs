//! A `MemoryStore` wrapper whose operations can be made to fail, for
//! exercising how handlers react to backend outages.

use async_trait::async_trait;
use uuid::Uuid;

use super::{MemoryStore, Store, StoreError, StoreResult};
use crate::models::{Task, TaskFilter, User};

pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Operation names that fail; `"*"` fails every operation.
    failing: Vec<&'static str>,
}

impl FaultyStore {
    pub fn new(failing: &[&'static str]) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: failing.to_vec(),
        }
    }

    fn check(&self, op: &str) -> StoreResult<()> {
        if self.failing.iter().any(|f| *f == "*" || *f == op) {
            return Err(StoreError::Backend(format!("{} unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.check("insert_user")?;
        self.inner.insert_user(user).await
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check("find_user")?;
        self.inner.find_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check("find_user_by_email")?;
        self.inner.find_user_by_email(email).await
    }

    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        self.check("find_user_with_token")?;
        self.inner.find_user_with_token(id, token).await
    }

    async fn update_profile(&self, user: &User) -> StoreResult<Option<User>> {
        self.check("update_profile")?;
        self.inner.update_profile(user).await
    }

    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        self.check("push_token")?;
        self.inner.push_token(id, token).await
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        self.check("remove_token")?;
        self.inner.remove_token(id, token).await
    }

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()> {
        self.check("clear_tokens")?;
        self.inner.clear_tokens(id).await
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<()> {
        self.check("set_avatar")?;
        self.inner.set_avatar(id, avatar).await
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check("delete_user")?;
        self.inner.delete_user(id).await
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        self.check("insert_task")?;
        self.inner.insert_task(task).await
    }

    async fn find_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>> {
        self.check("find_task")?;
        self.inner.find_task(id, author).await
    }

    async fn list_tasks(&self, author: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        self.check("list_tasks")?;
        self.inner.list_tasks(author, filter).await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>> {
        self.check("update_task")?;
        self.inner.update_task(task).await
    }

    async fn delete_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>> {
        self.check("delete_task")?;
        self.inner.delete_task(id, author).await
    }
}
