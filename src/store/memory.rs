use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{SortDirection, SortField, Task, TaskFilter, User};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    tasks: Vec<Task>,
}

/// In-process store. Each operation holds the lock for its whole duration,
/// so compound operations such as the cascading user delete are atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &Task, b: &Task, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Description => a.description.cmp(&b.description),
        SortField::Completed => a.completed.cmp(&b.completed),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.id == id && u.has_token(token))
            .map(|u| User {
                avatar: None,
                ..u.clone()
            }))
    }

    async fn update_profile(&self, user: &User) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .iter()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        Ok(inner.users.iter_mut().find(|u| u.id == user.id).map(|stored| {
            stored.name = user.name.clone();
            stored.email = user.email.clone();
            stored.password_hash = user.password_hash.clone();
            stored.age = user.age;
            stored.updated_at = Utc::now();
            stored.clone()
        }))
    }

    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.tokens.push(token.to_string());
        }
        Ok(())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.tokens.retain(|t| t != token);
        }
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.tokens.clear();
        }
        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.avatar = avatar;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        let Some(position) = inner.users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        inner.tasks.retain(|t| t.author != id);
        Ok(Some(inner.users.remove(position)))
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.tasks.push(task.clone());
        Ok(())
    }

    async fn find_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tasks
            .iter()
            .find(|t| t.id == id && t.author == author)
            .cloned())
    }

    async fn list_tasks(&self, author: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| t.author == author)
            .filter(|t| filter.completed.map_or(true, |c| t.completed == c))
            .cloned()
            .collect();

        if let Some(sort) = filter.sort {
            tasks.sort_by(|a, b| {
                let ordering = compare(a, b, sort.field);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Ok(tasks
            .into_iter()
            .skip(filter.skip.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.author == task.author)
            .map(|stored| {
                stored.description = task.description.clone();
                stored.completed = task.completed;
                stored.updated_at = task.updated_at;
                stored.clone()
            }))
    }

    async fn delete_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        let position = inner
            .tasks
            .iter()
            .position(|t| t.id == id && t.author == author);
        Ok(position.map(|index| inner.tasks.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskInput, TaskSort, UserInput};

    fn user(email: &str) -> User {
        let input = UserInput {
            name: "Mike".into(),
            email: email.into(),
            password: "abcdef21".into(),
            age: None,
        };
        User::new(&input, "hash".into())
    }

    fn task(author: Uuid, description: &str, completed: bool) -> Task {
        Task::new(
            TaskInput {
                description: description.into(),
                completed,
            },
            author,
        )
    }

    #[actix_rt::test]
    async fn test_email_uniqueness() {
        let store = MemoryStore::new();
        store.insert_user(&user("mike@gmail.com")).await.unwrap();
        let err = store.insert_user(&user("mike@gmail.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        let other = user("scott@gmail.com");
        store.insert_user(&other).await.unwrap();
        let mut renamed = other.clone();
        renamed.email = "mike@gmail.com".into();
        assert!(matches!(
            store.update_profile(&renamed).await,
            Err(StoreError::DuplicateEmail)
        ));
    }

    #[actix_rt::test]
    async fn test_token_membership() {
        let store = MemoryStore::new();
        let mike = user("mike@gmail.com");
        store.insert_user(&mike).await.unwrap();

        store.push_token(mike.id, "t1").await.unwrap();
        store.push_token(mike.id, "t2").await.unwrap();
        assert!(store.find_user_with_token(mike.id, "t1").await.unwrap().is_some());

        store.remove_token(mike.id, "t1").await.unwrap();
        assert!(store.find_user_with_token(mike.id, "t1").await.unwrap().is_none());
        assert!(store.find_user_with_token(mike.id, "t2").await.unwrap().is_some());

        store.clear_tokens(mike.id).await.unwrap();
        assert!(store.find_user_with_token(mike.id, "t2").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_session_lookup_leaves_avatar_behind() {
        let store = MemoryStore::new();
        let mike = user("mike@gmail.com");
        store.insert_user(&mike).await.unwrap();
        store.push_token(mike.id, "t1").await.unwrap();
        store.set_avatar(mike.id, Some(vec![1, 2, 3])).await.unwrap();

        let session = store.find_user_with_token(mike.id, "t1").await.unwrap().unwrap();
        assert!(session.avatar.is_none());
        assert_eq!(session.tokens, vec!["t1".to_string()]);

        let stored = store.find_user(mike.id).await.unwrap().unwrap();
        assert_eq!(stored.avatar, Some(vec![1, 2, 3]));
    }

    #[actix_rt::test]
    async fn test_scoped_task_access() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let t = task(owner, "First Task", false);
        store.insert_task(&t).await.unwrap();

        assert!(store.find_task(t.id, stranger).await.unwrap().is_none());
        assert!(store.delete_task(t.id, stranger).await.unwrap().is_none());

        let mut hijacked = t.clone();
        hijacked.author = stranger;
        hijacked.description = "mine now".into();
        assert!(store.update_task(&hijacked).await.unwrap().is_none());

        let stored = store.find_task(t.id, owner).await.unwrap().unwrap();
        assert_eq!(stored.description, "First Task");
        assert!(store.delete_task(t.id, owner).await.unwrap().is_some());
        assert!(store.find_task(t.id, owner).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_delete_user_cascades() {
        let store = MemoryStore::new();
        let mike = user("mike@gmail.com");
        let scott = user("scott@gmail.com");
        store.insert_user(&mike).await.unwrap();
        store.insert_user(&scott).await.unwrap();
        store.insert_task(&task(mike.id, "a", false)).await.unwrap();
        store.insert_task(&task(mike.id, "b", true)).await.unwrap();
        store.insert_task(&task(scott.id, "c", false)).await.unwrap();

        let deleted = store.delete_user(mike.id).await.unwrap();
        assert_eq!(deleted.map(|u| u.id), Some(mike.id));

        let filter = TaskFilter::default();
        assert!(store.list_tasks(mike.id, &filter).await.unwrap().is_empty());
        assert_eq!(store.list_tasks(scott.id, &filter).await.unwrap().len(), 1);
        assert!(store.delete_user(mike.id).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_list_filter_sort_paginate() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        for (description, completed) in [("c", false), ("a", true), ("b", false)] {
            store.insert_task(&task(author, description, completed)).await.unwrap();
        }
        store.insert_task(&task(Uuid::new_v4(), "z", false)).await.unwrap();

        let all = store.list_tasks(author, &TaskFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);

        let done = TaskFilter {
            completed: Some(true),
            ..TaskFilter::default()
        };
        assert_eq!(store.list_tasks(author, &done).await.unwrap().len(), 1);

        let sorted = TaskFilter {
            sort: Some(TaskSort {
                field: SortField::Description,
                direction: SortDirection::Desc,
            }),
            skip: Some(1),
            limit: Some(1),
            ..TaskFilter::default()
        };
        let page = store.list_tasks(author, &sorted).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].description, "b");
    }
}
