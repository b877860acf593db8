use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{SortDirection, Task, TaskFilter, User};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, age, avatar, tokens, created_at, updated_at";
/// Same shape as `USER_COLUMNS` without reading the avatar bytes.
const SESSION_USER_COLUMNS: &str =
    "id, name, email, password_hash, age, NULL::bytea AS avatar, tokens, created_at, updated_at";
const TASK_COLUMNS: &str = "id, author, description, completed, created_at, updated_at";

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateEmail
            }
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

/// Builds the task listing query. Column names come from `SortField::column`,
/// never from client input; all values are bound.
fn list_tasks_sql(filter: &TaskFilter) -> String {
    let mut sql = format!("SELECT {} FROM tasks WHERE author = $1", TASK_COLUMNS);
    let mut param_count = 2;

    if filter.completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param_count));
        param_count += 1;
    }

    match filter.sort {
        Some(sort) => {
            let direction = match sort.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY {} {}, created_at ASC, id ASC",
                sort.field.column(),
                direction
            ));
        }
        None => sql.push_str(" ORDER BY created_at ASC, id ASC"),
    }

    if filter.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", param_count));
        param_count += 1;
    }
    if filter.skip.is_some() {
        sql.push_str(&format!(" OFFSET ${}", param_count));
    }
    sql
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, age, avatar, tokens, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.age)
        .bind(&user.avatar)
        .bind(&user.tokens)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_with_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND $2 = ANY(tokens)",
            SESSION_USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_profile(&self, user: &User) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, age = $5, updated_at = NOW()
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.age)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn push_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET tokens = array_append(tokens, $2) WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET tokens = array_remove(tokens, $2) WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE users SET tokens = '{}' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tasks WHERE author = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let deleted = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO tasks (id, author, description, completed, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(task.id)
        .bind(task.author)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND author = $2",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(author)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_tasks(&self, author: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let sql = list_tasks_sql(filter);
        let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(author);

        if let Some(completed) = filter.completed {
            query_builder = query_builder.bind(completed);
        }
        if let Some(limit) = filter.limit {
            query_builder = query_builder.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(skip) = filter.skip {
            query_builder = query_builder.bind(i64::try_from(skip).unwrap_or(i64::MAX));
        }

        Ok(query_builder.fetch_all(&self.pool).await?)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks SET description = $3, completed = $4, updated_at = $5
             WHERE id = $1 AND author = $2 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.author)
            .bind(&task.description)
            .bind(task.completed)
            .bind(task.updated_at)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_task(&self, id: Uuid, author: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!(
            "DELETE FROM tasks WHERE id = $1 AND author = $2 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(author)
            .fetch_optional(&self.pool)
            .await?)
    }
}
