use crate::{
    app::AppState,
    auth::AuthenticatedUser,
    error::AppError,
    models::{Task, TaskFilter, TaskInput, TaskQuery, TaskUpdate},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` keeps completed tasks, any other value keeps open ones.
/// - `sortBy` (optional): `<field>_<asc|desc>` where field is `createdAt`, `updatedAt`,
///   `description` or `completed`.
/// - `limit`, `skip` (optional): non-negative integers; other values are ignored.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task`, possibly empty.
/// - `401 Unauthorized`: missing, invalid or revoked token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter::from(&query_params.into_inner());
    let tasks = state.store.list_tasks(ctx.user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task for the authenticated user.
///
/// The author is always the caller; an `author` field in the body is ignored.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: missing, blank or mistyped `description`/`completed`.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let input = task_data.into_inner().normalize();
    input.validate()?;

    let task = Task::new(input, ctx.user.id);
    state.store.insert_task(&task).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a task by id.
///
/// A task owned by someone else gets the same `404` as a task that does not exist.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .store
        .find_task(task_id.into_inner(), ctx.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates `description` and/or `completed` of a task.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: a field outside `description`/`completed` was sent (nothing
///   is modified), or a value failed validation.
/// - `404 Not Found`: the task does not exist or is not owned by the caller.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    task_id: web::Path<Uuid>,
    task_data: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let update = TaskUpdate::from_payload(task_data.into_inner())?;

    let mut task = state
        .store
        .find_task(task_id.into_inner(), ctx.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    task.apply(update);

    let updated = state
        .store
        .update_task(&task)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task with a single id+author conditional delete and returns it.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .store
        .delete_task(task_id.into_inner(), ctx.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}
