//! Maintenance task and comment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::task::{Comment, CreateComment, CreateTask, Task, UpdateTask, UpdateTaskStatus},
    AppState,
};

use super::AuthenticatedUser;

/// List tasks for the caller.
///
/// Administrators get the tasks they assigned, other users the tasks they
/// are assigned to; both limited to the caller's unit.
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Task list, newest first", body = Vec<Task>)
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = state.services.tasks.list_for(&identity).await?;
    Ok(Json(tasks))
}

/// Get a task with its comments
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task details", body = Task),
        (status = 403, description = "Task belongs to another unit"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Task>> {
    let task = state.services.tasks.get_by_id(&identity, id).await?;
    Ok(Json(task))
}

/// Create a maintenance task; bound equipment enters maintenance
#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    security(("bearer_auth" = [])),
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Bound equipment not found")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(data): Json<CreateTask>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = state.services.tasks.create(&identity, &data).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Edit a task and replace its assignees
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = UpdateTask,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Caller is not the assigner"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateTask>,
) -> AppResult<Json<Task>> {
    let task = state.services.tasks.update(&identity, id, &data).await?;
    Ok(Json(task))
}

/// Change task status; completion releases bound equipment
#[utoipa::path(
    put,
    path = "/tasks/{id}/status",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = UpdateTaskStatus,
    responses(
        (status = 200, description = "Status changed", body = Task),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task already completed")
    )
)]
pub async fn update_task_status(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateTaskStatus>,
) -> AppResult<Json<Task>> {
    let task = state.services.tasks.update_status(&identity, id, &data).await?;
    Ok(Json(task))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Caller is not the assigner"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.tasks.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Comment on a task
#[utoipa::path(
    post,
    path = "/tasks/{id}/comments",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = CreateComment,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Empty or oversized comment"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(task_id): Path<Uuid>,
    Json(data): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state.services.tasks.add_comment(&identity, task_id, &data).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete one of the caller's own comments
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.tasks.delete_comment(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
