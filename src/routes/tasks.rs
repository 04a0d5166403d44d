use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::TaskInput,
    state::AppState,
    tasks::TaskQueryParams,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

/// Lists the authenticated user's tasks one page at a time.
///
/// ## Query Parameters:
/// - `status`, `priority` (optional): integer codes `0`..`2`.
/// - `categoryId` (optional): exact category match.
/// - `search` (optional): case-insensitive substring of title or description.
/// - `page` (default 1), `pageSize` (default 10, capped by configuration).
///
/// ## Responses:
/// - `200 OK`: a `TaskPage` with `items`, `totalCount`, `page` and `pageSize`.
/// - `400 Bad Request`: a parameter is not a valid number or code.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query_params: web::Query<TaskQueryParams>,
) -> Result<impl Responder, AppError> {
    let page = state.queries.query(user.id, &query_params).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Creates a task owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: the stored task.
/// - `400 Bad Request`: field validation failed or the category does not exist.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let task = state.mutations.create(user.id, task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = state.mutations.get(user.id, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Replaces every field of an existing task.
///
/// ## Responses:
/// - `200 OK`: the updated task.
/// - `400 Bad Request`: validation failed.
/// - `404 Not Found`: no such task for this user.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let task = state
        .mutations
        .update(user.id, task_id.into_inner(), task_data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    state.mutations.delete(user.id, task_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
