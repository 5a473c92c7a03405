//! Pipeline task route handlers

use crate::db::store::{get_or_404, PgCatalog};
use crate::error::{ApiResult, ErrorResponse};
use crate::models::{PipelineTask, PipelineTaskChanges};
use crate::routes::extract::{AppJson, AppPath};
use crate::service;
use crate::state::SharedState;
use axum::{extract::State, Json};

/// Record a new pipeline task
#[utoipa::path(
    post,
    path = "/v1/pipeline-tasks",
    tag = "pipeline-task",
    request_body = PipelineTaskChanges,
    responses(
        (status = 200, description = "The created task", body = PipelineTask),
        (status = 400, description = "Invalid task", body = ErrorResponse),
    )
)]
pub async fn create_pipeline_task(
    State(state): State<SharedState>,
    AppJson(payload): AppJson<PipelineTaskChanges>,
) -> ApiResult<Json<PipelineTask>> {
    let client = state.client().await?;
    let task = service::create_pipeline_task(&mut PgCatalog::new(&**client), payload).await?;
    Ok(Json(task))
}

/// Get pipeline task by id
#[utoipa::path(
    get,
    path = "/v1/pipeline-tasks/{id}",
    tag = "pipeline-task",
    params(("id" = i32, Path, description = "Pipeline task id")),
    responses(
        (status = 200, description = "The task", body = PipelineTask),
        (status = 404, description = "No such task", body = ErrorResponse),
    )
)]
pub async fn get_pipeline_task(
    State(state): State<SharedState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Json<PipelineTask>> {
    let client = state.client().await?;
    let task = get_or_404(&mut PgCatalog::new(&**client), id).await?;
    Ok(Json(task))
}

/// Update pipeline task
#[utoipa::path(
    patch,
    path = "/v1/pipeline-tasks/{id}",
    tag = "pipeline-task",
    params(("id" = i32, Path, description = "Pipeline task id")),
    request_body = PipelineTaskChanges,
    responses(
        (status = 200, description = "The updated task", body = PipelineTask),
        (status = 400, description = "Invalid change", body = ErrorResponse),
        (status = 404, description = "No such task", body = ErrorResponse),
    )
)]
pub async fn update_pipeline_task(
    State(state): State<SharedState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<PipelineTaskChanges>,
) -> ApiResult<Json<PipelineTask>> {
    let client = state.client().await?;
    let task = service::update_pipeline_task(&mut PgCatalog::new(&**client), id, payload).await?;
    Ok(Json(task))
}
