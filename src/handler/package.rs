use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    handler::{ApiJsonResult, ApiResult, AppState, BadRequest, auth::Principal},
    manager::{self, TaskRecord},
    packaging::PackagingRequest,
};

pub fn package_router() -> Router<AppState> {
    Router::new()
        .route("/generate", get(generate_from_query).post(generate_from_json))
        .route("/status", get(list_tasks))
        .route("/status/{task_id}", get(get_status))
}

#[derive(Deserialize)]
struct GenerateQuery {
    input: Option<String>,
}

#[derive(Deserialize)]
struct GenerateRequest {
    input: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    status: String,
    task_id: String,
}

async fn generate_from_query(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<GenerateQuery>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    start(state, principal, query.input).await
}

async fn generate_from_json(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    start(state, principal, req.input).await
}

async fn start(
    state: AppState,
    principal: Principal,
    input: Option<String>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let input_file = input
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .ok_or_else(|| BadRequest("input is required".to_string()))?;

    let request = PackagingRequest {
        input_file,
        output_root: state.access.output_root().to_path_buf(),
    };
    let task_id = manager::spawn_packaging(
        Arc::clone(&state.registry),
        Arc::clone(&state.packager),
        request,
        &principal,
    )
    .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            status: "accepted".to_string(),
            task_id,
        }),
    ))
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskRecord>> {
    Json(state.registry.list().await)
}

async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiJsonResult<TaskRecord> {
    let record = state.registry.get(&task_id).await?;
    Ok(Json(record))
}
