use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::io::ReaderStream;

use crate::{
    handler::{ApiResult, AppState, auth::Principal},
    packaging::access::ManifestFile,
};

pub fn stream_router() -> Router<AppState> {
    Router::new()
        .route("/{protocol}/{resolution}/manifest", get(rendition_manifest))
        .route("/{protocol}/master", get(master_manifest))
}

async fn rendition_manifest(
    State(state): State<AppState>,
    _principal: Principal,
    Path((protocol, resolution)): Path<(String, String)>,
) -> ApiResult<Response> {
    let manifest = state.access.resolve(&protocol, &resolution)?;
    serve(&state, manifest).await
}

async fn master_manifest(
    State(state): State<AppState>,
    _principal: Principal,
    Path(protocol): Path<String>,
) -> ApiResult<Response> {
    let manifest = state.access.resolve_master(&protocol)?;
    serve(&state, manifest).await
}

async fn serve(state: &AppState, manifest: ManifestFile) -> ApiResult<Response> {
    let file = state.access.open(&manifest).await?;
    log::debug!("serving manifest {}", manifest.path.display());
    let body = Body::from_stream(ReaderStream::new(file));
    Ok(([(CONTENT_TYPE, manifest.content_type())], body).into_response())
}
