use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    handler::auth::{AuthError, TokenVerifier},
    manager::{RegistryError, TaskRegistry},
    packaging::{
        access::{AccessError, ManifestAccess},
        orchestrator::Packager,
    },
};

pub mod auth;
pub mod package;
pub mod stream;

pub type ApiResult<T> = Result<T, ApiError>;
pub type ApiJsonResult<T> = ApiResult<Json<T>>;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    pub packager: Arc<Packager>,
    pub access: Arc<ManifestAccess>,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Client supplied request data was unusable.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BadRequest(pub String);

pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        if let Some(e) = self.0.downcast_ref::<AccessError>() {
            return match e {
                AccessError::InvalidProtocol(_) | AccessError::InvalidResolution(_) => {
                    StatusCode::BAD_REQUEST
                }
                AccessError::NotFound(_) => StatusCode::NOT_FOUND,
                AccessError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if let Some(e) = self.0.downcast_ref::<RegistryError>() {
            return match e {
                RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                RegistryError::AlreadyTerminal(_) => StatusCode::CONFLICT,
            };
        }
        if self.0.is::<AuthError>() {
            return StatusCode::UNAUTHORIZED;
        }
        if self.0.is::<BadRequest>() {
            return StatusCode::BAD_REQUEST;
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("ApiError: {:?}", self.0);
            return (
                status,
                "Packager went wrong because service inner error".to_string(),
            )
                .into_response();
        }
        log::debug!("ApiError: {} {}", status, self.0);
        (status, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
