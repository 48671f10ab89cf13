use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::datastore::DataStoreError;
use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ModelError),
    /// Carries the requested id as sent, which may not even be a number
    #[error("Todo not found.")]
    NotFound(String),
    #[error("Malformed request: {0}")]
    BadRequest(String),
    #[error("storage service error: {0}")]
    StorageServiceError(String),
    #[error("failed to create runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<DataStoreError> for ControllerError {
    fn from(err: DataStoreError) -> Self {
        match err {
            DataStoreError::NotFound(id) => ControllerError::NotFound(id.to_string()),
        }
    }
}

impl ControllerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ControllerError::Validation(_) | ControllerError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ControllerError::NotFound(_) => StatusCode::NOT_FOUND,
            ControllerError::StorageServiceError(_) | ControllerError::Runtime(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(reason = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
