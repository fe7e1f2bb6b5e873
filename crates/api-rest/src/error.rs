use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blocks_core::{BlockError, ContentTypeError, ErrorKind, PathError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<BlockError> for ApiError {
    /// `NotFound` → 404, storage denials and validation failures → 403,
    /// anything else → 422.
    fn from(err: BlockError) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ if err.is_forbidden_class() => StatusCode::FORBIDDEN,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::error!(error = ?err, "block operation failed");
        }

        Self::new(status, err.to_string())
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        BlockError::from(err).into()
    }
}

impl From<ContentTypeError> for ApiError {
    fn from(err: ContentTypeError) -> Self {
        BlockError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorRes {
                error: self.message,
            }),
        )
            .into_response()
    }
}
