use crate::services::{
    document_service::DocumentError, generator_client::GeneratorError,
    storage_service::StorageError, validator::ValidationError,
};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Structured error returned by every JSON endpoint: kind + message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status, kind and message.
    pub fn new(status: StatusCode, kind: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(kind = self.kind, "request failed: {}", self.message);
        }
        let body = Json(json!({
            "error": self.message,
            "kind": self.kind,
            "status": self.status.as_u16(),
            "success": false,
        }));

        (self.status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::new(
            StatusCode::BAD_REQUEST,
            err.kind(),
            format!("Invalid OpenAPI document: {}", err),
        )
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidLabel(_) | StorageError::InvalidDocumentId(_) => {
                AppError::bad_request(err.to_string())
            }
            StorageError::Io(_) => {
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "io_error", err.to_string())
            }
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::DocumentNotFound(_) | DocumentError::VersionNotFound { .. } => {
                AppError::not_found(err.to_string())
            }
            DocumentError::SlugAlreadySet(_)
            | DocumentError::SlugTaken(_)
            | DocumentError::VersionExists(_) => {
                AppError::new(StatusCode::CONFLICT, "conflict", err.to_string())
            }
            DocumentError::VersionLimitReached(_) => AppError::new(
                StatusCode::CONFLICT,
                "version_limit_reached",
                err.to_string(),
            ),
            DocumentError::Storage(storage) => storage.into(),
            DocumentError::Codec { .. } | DocumentError::Store(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Disabled => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "service_disabled",
                "OpenAPI Generator service is disabled",
            ),
            GeneratorError::Upstream { .. }
            | GeneratorError::Transport(_)
            | GeneratorError::Decode(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, "upstream_error", err.to_string())
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), "bad_request", err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_errors_map_to_statuses() {
        let not_found: AppError = DocumentError::DocumentNotFound("x".into()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let conflict: AppError = DocumentError::SlugAlreadySet("x".into()).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.kind, "conflict");

        let io: AppError = DocumentError::Storage(StorageError::Io(std::io::Error::other("disk")))
            .into();
        assert_eq!(io.kind, "io_error");
    }

    #[test]
    fn validation_and_generator_errors() {
        let invalid: AppError = ValidationError::VersionFieldMissing.into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.kind, "version_field_missing");

        let disabled: AppError = GeneratorError::Disabled.into();
        assert_eq!(disabled.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
