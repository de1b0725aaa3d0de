//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use listcraft_core::TemplateError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by request handlers. Every variant renders as a plain
/// text body.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required field is missing or unusable.
    #[error("{0}")]
    Validation(String),

    /// The requested template does not exist.
    #[error("{0}")]
    TemplateNotFound(String),

    /// Loading or rewriting the template failed.
    #[error("failed to process template: {0}")]
    Template(#[source] TemplateError),

    /// Anything else, such as a panicked rewrite task.
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Template(_) | ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { .. } => ApiError::TemplateNotFound(err.to_string()),
            TemplateError::InvalidKey { .. } => ApiError::Validation(err.to_string()),
            other => ApiError::Template(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_template_error_mapping() {
        let not_found: ApiError = TemplateError::NotFound {
            name: "elbise.xlsx".to_string(),
            location: PathBuf::from("templates/trendyol"),
        }
        .into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert!(not_found.to_string().contains("elbise.xlsx"));

        let invalid: ApiError = TemplateError::InvalidKey {
            field: "kategori",
            value: "..".to_string(),
        }
        .into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let parse: ApiError = TemplateError::Parse("bad zip".to_string()).into();
        assert_eq!(parse.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            parse.to_string(),
            "failed to process template: template could not be parsed: bad zip"
        );
    }
}
