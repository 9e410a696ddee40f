//! JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{AppError, StoreError};

/// An [`AppError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub AppError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Consistency(_) => StatusCode::CONFLICT,
            AppError::InputFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", self.0.kind(), self.0);
        }
        let body = Json(json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation(String::new()), 400),
            (AppError::Authorization(String::new()), 403),
            (AppError::NotFound(String::new()), 404),
            (AppError::Consistency(String::new()), 409),
            (AppError::InputFormat(String::new()), 422),
            (AppError::Transient(String::new()), 503),
            (AppError::Fatal(String::new()), 500),
        ];
        for (error, code) in cases {
            assert_eq!(ApiError(error).status().as_u16(), code);
        }
    }
}
