//! # Error Handling Middleware
//!
//! This module maps domain errors to HTTP status codes and JSON error
//! bodies so every handler reports failures the same way.
//!
//! Bodies look like `{"error": "..."}`; validation failures add a
//! `fields` list with one `{field, message}` entry per offending field.
//! Server-side failures are logged and answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use halaqa_core::{errors::HalaqaError, validation::ValidationErrors};
use serde_json::json;

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps [`HalaqaError`] and implements `IntoResponse`, so
/// handlers can return `Result<_, AppError>` and use `?` on both domain
/// results and repository (`eyre`) results.
///
/// # Example
///
/// ```
/// use axum::Json;
/// use halaqa_api::middleware::error_handling::AppError;
/// use halaqa_core::errors::HalaqaError;
///
/// async fn handler(found: bool) -> Result<Json<&'static str>, AppError> {
///     if !found {
///         return Err(HalaqaError::NotFound("Group not found".to_string()).into());
///     }
///     Ok(Json("ok"))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub HalaqaError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HalaqaError::NotFound(_) => StatusCode::NOT_FOUND,
            HalaqaError::Validation(_) => StatusCode::BAD_REQUEST,
            HalaqaError::Authentication(_) => StatusCode::UNAUTHORIZED,
            HalaqaError::Authorization(_) => StatusCode::FORBIDDEN,
            HalaqaError::Conflict(_) => StatusCode::CONFLICT,
            HalaqaError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HalaqaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self.0 {
            HalaqaError::Validation(errors) => json!({
                "error": self.0.to_string(),
                "fields": errors,
            }),
            HalaqaError::Database(_) | HalaqaError::Internal(_) => {
                tracing::error!("Request failed: {:?}", self.0);
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Allows `?` on functions returning `Result<T, HalaqaError>`.
impl From<HalaqaError> for AppError {
    fn from(err: HalaqaError) -> Self {
        AppError(err)
    }
}

/// Repository failures surface as database errors.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(HalaqaError::Database(err))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError(HalaqaError::Validation(errors))
    }
}

/// Maps a HalaqaError straight to an HTTP response, for code paths that
/// build responses by hand.
pub fn map_error(err: HalaqaError) -> Response {
    AppError(err).into_response()
}
