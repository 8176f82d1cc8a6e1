//! Body and query extractors that reject with [`AppError`].
//!
//! axum's own `Json`/`Query` answer a bad payload with a plain-text 422.
//! These wrappers turn the same failures into a 400 validation error so the
//! client gets the usual `fields` list.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, QueryRejection},
};
use halaqa_core::{errors::HalaqaError, validation::ValidationErrors};

use super::error_handling::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError(HalaqaError::Validation(field_error(&rejection.body_text(), "body")))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query string: {}", rejection.body_text());
        AppError(HalaqaError::Validation(field_error(&rejection.body_text(), "query")))
    }
}

/// Splits axum's rejection text into the offending path and serde's message.
///
/// Deserialization failures read `<context>: <path>: <message>`; anything
/// without a recognizable path is reported against `fallback`.
fn field_error(text: &str, fallback: &str) -> ValidationErrors {
    let detail = text
        .split_once("target type: ")
        .or_else(|| text.split_once("query string: "))
        .map_or(text, |(_, detail)| detail);

    let mut errors = ValidationErrors::new();
    match detail.split_once(": ") {
        Some((path, message)) if is_field_path(path) => errors.push(path, message),
        _ => errors.push(fallback, detail),
    }
    errors
}

fn is_field_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}
