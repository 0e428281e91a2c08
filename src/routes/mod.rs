/**
 * Routes Module
 * API route handlers and shared response plumbing
 */

pub mod auth;
pub mod blog;
pub mod books;
pub mod dashboard;
pub mod gear;
pub mod health;
pub mod projects;
pub mod rss;
pub mod social_links;
pub mod sports;
pub mod uploads;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::validate::ValidationErrors;
use crate::routes::auth::verify_access_token;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Success response (for delete)
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: None,
        }),
    )
        .into_response()
}

pub fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

pub fn db_unavailable() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Database not available")
}

pub fn db_error(context: &str, e: sqlx::Error) -> Response {
    tracing::error!("Database error {}: {}", context, e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
}

/// 422 with the field-keyed error map, so forms can annotate inputs.
pub fn validation_failed(errors: ValidationErrors) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
}

/// Duplicate-key races on unique columns surface as a validation-style 409,
/// never a 500.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

pub fn conflict(field: &str, message: &str) -> Response {
    let mut errors = ValidationErrors::new();
    errors.add(field, message);
    (StatusCode::CONFLICT, Json(errors)).into_response()
}

/// Extract and verify the bearer token for admin handlers.
pub fn verify_auth(headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(t) => match verify_access_token(t) {
            Ok(_) => Ok(()),
            Err(_) => Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token",
            )),
        },
        None => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Authorization required",
        )),
    }
}

/// Clamp a requested limit into 1..=max.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
        assert_eq!(clamp_limit(Some(5), 20, 100), 5);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
        assert_eq!(clamp_limit(Some(1000), 20, 100), 100);
    }

    #[test]
    fn test_verify_auth_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(verify_auth(&headers).is_err());
    }

    #[test]
    fn test_verify_auth_rejects_garbage_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer not-a-jwt".parse().unwrap());
        assert!(verify_auth(&headers).is_err());
    }
}
