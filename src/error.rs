use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use thiserror::Error;

use crate::auth::auth_log::{AuthFailure, ErrorCategory};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("external service unavailable")]
    Upstream(String),
    #[error("Something went wrong, Contact with system admin")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Internal(e) => tracing::error!(error = %e, "Internal error"),
            ApiError::Upstream(detail) => tracing::warn!(detail = %detail, "Upstream failure"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

/// Rejected JSON bodies answer with the usual `{"message"}` body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid request body: {err}")).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid query string: {err}")).into())
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // MySQL reports duplicate keys and FK violations as SQLSTATE 23000
            if db_err.code().as_deref() == Some("23000") {
                return ApiError::Conflict("Record conflicts with existing data".to_string());
            }
        }
        if matches!(e, sqlx::Error::RowNotFound) {
            return ApiError::NotFound("Record not found".to_string());
        }
        ApiError::Internal(anyhow::Error::new(e).context("database error"))
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        let msg = failure.user_message().to_string();
        match failure {
            AuthFailure::EmailTaken => ApiError::Conflict(msg),
            AuthFailure::InactiveAccount => ApiError::Forbidden(msg),
            AuthFailure::MissingConfig(detail) | AuthFailure::Backend(detail) => {
                ApiError::Internal(anyhow::anyhow!(detail))
            }
            other => match other.category() {
                ErrorCategory::Validation => ApiError::BadRequest(msg),
                _ => ApiError::Unauthorized(msg),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn auth_failures_keep_their_user_message() {
        let err: ApiError = AuthFailure::TokenExpired.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Your session has expired. Sign in again");

        let err: ApiError = AuthFailure::EmailTaken.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: ApiError = AuthFailure::WeakPassword.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = AuthFailure::Backend("pool closed".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Upstream("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn row_not_found_becomes_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("10.0.0.3"));
        assert!(text.contains("Contact with system admin"));
    }
}
