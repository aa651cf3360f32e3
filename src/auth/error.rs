use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong across register and login.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error("User not found with this email")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("user store error: {0}")]
    Store(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::EmailAlreadyExists => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::UserNotFound | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Hash(_) | AuthError::Token(_) | AuthError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// A body that fails to parse into a request DTO is a validation error
/// like any other missing field, not a bare serde message.
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the logs; the client gets a generic line.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Something went wrong, please try again later".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message, "success": false }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            AuthError::Validation("Name is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::EmailAlreadyExists.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AuthError::UserNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_errors_map_to_500() {
        assert_eq!(
            AuthError::Hash("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Token("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Store("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_messages_are_stable() {
        assert_eq!(
            AuthError::EmailAlreadyExists.to_string(),
            "Email already exists"
        );
        assert_eq!(
            AuthError::UserNotFound.to_string(),
            "User not found with this email"
        );
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid password");
    }
}
