use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt;

use crate::auth::client::AuthError;
use crate::hub::HubError;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Hub(HubError),
    Auth(AuthError),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    InvalidState(String),
    Validation(String),
    Conflict(String),
    Internal(String),
}

/// JSON error body shared by every API endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl AppError {
    /// Collapse a list of field errors into a single validation failure.
    pub fn from_field_errors(errors: Vec<String>) -> Self {
        AppError::Validation(errors.join("; "))
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidState(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Hub(HubError::Api { message, .. }) => message.clone(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Hub(e) => write!(f, "Hub error: {e}"),
            AppError::Auth(e) => write!(f, "Auth error: {e}"),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            AppError::Validation(msg) => write!(f, "Validation error: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) | AppError::Validation(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            // Relay the Hub's verdict on requests it rejected.
            AppError::Hub(HubError::Api { status, .. }) if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("{self}");
        }
        HttpResponse::build(status).json(ApiErrorResponse {
            error: self.client_message(),
            details: None,
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Not found".to_string()),
            other => AppError::Db(other),
        }
    }
}

impl From<HubError> for AppError {
    fn from(e: HubError) -> Self {
        AppError::Hub(e)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}
