//!
//! # Error Handling
//!
//! This module defines `AppError`, the error type returned by every handler and
//! service in the server half of the crate. Each variant maps to exactly one HTTP
//! status and a JSON body of the form `{"message": "..."}`; validation failures
//! additionally carry an `errors` list.
//!
//! Backend failures are collapsed into `AppError::ServerFault`, whose response
//! body never contains the underlying cause. The cause is logged instead.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::store::StoreError;

/// Message returned for both unknown emails and wrong passwords.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Message returned for duplicate registrations.
pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email already registered";

/// Represents all failures a request can end in.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input (HTTP 400).
    #[error("{message}")]
    ValidationFailed {
        /// Summary shown to the caller.
        message: String,
        /// Individual field problems, possibly empty.
        errors: Vec<String>,
    },
    /// An identity with the same email already exists (HTTP 400).
    #[error("{}", DUPLICATE_EMAIL_MESSAGE)]
    DuplicateEmail,
    /// Login failed. Identical for unknown email and bad password (HTTP 401).
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,
    /// Missing, invalid or expired bearer token (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,
    /// The requested resource does not exist (HTTP 404).
    #[error("{0}")]
    NotFound(String),
    /// Unexpected backend failure (HTTP 500). The payload is for logs only.
    #[error("Internal server error")]
    ServerFault(String),
}

impl AppError {
    /// Shorthand for a validation failure with a single message and no field list.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationFailed {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Shorthand for a validation failure listing each offending field.
    pub fn invalid_input(errors: Vec<String>) -> Self {
        AppError::ValidationFailed {
            message: "Invalid input data".into(),
            errors,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationFailed { .. } | AppError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServerFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::ValidationFailed { message, errors } if !errors.is_empty() => json!({
                "message": message,
                "errors": errors,
            }),
            AppError::ServerFault(detail) => {
                log::error!("request failed: {}", detail);
                json!({ "message": self.to_string() })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Store failures surface as opaque server faults, except for the uniqueness
/// violation which has a caller-facing meaning.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            StoreError::Backend(detail) => AppError::ServerFault(detail),
        }
    }
}

/// Flattens `validator` output into one human-readable line per problem.
///
/// Fields are sorted so responses are stable across runs.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let messages = fields
            .into_iter()
            .flat_map(|(field, problems)| {
                problems.iter().map(move |problem| match &problem.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        AppError::invalid_input(messages)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::ServerFault(format!("password hashing failed: {}", error))
    }
}
