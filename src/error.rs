use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Validation messages keyed by the form field they belong to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`. A later message replaces an earlier one.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(HubError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.values().map(String::as_str).collect();
        f.write_str(&joined.join(" "))
    }
}

/// Errors produced by the hub and its storage
#[derive(Debug, Error)]
pub enum HubError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not signed in")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse stored data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;

#[cfg(feature = "web")]
mod response {
    use super::HubError;
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde_json::json;

    impl HubError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                HubError::Validation(_) => StatusCode::BAD_REQUEST,
                HubError::InvalidCredentials | HubError::Unauthenticated => {
                    StatusCode::UNAUTHORIZED
                }
                HubError::Forbidden(_) => StatusCode::FORBIDDEN,
                HubError::NotFound(_) => StatusCode::NOT_FOUND,
                HubError::PasswordHash(_)
                | HubError::Io(_)
                | HubError::Json(_)
                | HubError::Snapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for HubError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                log::error!("request failed: {}", self);
            }

            let body = match &self {
                HubError::Validation(fields) => json!({
                    "status": "error",
                    "message": "Please fix validation issues before continuing.",
                    "fields": fields,
                }),
                other => json!({
                    "status": "error",
                    "message": other.to_string(),
                }),
            };

            (status, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn field_errors_become_validation_error() {
        let mut errors = FieldErrors::new();
        errors.add("title", "Title is required.");
        errors.add("tags", "Tags are required.");
        match errors.into_result() {
            Err(HubError::Validation(fields)) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields.get("title"), Some("Title is required."));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
