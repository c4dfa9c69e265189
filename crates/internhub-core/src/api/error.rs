use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response that carried a `{message}` body.
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Access denied{}", suffix(.0))]
    AccessDenied(Option<String>),

    #[error("Unauthorized - token may be expired{}", suffix(.0))]
    Unauthorized(Option<String>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a failed response to an error. A `{message}` body is kept so the
    /// server's wording can reach the user.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|parsed| parsed.message)
            .filter(|m| !m.trim().is_empty());

        match (status.as_u16(), message) {
            (401, message) => ApiError::Unauthorized(message),
            (403, message) => ApiError::AccessDenied(message),
            (_, Some(message)) => ApiError::Rejected(message),
            (404, None) => ApiError::NotFound(Self::truncate_body(body)),
            (500..=599, None) => ApiError::ServerError(Self::truncate_body(body)),
            (_, None) => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// Wording supplied by the server's error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected(message) => Some(message),
            ApiError::Unauthorized(message) | ApiError::AccessDenied(message) => message.as_deref(),
            _ => None,
        }
    }

    /// True for responses that mean the bearer token is no longer accepted.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::AccessDenied(_))
    }

    /// Message safe to show to the user. Only server-provided wording is
    /// passed through; everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}
