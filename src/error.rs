use std::collections::HashMap;

use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde_json::{json, Value};

/// Errors surfaced to HTTP clients as `{"success": false, ...}` bodies.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
    /// Per-field messages, keyed by the request field name.
    Validation(HashMap<String, String>),
    Conflict(String),
    TooManyRequests(String),
    Internal(String),
}

pub type ApiResult = Result<Json<Value>, ApiError>;

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::Conflict(_) => Status::Conflict,
            Self::TooManyRequests(_) => Status::TooManyRequests,
            Self::Internal(_) => Status::InternalServerError,
        }
    }

    /// Single-field validation error.
    pub fn field(name: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(name.to_string(), message.to_string());
        Self::Validation(errors)
    }

    fn body(&self) -> Value {
        match self {
            Self::Validation(errors) => json!({
                "success": false,
                "error": "Validation failed",
                "errors": errors,
            }),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Conflict(msg)
            | Self::TooManyRequests(msg)
            | Self::Internal(msg) => json!({"success": false, "error": msg}),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "validation failed on {} field(s)", errors.len()),
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Conflict(m)
            | Self::TooManyRequests(m)
            | Self::Internal(m) => write!(f, "{}", m),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let Self::Internal(ref msg) = self {
            log::error!("{} {}: {}", req.method(), req.uri(), msg);
        }
        (self.status(), Json(self.body())).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_422_with_field_errors() {
        let err = ApiError::field("customer_email", "Please enter a valid email address");
        assert_eq!(err.status(), Status::UnprocessableEntity);
        let body = err.body();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["customer_email"], "Please enter a valid email address");
    }

    #[test]
    fn plain_errors_carry_message() {
        let err = ApiError::Conflict("Category 'art' already exists".into());
        assert_eq!(err.status(), Status::Conflict);
        assert_eq!(err.body()["error"], "Category 'art' already exists");
    }
}
