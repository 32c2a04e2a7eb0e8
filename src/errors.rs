// src/errors.rs
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::payment_request::PaymentStatus;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Payment request {id} was already {status}")]
    AlreadyDecided { id: String, status: PaymentStatus },

    #[error("Authentication error")]
    AuthError,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MongoDB(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingFields(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyDecided { .. } => StatusCode::CONFLICT,
            AppError::AuthError => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Store failures are logged in full but surfaced generically.
        let error_message = match &self {
            AppError::MongoDB(_) | AppError::StoreError(_) => {
                tracing::error!("❌ {}", self);
                "Internal server error".to_string()
            }
            AppError::ConfigurationError(_) => {
                tracing::error!("❌ {}", self);
                "Configuration error".to_string()
            }
            _ => self.to_string(),
        };

        let mut body = json!({
            "success": false,
            "error": error_message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let AppError::MissingFields(fields) = &self {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        for error in errors.field_errors().values().flat_map(|errs| errs.iter()) {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            match message.strip_suffix(" is required") {
                Some(field) if error.code == "length" => missing.push(field.to_string()),
                _ => invalid.push(message),
            }
        }

        if !missing.is_empty() {
            missing.sort();
            AppError::MissingFields(missing)
        } else {
            invalid.sort();
            AppError::ValidationError(invalid.join("; "))
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        AppError::StoreError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
