use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("shopping cart is empty")]
    EmptyCart,

    #[error("you cannot subscribe to yourself")]
    SelfFollow,

    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound | AppError::EmptyCart => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_)
            | AppError::SelfFollow
            | AppError::Validation { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Validation failures carry a field-keyed message map instead of
        // the flat error string.
        if let AppError::Validation { field, message } = &self {
            let mut fields = serde_json::Map::new();
            fields.insert(
                (*field).to_string(),
                serde_json::Value::String(message.clone()),
            );
            let body = ApiResponse {
                message: "Validation failed".to_string(),
                data: Some(serde_json::Value::Object(fields)),
                meta: Some(Meta::empty()),
            };
            return (status, axum::Json(body)).into_response();
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
