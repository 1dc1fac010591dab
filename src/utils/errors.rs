//! Sistema de manejo de errores
//!
//! Este módulo define los errores del gestor de viajes y su conversión a
//! respuestas HTTP. Todos los errores se agrupan en tres categorías
//! (`ErrorKind`): validación, conflicto de estado y fallo del store.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::{RideId, RideTransition};

/// Categoría de un error, para manejo programático por parte del caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Store,
}

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid request method")]
    InvalidMethod,

    #[error("Ride {ride_id} does not exist")]
    UnknownRide { ride_id: RideId },

    #[error("{}", .transition.conflict_message())]
    Conflict {
        ride_id: RideId,
        transition: RideTransition,
    },

    #[error("Timed out waiting for the lock on ride {ride_id}")]
    LockTimeout { ride_id: RideId },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_)
            | AppError::MalformedRequest(_)
            | AppError::InvalidMethod
            | AppError::UnknownRide { .. } => ErrorKind::Validation,
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::LockTimeout { .. } | AppError::Database(_) | AppError::Store(_) => {
                ErrorKind::Store
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UnknownRide { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Store => "STORE_ERROR",
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let (message, details) = match &self {
            AppError::Validation(e) => {
                warn!("Validation error: {}", e);
                ("The provided data is invalid".to_string(), Some(json!(e)))
            }
            AppError::MalformedRequest(msg) => {
                warn!("Malformed request: {}", msg);
                (self.to_string(), None)
            }
            AppError::InvalidMethod => (self.to_string(), None),
            AppError::UnknownRide { ride_id } => {
                warn!("Unknown ride {}", ride_id);
                (self.to_string(), Some(json!({ "ride_id": ride_id })))
            }
            AppError::Conflict { ride_id, transition } => {
                warn!("Conflict on ride {} ({}): {}", ride_id, transition, self);
                (
                    self.to_string(),
                    Some(json!({ "ride_id": ride_id, "transition": transition })),
                )
            }
            AppError::LockTimeout { ride_id } => {
                warn!("Lock timeout on ride {}", ride_id);
                (self.to_string(), Some(json!({ "ride_id": ride_id })))
            }
            AppError::Database(e) => {
                error!("Database error: {}", e);
                (
                    "An error occurred while accessing the database".to_string(),
                    Some(json!({ "sql_error": e.to_string() })),
                )
            }
            AppError::Store(msg) => {
                error!("Store error: {}", msg);
                (
                    "An error occurred while accessing the store".to_string(),
                    Some(json!({ "store_error": msg })),
                )
            }
        };

        let body = ErrorResponse {
            status: "error",
            message,
            code,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación sobre un campo
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(message.into());

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}
