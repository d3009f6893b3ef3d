//! Error types for the KPI dashboard
//!
//! Join mismatches have no variant: an author that matches no staff record
//! is reported data, not a failure.

use thiserror::Error;

/// Result type alias using KpiError
pub type Result<T> = std::result::Result<T, KpiError>;

/// Everything that can stop a read, a write or a render
#[derive(Error, Debug)]
pub enum KpiError {
    /// Workbook missing or unreadable, worksheet absent, write failed
    #[error("store unavailable: {0}")]
    Connectivity(String),

    /// A required column header is absent from a table
    #[error("table `{table}` is missing column `{column}`")]
    SchemaMismatch { table: String, column: String },

    /// Submitted data rejected before any write
    #[error("invalid input: {0}")]
    Validation(String),

    /// A publication with the same title already exists
    #[error("a publication titled `{0}` already exists")]
    Duplicate(String),

    /// Nothing matched the requested identity
    #[error("not found: {0}")]
    NotFound(String),

    /// Admin-only operation without an admin session
    #[error("admin login required")]
    Unauthorized,

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// Password hashing failure
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KpiError {
    /// Short machine-readable name used in JSON error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            KpiError::Connectivity(_) => "connectivity",
            KpiError::SchemaMismatch { .. } => "schema_mismatch",
            KpiError::Validation(_) => "validation",
            KpiError::Duplicate(_) => "duplicate",
            KpiError::NotFound(_) => "not_found",
            KpiError::Unauthorized => "unauthorized",
            KpiError::Config(_) => "config",
            KpiError::Auth(_) => "auth",
            KpiError::Chart(_) => "chart",
            KpiError::Export(_) => "export",
            KpiError::Io(_) => "io",
        }
    }
}

#[cfg(feature = "web")]
mod web {
    use super::KpiError;
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };

    impl KpiError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                KpiError::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
                KpiError::Validation(_) => StatusCode::BAD_REQUEST,
                KpiError::Duplicate(_) => StatusCode::CONFLICT,
                KpiError::NotFound(_) => StatusCode::NOT_FOUND,
                KpiError::Unauthorized => StatusCode::UNAUTHORIZED,
                KpiError::SchemaMismatch { .. }
                | KpiError::Config(_)
                | KpiError::Auth(_)
                | KpiError::Chart(_)
                | KpiError::Export(_)
                | KpiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for KpiError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                log::error!("request failed: {}", self);
            }
            let body = serde_json::json!({
                "status": "error",
                "kind": self.kind(),
                "message": self.to_string(),
            });
            (status, Json(body)).into_response()
        }
    }
}
