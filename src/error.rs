use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PopError {
    /// Dataset header is missing required columns. Fatal at startup.
    #[error("dataset is missing columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A dataset cell could not be coerced to the column's type.
    #[error("line {line}: invalid {column}: {reason}")]
    Parse {
        line: u64,
        column: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("City and year are required")]
    InvalidRequest,

    #[error("No data for {0}")]
    NotFound(String),
}

impl PopError {
    pub fn status(&self) -> StatusCode {
        match self {
            PopError::InvalidRequest => StatusCode::BAD_REQUEST,
            PopError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PopError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            PopError::InvalidRequest => tracing::warn!("rejected request: {}", self),
            PopError::NotFound(city) => tracing::debug!(city = %city, "unknown city"),
            _ => tracing::error!("request failed: {}", self),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PopError>;
