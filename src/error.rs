use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store timeout: {0}")]
    StoreTimeout(String),

    #[error("Row with id {0} not found")]
    RowNotFound(i32),

    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Decode fault in built-in payload '{name}': {source}")]
    DecodeFault {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BenchResult<T> = Result<T, BenchError>;

impl BenchError {
    /// Variant name used as the `type` field of error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::StoreUnavailable(_) => "StoreUnavailable",
            BenchError::StoreTimeout(_) => "StoreTimeout",
            BenchError::RowNotFound(_) => "RowNotFound",
            BenchError::RenderFailure(_) => "RenderFailure",
            BenchError::DecodeFault { .. } => "DecodeFault",
            BenchError::Config(_) => "Config",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BenchError::StoreTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for BenchError {
    fn from(err: rusqlite::Error) -> Self {
        BenchError::StoreUnavailable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for BenchError {
    fn from(err: tokio::task::JoinError) -> Self {
        BenchError::StoreUnavailable(format!("store task aborted: {}", err))
    }
}

impl From<std::fmt::Error> for BenchError {
    fn from(err: std::fmt::Error) -> Self {
        BenchError::RenderFailure(err.to_string())
    }
}

impl IntoResponse for BenchError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::SERVICE_UNAVAILABLE => tracing::warn!("{}", self),
            _ => tracing::error!("{}", self),
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
            "type": self.kind(),
        });

        (status, Json(body)).into_response()
    }
}
