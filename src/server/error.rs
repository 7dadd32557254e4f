//! Error types for the server

use super::pages;
use crate::error::RiskError;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            ServerError::BadRequest(msg) => msg.clone(),
            ServerError::ModelUnavailable(_) => {
                "The prediction model is not available. Train a model and restart the server."
                    .to_string()
            }
            ServerError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    fn log(&self) {
        match self {
            ServerError::BadRequest(msg) => tracing::debug!(detail = %msg, "Rejected request"),
            ServerError::ModelUnavailable(msg) => tracing::warn!(detail = %msg, "Model unavailable"),
            ServerError::Internal(msg) => tracing::error!(detail = %msg, "Internal server error"),
        }
    }
}

impl From<RiskError> for ServerError {
    fn from(err: RiskError) -> Self {
        match err {
            e if e.is_client_error() => ServerError::BadRequest(e.to_string()),
            e @ (RiskError::ModelNotFoundError(_)
            | RiskError::SerializationError(_)
            | RiskError::ModelNotFitted) => ServerError::ModelUnavailable(e.to_string()),
            e => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("prediction task failed: {}", err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        self.log();
        let body = Json(json!({
            "error": true,
            "message": self.public_message(),
        }));
        (self.status(), body).into_response()
    }
}

/// A [`ServerError`] rendered as an HTML page for the browser form
#[derive(Debug)]
pub struct HtmlError(pub ServerError);

impl From<ServerError> for HtmlError {
    fn from(err: ServerError) -> Self {
        HtmlError(err)
    }
}

impl From<RiskError> for HtmlError {
    fn from(err: RiskError) -> Self {
        HtmlError(err.into())
    }
}

impl From<tokio::task::JoinError> for HtmlError {
    fn from(err: tokio::task::JoinError) -> Self {
        HtmlError(err.into())
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        self.0.log();
        let status = self.0.status();
        (status, Html(pages::error_page(status, &self.0.public_message()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
