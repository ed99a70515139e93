//! Service errors rendered in the JSON error envelope

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kafejo_axum::response::error_response;
use thiserror::Error;

use crate::drinks::MenuError;

/// An error produced while handling a menu request
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body was missing a required field
    #[error("{0}")]
    Validation(&'static str),

    /// The menu store rejected the operation
    #[error(transparent)]
    Menu(#[from] MenuError),

    /// The request body could not be read as JSON
    #[error("bad request")]
    Json(#[from] JsonRejection),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Json(_) => StatusCode::BAD_REQUEST,
            ApiError::Menu(MenuError::DuplicateTitle) => StatusCode::BAD_REQUEST,
            ApiError::Menu(MenuError::NotFound) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Json(rejection) => tracing::debug!("request body rejected: {rejection}"),
            _ => tracing::debug!("request rejected: {self}"),
        }
        error_response(self.status(), &self.to_string())
    }
}
