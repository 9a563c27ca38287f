//! Panic handling.

use crate::error::AppError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::any::Any;

/// Turn a panic in a handler into a JSON-API `500` response.
pub fn catch_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic message".to_string()
    };

    tracing::error!(panic = %details, "Handler panicked");

    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, Some(details)).into_response()
}
