//! [`ApiError`] — the single error type all handlers return.
//!
//! Engine errors map onto HTTP statuses here so handlers can use `?`
//! throughout: unknown entities become 404, rejected arguments 400, and
//! anything from the storage layer 500.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<loam_engine::Error> for ApiError {
  fn from(e: loam_engine::Error) -> Self {
    match e {
      loam_engine::Error::EntityNotFound(id) => {
        Self::NotFound(format!("entity {id} not found"))
      }
      loam_engine::Error::InvalidArgument(m) => Self::BadRequest(m),
      loam_engine::Error::Store(inner) => Self::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = Json(json!({ "error": self.to_string() }));
    (status, body).into_response()
  }
}
