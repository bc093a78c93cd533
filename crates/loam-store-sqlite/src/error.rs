//! Error type for `loam-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("timestamp parse error: {0}")]
  Timestamp(#[from] chrono::ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
