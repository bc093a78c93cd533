//! Error type for `loam-engine`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("entity not found: {0}")]
  EntityNotFound(Uuid),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into the opaque [`Error::Store`] variant.
  pub fn store<E>(e: E) -> Self
  where E: std::error::Error + Send + Sync + 'static {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
