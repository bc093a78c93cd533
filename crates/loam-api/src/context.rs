//! Handler for `GET /context` — token-budgeted context assembly.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use loam_core::store::KnowledgeStore;
use loam_engine::{ContextRequest, ContextResult, Engine};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ContextParams {
  pub query:       String,
  /// Candidate cap; defaults to 5.
  pub max_results: Option<usize>,
  /// Approximate token budget; defaults to 4000.
  pub max_tokens:  Option<usize>,
}

/// `GET /context?query=...[&max_results=...][&max_tokens=...]`
pub async fn handler<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<ContextParams>,
) -> Result<Json<ContextResult>, ApiError>
where S: KnowledgeStore {
  let mut request = ContextRequest::new(params.query);
  if let Some(n) = params.max_results {
    request.max_results = n;
  }
  if let Some(n) = params.max_tokens {
    request.max_tokens = n;
  }

  let result = engine.build_context(&request).await?;
  Ok(Json(result))
}
