//! Handler for `GET /search`.
//!
//! Query params map directly to [`SearchRequest`] fields. A blank `q`
//! returns entities matching only the structured filters.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use loam_core::store::KnowledgeStore;
use loam_engine::{Engine, SearchRequest, SearchResults};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  /// Free-text query; blank means "structured filters only".
  pub q:               Option<String>,
  pub entity_type:     Option<String>,
  pub category:        Option<String>,
  pub tag:             Option<String>,
  /// Slow path only: also match against content.
  #[serde(default)]
  pub include_content: bool,
  /// Accepted but unsupported; the request degrades to substring search.
  #[serde(default)]
  pub semantic:        bool,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

/// `GET /search[?q=...][&entity_type=...][&category=...][&tag=...][&limit=...][&offset=...]`
pub async fn handler<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError>
where S: KnowledgeStore {
  let request = SearchRequest {
    query:           params.q.unwrap_or_default(),
    entity_type:     params.entity_type,
    category:        params.category,
    tag:             params.tag,
    include_content: params.include_content,
    semantic:        params.semantic,
    limit:           params.limit,
    offset:          params.offset,
  };

  let results = engine.search(&request).await?;
  Ok(Json(results))
}
