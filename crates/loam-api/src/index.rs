//! Handlers for `/index` endpoints — search-index lifecycle.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use loam_core::store::KnowledgeStore;
use loam_engine::{Engine, RebuildReport};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct RebuildBody {
  /// Re-index entities that already have an index entry.
  #[serde(default)]
  pub force: bool,
}

/// `POST /index/rebuild` — body `{"force": bool}`; returns the aggregate
/// report. Per-entity failures are logged server-side and counted, never
/// fatal.
pub async fn rebuild<S>(
  State(engine): State<Arc<Engine<S>>>,
  Json(body): Json<RebuildBody>,
) -> Result<Json<RebuildReport>, ApiError>
where S: KnowledgeStore {
  let report = engine.rebuild_index(body.force).await?;
  Ok(Json(report))
}

/// `POST /index/update/:permalink` — reindex one entity.
pub async fn update_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(permalink): Path<String>,
) -> Result<StatusCode, ApiError>
where S: KnowledgeStore {
  let entity = engine
    .store()
    .get_entity_by_permalink(&permalink)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("entity {permalink:?} not found")))?;

  engine.update_index(entity.entity_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
