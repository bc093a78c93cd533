//! Handlers for `/entities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/entities/:permalink` | Single entity |
//! | `GET`  | `/entities/:permalink/related` | Bounded relation traversal; optional `depth`, `relation_type`, `entity_type` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use loam_core::{Entity, store::KnowledgeStore};
use loam_engine::{Engine, RelatedEntity, RelatedOptions};
use serde::Deserialize;

use crate::error::ApiError;

async fn resolve<S>(engine: &Engine<S>, permalink: &str) -> Result<Entity, ApiError>
where S: KnowledgeStore {
  engine
    .store()
    .get_entity_by_permalink(permalink)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("entity {permalink:?} not found")))
}

/// `GET /entities/:permalink`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(permalink): Path<String>,
) -> Result<Json<Entity>, ApiError>
where S: KnowledgeStore {
  let entity = resolve(&engine, &permalink).await?;
  Ok(Json(entity))
}

#[derive(Debug, Deserialize, Default)]
pub struct RelatedParams {
  /// Maximum number of hops; defaults to 1 (direct neighbours).
  pub depth:         Option<usize>,
  pub relation_type: Option<String>,
  pub entity_type:   Option<String>,
}

/// `GET /entities/:permalink/related[?depth=...][&relation_type=...][&entity_type=...]`
pub async fn related<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(permalink): Path<String>,
  Query(params): Query<RelatedParams>,
) -> Result<Json<Vec<RelatedEntity>>, ApiError>
where S: KnowledgeStore {
  let origin = resolve(&engine, &permalink).await?;

  let opts = RelatedOptions {
    depth:         params.depth.unwrap_or(1),
    relation_type: params.relation_type,
    entity_type:   params.entity_type,
  };

  let related = engine.find_related(origin.entity_id, &opts).await?;
  Ok(Json(related))
}
