//! [`IndexManager`] — lifecycle of the derived full-text search index.
//!
//! The index is a cache of entity titles and content, tokenized for the
//! store's accelerated search structure. It is rebuilt or incrementally
//! refreshed from entities and tolerates staleness between refreshes.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use loam_core::{
  Entity,
  store::{EntityFilter, IndexEntry, KnowledgeStore, Page},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Content tokens per entity are capped to bound index entry size.
const MAX_CONTENT_TOKENS: usize = 1000;

/// Entities are re-indexed in pages of this size during a rebuild.
const REBUILD_PAGE: usize = 100;

/// Aggregate outcome of [`IndexManager::rebuild_index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
  pub created: usize,
  pub updated: usize,
  pub skipped: usize,
  pub total:   usize,
}

enum ReindexOutcome {
  Created,
  Updated,
  Skipped,
}

/// Owns the search index lifecycle for one store.
pub struct IndexManager<S> {
  store:         Arc<S>,
  /// Set once the accelerated structure has been observed to exist. A
  /// negative probe is never cached — the index may be created later in
  /// the same run.
  index_present: AtomicBool,
}

impl<S: KnowledgeStore> IndexManager<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, index_present: AtomicBool::new(false) }
  }

  /// Whether the accelerated search structure is available.
  pub async fn has_fast_index(&self) -> Result<bool> {
    if self.index_present.load(Ordering::Relaxed) {
      return Ok(true);
    }
    let present = self.store.probe_index().await.map_err(Error::store)?;
    if present {
      self.index_present.store(true, Ordering::Relaxed);
    }
    Ok(present)
  }

  /// Recompute the index entry for one entity.
  ///
  /// Fails with [`Error::EntityNotFound`] if the entity does not exist.
  pub async fn update_index(&self, entity_id: Uuid) -> Result<()> {
    let entity = self
      .store
      .get_entity(entity_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::EntityNotFound(entity_id))?;

    self
      .store
      .upsert_index_entry(entity_id, &tokenize_entity(&entity))
      .await
      .map_err(Error::store)
  }

  /// Walk all entities and (re)build their index entries.
  ///
  /// Entities that already have an entry are skipped unless `force`.
  /// Per-item failures are logged and counted as skipped; they never abort
  /// the walk, so the call is safe to re-run after a partial failure.
  pub async fn rebuild_index(&self, force: bool) -> Result<RebuildReport> {
    let filter = EntityFilter::default();
    let mut report = RebuildReport::default();
    let mut offset = 0;

    loop {
      let page = Page { limit: REBUILD_PAGE, offset };
      let (entities, _) = self
        .store
        .list_entities(&filter, &page)
        .await
        .map_err(Error::store)?;
      if entities.is_empty() {
        break;
      }
      let fetched = entities.len();

      for entity in entities {
        report.total += 1;
        match self.reindex_one(&entity, force).await {
          Ok(ReindexOutcome::Created) => report.created += 1,
          Ok(ReindexOutcome::Updated) => report.updated += 1,
          Ok(ReindexOutcome::Skipped) => report.skipped += 1,
          Err(e) => {
            tracing::warn!(
              permalink = %entity.permalink,
              error = %e,
              "failed to reindex entity, continuing"
            );
            report.skipped += 1;
          }
        }
      }

      if fetched < REBUILD_PAGE {
        break;
      }
      offset += REBUILD_PAGE;
    }

    Ok(report)
  }

  async fn reindex_one(&self, entity: &Entity, force: bool) -> Result<ReindexOutcome> {
    let existing = self
      .store
      .has_index_entry(entity.entity_id)
      .await
      .map_err(Error::store)?;
    if existing && !force {
      return Ok(ReindexOutcome::Skipped);
    }

    self
      .store
      .upsert_index_entry(entity.entity_id, &tokenize_entity(entity))
      .await
      .map_err(Error::store)?;

    Ok(if existing { ReindexOutcome::Updated } else { ReindexOutcome::Created })
  }
}

/// Tokenize an entity for indexing: lowercase, whitespace-delimited, with
/// content capped at [`MAX_CONTENT_TOKENS`].
pub fn tokenize_entity(entity: &Entity) -> IndexEntry {
  IndexEntry {
    title_tokens:   tokens(&entity.title, usize::MAX),
    content_tokens: tokens(&entity.content, MAX_CONTENT_TOKENS),
  }
}

fn tokens(text: &str, cap: usize) -> Vec<String> {
  text
    .split_whitespace()
    .map(|t| t.to_lowercase())
    .take(cap)
    .collect()
}
