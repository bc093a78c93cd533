//! The Loam search-and-relation engine.
//!
//! Four components over any [`KnowledgeStore`]: index lifecycle
//! ([`IndexManager`]), fast/slow search planning ([`QueryPlanner`]),
//! bounded relation traversal ([`GraphTraversal`]), and token-budgeted
//! context assembly ([`ContextAssembler`]). [`Engine`] bundles them behind
//! one handle for HTTP/CLI callers.
//!
//! All shared mutable state lives in the store; the engine itself needs no
//! locking. Each call runs to completion for one caller, suspending only
//! on store I/O.

pub mod context;
pub mod error;
pub mod index;
pub mod related;
pub mod search;

use std::sync::Arc;

use loam_core::store::KnowledgeStore;
use uuid::Uuid;

pub use context::{ContextAssembler, ContextRequest, ContextResult};
pub use error::{Error, Result};
pub use index::{IndexManager, RebuildReport};
pub use related::{Direction, GraphTraversal, RelatedEntity, RelatedOptions};
pub use search::{QueryPlanner, SearchRequest, SearchResults};

#[cfg(test)]
mod tests;

/// All four engine components wired to one store.
pub struct Engine<S> {
  store:     Arc<S>,
  index:     Arc<IndexManager<S>>,
  planner:   QueryPlanner<S>,
  traversal: GraphTraversal<S>,
  assembler: ContextAssembler<S>,
}

impl<S: KnowledgeStore> Engine<S> {
  pub fn new(store: Arc<S>) -> Self {
    let index = Arc::new(IndexManager::new(store.clone()));
    Self {
      planner:   QueryPlanner::new(store.clone(), index.clone()),
      traversal: GraphTraversal::new(store.clone()),
      assembler: ContextAssembler::new(store.clone()),
      index,
      store,
    }
  }

  /// The underlying store, for callers that need direct entity access.
  pub fn store(&self) -> &Arc<S> { &self.store }

  pub async fn search(&self, req: &SearchRequest) -> Result<SearchResults> {
    self.planner.search(req).await
  }

  pub async fn find_related(
    &self,
    origin: Uuid,
    opts:   &RelatedOptions,
  ) -> Result<Vec<RelatedEntity>> {
    self.traversal.find_related(origin, opts).await
  }

  pub async fn build_context(&self, req: &ContextRequest) -> Result<ContextResult> {
    self.assembler.build_context(req).await
  }

  pub async fn update_index(&self, entity_id: Uuid) -> Result<()> {
    self.index.update_index(entity_id).await
  }

  pub async fn rebuild_index(&self, force: bool) -> Result<RebuildReport> {
    self.index.rebuild_index(force).await
  }

  pub async fn has_fast_index(&self) -> Result<bool> {
    self.index.has_fast_index().await
  }
}
