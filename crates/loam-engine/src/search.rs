//! [`QueryPlanner`] — turns a free-text query plus structured filters into
//! a store lookup, preferring the fast index when it exists.
//!
//! Fast path: the query is rewritten into a prefix-match expression (each
//! word wildcard-suffixed, OR-combined — any-word semantics, recall over
//! precision) and executed against the index in rank order. Slow path:
//! substring matching, most recent first. Semantic search is accepted as a
//! flag but has no backing implementation; it degrades to the slow path
//! with a warning.

use std::sync::Arc;

use loam_core::{
  Entity,
  store::{EntityFilter, KnowledgeStore, Page},
};
use serde::Serialize;

use crate::{
  error::{Error, Result},
  index::IndexManager,
};

/// A search request as issued by a CLI or tool-endpoint caller.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
  pub query:           String,
  pub entity_type:     Option<String>,
  pub category:        Option<String>,
  pub tag:             Option<String>,
  /// Slow path only: also substring-match against content, not just titles.
  pub include_content: bool,
  /// Accepted but unsupported; degrades to the slow path with a warning.
  pub semantic:        bool,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

/// One page of results plus the total match count.
///
/// On the slow path `count` is computed with a word-by-word predicate that
/// is looser than the page's single-pattern match, so it can exceed the
/// number of rows any page will ever return. See DESIGN.md.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
  pub results: Vec<Entity>,
  pub count:   usize,
}

pub struct QueryPlanner<S> {
  store: Arc<S>,
  index: Arc<IndexManager<S>>,
}

impl<S: KnowledgeStore> QueryPlanner<S> {
  pub fn new(store: Arc<S>, index: Arc<IndexManager<S>>) -> Self {
    Self { store, index }
  }

  pub async fn search(&self, req: &SearchRequest) -> Result<SearchResults> {
    let limit = req.limit.unwrap_or(Page::default().limit);
    if limit == 0 {
      return Err(Error::InvalidArgument("limit must be positive".into()));
    }
    let page = Page { limit, offset: req.offset.unwrap_or(0) };

    let filter = EntityFilter {
      entity_type: req.entity_type.clone(),
      category:    req.category.clone(),
      tag:         req.tag.clone(),
    };

    // Blank query: structured filters only, title order.
    let query = req.query.trim();
    if query.is_empty() {
      let (results, count) = self
        .store
        .list_entities(&filter, &page)
        .await
        .map_err(Error::store)?;
      return Ok(SearchResults { results, count });
    }

    if req.semantic {
      tracing::warn!("semantic search is not supported, using substring fallback");
    }

    let fast = if req.semantic {
      false
    } else {
      match self.index.has_fast_index().await {
        Ok(present) => present,
        // A failed probe degrades the request instead of failing it.
        Err(e) => {
          tracing::warn!(error = %e, "index probe failed, using substring fallback");
          false
        }
      }
    };

    if fast {
      let expr = optimize_match_expr(query);
      let (results, count) = self
        .store
        .search_index(&expr, &filter, &page)
        .await
        .map_err(Error::store)?;
      return Ok(SearchResults { results, count });
    }

    // Slow path: one LIKE pattern for the page, word-by-word AND for the
    // total.
    let results = self
      .store
      .match_entities(query, req.include_content, &filter, &page)
      .await
      .map_err(Error::store)?;

    let words: Vec<String> =
      query.split_whitespace().map(str::to_owned).collect();
    let count = self
      .store
      .count_word_matches(&words, &filter)
      .await
      .map_err(Error::store)?;

    Ok(SearchResults { results, count })
  }
}

/// Rewrite a query for the full-text backend: every word becomes a quoted
/// prefix match, multi-word queries are OR-combined.
fn optimize_match_expr(query: &str) -> String {
  query
    .split_whitespace()
    .map(|w| format!("\"{}\"*", w.replace('"', "")))
    .collect::<Vec<_>>()
    .join(" OR ")
}
