//! [`ContextAssembler`] — packs the most relevant entities for a query
//! into one token-budgeted text blob for an AI-assistant caller.
//!
//! Ranking and packing are deliberately simple: candidates are taken in
//! rank order (title matches first, then recency) and appended greedily
//! until the budget is hit. No bin-packing across the budget — the first
//! overflowing entity is truncated only when nothing else was accepted yet.

use std::sync::Arc;

use loam_core::{
  Entity,
  store::{EntityFilter, KnowledgeStore, Page},
};
use serde::Serialize;

use crate::error::{Error, Result};

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const DEFAULT_MAX_TOKENS: usize = 4000;

/// Separator between packed entity fragments.
const SEPARATOR: &str = "\n\n---\n\n";

/// Returned when no entity matches the query at all.
const NO_CONTEXT: &str = "No relevant information found.";

/// Parameters for [`ContextAssembler::build_context`].
#[derive(Debug, Clone)]
pub struct ContextRequest {
  pub query:       String,
  /// Candidate cap, applied before packing.
  pub max_results: usize,
  /// Approximate token budget for the assembled blob.
  pub max_tokens:  usize,
}

impl ContextRequest {
  pub fn new(query: impl Into<String>) -> Self {
    Self {
      query:       query.into(),
      max_results: DEFAULT_MAX_RESULTS,
      max_tokens:  DEFAULT_MAX_TOKENS,
    }
  }
}

/// One entity that contributed to the assembled context.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSource {
  pub title:       String,
  pub permalink:   String,
  pub entity_type: String,
  pub truncated:   bool,
}

/// The assembled blob and its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ContextResult {
  pub context:      String,
  pub source_count: usize,
  pub sources:      Vec<ContextSource>,
}

pub struct ContextAssembler<S> {
  store: Arc<S>,
}

impl<S: KnowledgeStore> ContextAssembler<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Select up to `max_results` entities relevant to the query and pack
  /// them into a blob of roughly `max_tokens` tokens.
  pub async fn build_context(&self, req: &ContextRequest) -> Result<ContextResult> {
    let query = req.query.trim();
    if query.is_empty() {
      return Err(Error::InvalidArgument("query must not be blank".into()));
    }

    let candidates = self
      .store
      .match_entities(
        query,
        true,
        &EntityFilter::default(),
        &Page { limit: req.max_results, offset: 0 },
      )
      .await
      .map_err(Error::store)?;

    if candidates.is_empty() {
      return Ok(ContextResult {
        context:      NO_CONTEXT.to_owned(),
        source_count: 0,
        sources:      Vec::new(),
      });
    }

    let mut used = 0usize;
    let mut fragments: Vec<String> = Vec::new();
    let mut sources: Vec<ContextSource> = Vec::new();

    for entity in candidates {
      let fragment = format!("## {}\n\n{}", entity.title, entity.content);
      let cost = estimate_tokens(&fragment);

      if used + cost <= req.max_tokens {
        used += cost;
        fragments.push(fragment);
        sources.push(source_of(&entity, false));
        continue;
      }

      // Overflow. Truncate only when nothing has been accepted yet;
      // otherwise drop the rest outright.
      if sources.is_empty() {
        let header = format!("## {}\n\n", entity.title);
        let header_chars = header.chars().count();
        let budget_chars = req.max_tokens.saturating_mul(4);
        if budget_chars > header_chars {
          let clipped: String = entity
            .content
            .chars()
            .take(budget_chars - header_chars)
            .collect();
          fragments.push(format!("{header}{clipped}"));
          sources.push(source_of(&entity, true));
        }
      }
      break;
    }

    if fragments.is_empty() {
      // Budget too small to hold even a truncated first entity.
      return Ok(ContextResult {
        context:      NO_CONTEXT.to_owned(),
        source_count: 0,
        sources:      Vec::new(),
      });
    }

    Ok(ContextResult {
      context:      fragments.join(SEPARATOR),
      source_count: sources.len(),
      sources,
    })
  }
}

fn source_of(entity: &Entity, truncated: bool) -> ContextSource {
  ContextSource {
    title:       entity.title.clone(),
    permalink:   entity.permalink.clone(),
    entity_type: entity.entity_type.clone(),
    truncated,
  }
}

/// Fixed-ratio token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
  text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod test {
  use super::estimate_tokens;

  #[test]
  fn four_chars_per_token_rounded_up() {
    assert_eq!(estimate_tokens(""), 0);
    assert_eq!(estimate_tokens("abcd"), 1);
    assert_eq!(estimate_tokens("abcde"), 2);
  }
}
