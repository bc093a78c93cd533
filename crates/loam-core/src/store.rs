//! The `KnowledgeStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `loam-store-sqlite`).
//! The engine (`loam-engine`) and HTTP layer (`loam-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  entity::{Entity, NewEntity},
  observation::{NewObservation, Observation},
  relation::{NewRelation, Relation},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Structured (non-text) filters applied to entity listings and searches.
///
/// `category` and `tag` match through the entity's observations: an entity
/// passes if any of its observations carries the category / tag.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
  pub entity_type: Option<String>,
  pub category:    Option<String>,
  pub tag:         Option<String>,
}

/// Pagination window. `limit` of zero is rejected upstream by the engine.
#[derive(Debug, Clone, Copy)]
pub struct Page {
  pub limit:  usize,
  pub offset: usize,
}

impl Default for Page {
  fn default() -> Self { Self { limit: 10, offset: 0 } }
}

/// Filter for [`KnowledgeStore::find_relations`]. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct RelationFilter {
  pub source_id:     Option<Uuid>,
  pub target_id:     Option<Uuid>,
  pub relation_type: Option<String>,
}

/// The tokenized, derived representation of one entity in the search index.
/// Rebuilt from the entity on demand; never authoritative.
#[derive(Debug, Clone, Default)]
pub struct IndexEntry {
  pub title_tokens:   Vec<String>,
  pub content_tokens: Vec<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Loam persistence backend.
///
/// Entities are the root aggregate; observations, relations, and the search
/// index row cascade with their entity. The search index is a derived cache:
/// `upsert_index_entry` may lag entity mutations until the next rebuild.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait KnowledgeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Entities ──────────────────────────────────────────────────────────

  /// Upsert an entity keyed by permalink.
  ///
  /// If an entity with the permalink already exists and the incoming
  /// content hashes to the stored checksum, the write is skipped and the
  /// stored row returned unchanged. Otherwise the row is updated and
  /// `last_modified` refreshed.
  fn create_entity(
    &self,
    input: NewEntity,
  ) -> impl Future<Output = Result<Entity, Self::Error>> + Send + '_;

  /// Retrieve an entity by id. Returns `None` if not found.
  fn get_entity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Entity>, Self::Error>> + Send + '_;

  /// Retrieve an entity by its permalink slug. Returns `None` if not found.
  fn get_entity_by_permalink<'a>(
    &'a self,
    permalink: &'a str,
  ) -> impl Future<Output = Result<Option<Entity>, Self::Error>> + Send + 'a;

  /// Delete an entity, cascading to its observations, relations (either
  /// end), and search-index row. Returns `false` if the id was unknown.
  fn delete_entity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// List entities matching `filter`, ordered by title ascending, with the
  /// total (pre-pagination) match count.
  fn list_entities<'a>(
    &'a self,
    filter: &'a EntityFilter,
    page: &'a Page,
  ) -> impl Future<Output = Result<(Vec<Entity>, usize), Self::Error>> + Send + 'a;

  // ── Observations & relations ──────────────────────────────────────────

  /// Attach an observation to an entity.
  fn add_observation(
    &self,
    input: NewObservation,
  ) -> impl Future<Output = Result<Observation, Self::Error>> + Send + '_;

  /// All observations attached to an entity, oldest first.
  fn list_observations(
    &self,
    entity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + '_;

  /// Upsert a relation keyed by the `(source, target, type)` triple.
  /// An existing triple has its `to_name`/`context`/`attributes` updated.
  fn create_relation(
    &self,
    input: NewRelation,
  ) -> impl Future<Output = Result<Relation, Self::Error>> + Send + '_;

  /// All relations matching `filter`, in insertion order.
  fn find_relations<'a>(
    &'a self,
    filter: &'a RelationFilter,
  ) -> impl Future<Output = Result<Vec<Relation>, Self::Error>> + Send + 'a;

  // ── Search index ──────────────────────────────────────────────────────

  /// Whether the accelerated (full-text) search structure exists in this
  /// store. Cheap; callers may invoke it per request.
  fn probe_index(
    &self,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Write (or replace) the derived index row for one entity and refresh
  /// its `last_updated` stamp.
  fn upsert_index_entry<'a>(
    &'a self,
    entity_id: Uuid,
    entry: &'a IndexEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Whether an index row exists for `entity_id`.
  fn has_index_entry(
    &self,
    entity_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Execute a full-text match expression against the index, ordered by
  /// backend relevance rank, with a total count under the same predicate.
  fn search_index<'a>(
    &'a self,
    match_expr: &'a str,
    filter: &'a EntityFilter,
    page: &'a Page,
  ) -> impl Future<Output = Result<(Vec<Entity>, usize), Self::Error>> + Send + 'a;

  /// Substring-match `pattern` against titles (or titles and content when
  /// `include_content`). Title matches order ahead of content-only matches,
  /// then most recently modified first.
  fn match_entities<'a>(
    &'a self,
    pattern: &'a str,
    include_content: bool,
    filter: &'a EntityFilter,
    page: &'a Page,
  ) -> impl Future<Output = Result<Vec<Entity>, Self::Error>> + Send + 'a;

  /// Count entities where every word appears in the title or content.
  ///
  /// This is a looser predicate than the single-pattern match used by
  /// [`match_entities`]; the slow search path reports it as the total on
  /// purpose (see DESIGN.md).
  fn count_word_matches<'a>(
    &'a self,
    words: &'a [String],
    filter: &'a EntityFilter,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}
