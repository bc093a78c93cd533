//! Engine tests against an in-memory `SqliteStore`.

use std::sync::Arc;

use loam_core::{NewEntity, NewRelation, store::KnowledgeStore};
use loam_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  ContextRequest, Engine, Error, RebuildReport, RelatedOptions, SearchRequest,
  context::estimate_tokens,
  related::Direction,
};

async fn engine() -> Engine<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  Engine::new(Arc::new(store))
}

fn note(title: &str, permalink: &str, content: &str) -> NewEntity {
  NewEntity::new(title, permalink, content)
}

async fn add(engine: &Engine<SqliteStore>, input: NewEntity) -> loam_core::Entity {
  engine.store().create_entity(input).await.unwrap()
}

async fn link(engine: &Engine<SqliteStore>, source: Uuid, target: Uuid, t: &str) {
  engine
    .store()
    .create_relation(NewRelation::typed(source, target, t))
    .await
    .unwrap();
}

// ─── Index lifecycle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn has_fast_index_with_fts_backend() {
  let e = engine().await;
  assert!(e.has_fast_index().await.unwrap());
}

#[tokio::test]
async fn update_index_unknown_entity_errors() {
  let e = engine().await;
  let err = e.update_index(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::EntityNotFound(_)));
}

#[tokio::test]
async fn rebuild_is_idempotent() {
  let e = engine().await;
  add(&e, note("A", "a", "alpha")).await;
  add(&e, note("B", "b", "beta")).await;
  add(&e, note("C", "c", "gamma")).await;

  let first = e.rebuild_index(false).await.unwrap();
  assert_eq!(first, RebuildReport { created: 3, updated: 0, skipped: 0, total: 3 });

  // Second run with no intervening mutation: everything is skipped.
  let second = e.rebuild_index(false).await.unwrap();
  assert_eq!(second, RebuildReport { created: 0, updated: 0, skipped: 3, total: 3 });
}

#[tokio::test]
async fn rebuild_force_reindexes_everything() {
  let e = engine().await;
  add(&e, note("A", "a", "alpha")).await;
  add(&e, note("B", "b", "beta")).await;

  e.rebuild_index(false).await.unwrap();
  let forced = e.rebuild_index(true).await.unwrap();
  assert_eq!(forced, RebuildReport { created: 0, updated: 2, skipped: 0, total: 2 });
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn zebra_scenario() {
  let e = engine().await;
  let zebra = add(&e, note("Zebra Crossing", "zebra-crossing", "zebra xylophone")).await;

  e.update_index(zebra.entity_id).await.unwrap();

  let found = e
    .search(&SearchRequest { query: "zebra".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.count, 1);
  assert_eq!(found.results[0].permalink, "zebra-crossing");

  let report = e.rebuild_index(false).await.unwrap();
  assert_eq!(report, RebuildReport { created: 0, updated: 0, skipped: 1, total: 1 });
}

#[tokio::test]
async fn fast_path_prefix_matches() {
  let e = engine().await;
  let z = add(&e, note("Zebra", "z", "stripes")).await;
  e.update_index(z.entity_id).await.unwrap();

  let found = e
    .search(&SearchRequest { query: "zeb".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.count, 1);
}

#[tokio::test]
async fn fast_path_multi_word_matches_any_word() {
  let e = engine().await;
  let a = add(&e, note("Alpha Note", "a", "first")).await;
  let b = add(&e, note("Beta Note", "b", "second")).await;
  e.update_index(a.entity_id).await.unwrap();
  e.update_index(b.entity_id).await.unwrap();

  let found = e
    .search(&SearchRequest { query: "alpha beta".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.count, 2);
}

#[tokio::test]
async fn blank_query_lists_by_filter() {
  let e = engine().await;
  add(&e, note("Banana", "banana", "")).await;
  add(&e, note("Apple", "apple", "")).await;

  let found = e
    .search(&SearchRequest { query: "   ".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.count, 2);
  let titles: Vec<_> = found.results.iter().map(|e| e.title.as_str()).collect();
  assert_eq!(titles, ["Apple", "Banana"]);
}

#[tokio::test]
async fn semantic_request_degrades_to_slow_path() {
  let e = engine().await;
  // Never indexed: only the substring fallback can find it.
  add(&e, note("Quokka Habits", "quokka", "marsupial")).await;

  let found = e
    .search(&SearchRequest {
      query: "Quokka".into(),
      semantic: true,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(found.results.len(), 1);
  assert_eq!(found.results[0].permalink, "quokka");
}

#[tokio::test]
async fn slow_path_finds_unindexed_title_token() {
  let e = engine().await;
  add(&e, note("Xylophone Lessons", "xylo", "music")).await;

  // semantic=true forces the fallback even though the index table exists.
  let found = e
    .search(&SearchRequest {
      query: "Xylophone".into(),
      semantic: true,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(found.results.len(), 1);
  assert_eq!(found.count, 1);
}

#[tokio::test]
async fn slow_path_count_is_looser_than_page_predicate() {
  let e = engine().await;
  add(&e, note("Alpha Beta", "ab", "")).await;

  // "beta alpha" as a single substring matches nothing, but both words
  // appear, so the word-wise count still reports the entity.
  let found = e
    .search(&SearchRequest {
      query: "beta alpha".into(),
      semantic: true,
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(found.results.is_empty());
  assert_eq!(found.count, 1);
}

#[tokio::test]
async fn zero_limit_is_rejected() {
  let e = engine().await;
  let err = e
    .search(&SearchRequest {
      query: "anything".into(),
      limit: Some(0),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidArgument(_)));
}

// ─── Traversal ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn chain_depth_one_and_two() {
  let e = engine().await;
  let a = add(&e, note("A", "a", "")).await;
  let b = add(&e, note("B", "b", "")).await;
  let c = add(&e, note("C", "c", "")).await;
  link(&e, a.entity_id, b.entity_id, "ref").await;
  link(&e, b.entity_id, c.entity_id, "ref").await;

  let one = e
    .find_related(a.entity_id, &RelatedOptions::default())
    .await
    .unwrap();
  assert_eq!(one.len(), 1);
  assert_eq!(one[0].entity.permalink, "b");
  assert_eq!(one[0].direction, Direction::Outgoing);

  let two = e
    .find_related(a.entity_id, &RelatedOptions { depth: 2, ..Default::default() })
    .await
    .unwrap();
  let permalinks: Vec<_> = two.iter().map(|r| r.entity.permalink.as_str()).collect();
  assert_eq!(permalinks, ["b", "c"]);
}

#[tokio::test]
async fn deeper_results_contain_shallower_ones() {
  let e = engine().await;
  let a = add(&e, note("A", "a", "")).await;
  let b = add(&e, note("B", "b", "")).await;
  let c = add(&e, note("C", "c", "")).await;
  link(&e, a.entity_id, b.entity_id, "ref").await;
  link(&e, b.entity_id, c.entity_id, "ref").await;

  let one = e
    .find_related(a.entity_id, &RelatedOptions::default())
    .await
    .unwrap();
  let two = e
    .find_related(a.entity_id, &RelatedOptions { depth: 2, ..Default::default() })
    .await
    .unwrap();

  for shallow in &one {
    assert!(two.iter().any(|r| r.entity.entity_id == shallow.entity.entity_id));
  }
  assert!(one.iter().all(|r| r.entity.entity_id != a.entity_id));
  assert!(two.iter().all(|r| r.entity.entity_id != a.entity_id));
}

#[tokio::test]
async fn two_cycle_is_deduplicated() {
  let e = engine().await;
  let a = add(&e, note("A", "a", "")).await;
  let b = add(&e, note("B", "b", "")).await;
  link(&e, a.entity_id, b.entity_id, "ref").await;
  link(&e, b.entity_id, a.entity_id, "ref").await;

  let related = e
    .find_related(a.entity_id, &RelatedOptions { depth: 3, ..Default::default() })
    .await
    .unwrap();
  let hits = related
    .iter()
    .filter(|r| r.entity.entity_id == b.entity_id)
    .count();
  assert_eq!(hits, 1);
  assert_eq!(related.len(), 1);
}

#[tokio::test]
async fn incoming_relations_are_walked() {
  let e = engine().await;
  let a = add(&e, note("A", "a", "")).await;
  let b = add(&e, note("B", "b", "")).await;
  link(&e, a.entity_id, b.entity_id, "ref").await;

  let related = e
    .find_related(b.entity_id, &RelatedOptions::default())
    .await
    .unwrap();
  assert_eq!(related.len(), 1);
  assert_eq!(related[0].entity.entity_id, a.entity_id);
  assert_eq!(related[0].direction, Direction::Incoming);
}

#[tokio::test]
async fn relation_type_filter_limits_edges() {
  let e = engine().await;
  let a = add(&e, note("A", "a", "")).await;
  let b = add(&e, note("B", "b", "")).await;
  let c = add(&e, note("C", "c", "")).await;
  link(&e, a.entity_id, b.entity_id, "ref").await;
  link(&e, a.entity_id, c.entity_id, "link").await;

  let related = e
    .find_related(a.entity_id, &RelatedOptions {
      relation_type: Some("ref".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(related.len(), 1);
  assert_eq!(related[0].entity.entity_id, b.entity_id);
}

#[tokio::test]
async fn entity_type_filter_limits_targets() {
  let e = engine().await;
  let a = add(&e, note("A", "a", "")).await;
  let b = add(&e, note("B", "b", "")).await;
  let mut person = note("P", "p", "");
  person.entity_type = "person".into();
  let p = add(&e, person).await;
  link(&e, a.entity_id, b.entity_id, "ref").await;
  link(&e, a.entity_id, p.entity_id, "ref").await;

  let related = e
    .find_related(a.entity_id, &RelatedOptions {
      entity_type: Some("note".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(related.len(), 1);
  assert_eq!(related[0].entity.entity_id, b.entity_id);
}

#[tokio::test]
async fn unknown_origin_errors_before_traversal() {
  let e = engine().await;
  let err = e
    .find_related(Uuid::new_v4(), &RelatedOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EntityNotFound(_)));
}

#[tokio::test]
async fn zero_depth_is_rejected() {
  let e = engine().await;
  let a = add(&e, note("A", "a", "")).await;
  let err = e
    .find_related(a.entity_id, &RelatedOptions { depth: 0, ..Default::default() })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidArgument(_)));
}

// ─── Context assembly ────────────────────────────────────────────────────────

#[tokio::test]
async fn no_candidates_yields_sentinel() {
  let e = engine().await;
  add(&e, note("Unrelated", "u", "nothing to see")).await;

  let result = e
    .build_context(&ContextRequest::new("zebra"))
    .await
    .unwrap();
  assert_eq!(result.context, "No relevant information found.");
  assert_eq!(result.source_count, 0);
  assert!(result.sources.is_empty());
}

#[tokio::test]
async fn blank_context_query_is_rejected() {
  let e = engine().await;
  let err = e.build_context(&ContextRequest::new("  ")).await.unwrap_err();
  assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn small_entities_pack_in_full() {
  let e = engine().await;
  add(&e, note("Zebra One", "z1", "first zebra fact")).await;
  add(&e, note("Zebra Two", "z2", "second zebra fact")).await;

  let result = e.build_context(&ContextRequest::new("zebra")).await.unwrap();

  assert_eq!(result.source_count, 2);
  assert!(result.sources.iter().all(|s| !s.truncated));
  assert!(result.context.contains("## Zebra One"));
  assert!(result.context.contains("## Zebra Two"));
  assert!(result.context.contains("\n\n---\n\n"));
}

#[tokio::test]
async fn first_oversized_entity_is_truncated_to_budget() {
  let e = engine().await;
  let long = "zebra ".repeat(500);
  add(&e, note("Zebra Saga", "saga", &long)).await;

  let request = ContextRequest {
    max_tokens: 50,
    ..ContextRequest::new("zebra")
  };
  let result = e.build_context(&request).await.unwrap();

  assert_eq!(result.source_count, 1);
  assert!(result.sources[0].truncated);
  // The lone truncated fragment fills the budget exactly.
  assert_eq!(estimate_tokens(&result.context), 50);
}

#[tokio::test]
async fn later_overflowing_entity_is_dropped_not_truncated() {
  let e = engine().await;
  let long = "zebra ".repeat(2000);
  // Older huge entity, then a newer small one that ranks first on recency.
  add(&e, note("Zebra Epic", "epic", &long)).await;
  add(&e, note("Zebra Note", "small", "short zebra note")).await;

  let request = ContextRequest {
    max_tokens: 100,
    ..ContextRequest::new("zebra")
  };
  let result = e.build_context(&request).await.unwrap();

  assert_eq!(result.source_count, 1);
  assert_eq!(result.sources[0].permalink, "small");
  assert!(!result.sources[0].truncated);
  assert!(estimate_tokens(&result.context) <= 100);
}

#[tokio::test]
async fn budget_is_never_exceeded_by_full_sources() {
  let e = engine().await;
  for i in 0..5 {
    add(&e, note(
      &format!("Zebra {i}"),
      &format!("zebra-{i}"),
      &"stripe ".repeat(40),
    ))
    .await;
  }

  let request = ContextRequest {
    max_tokens: 200,
    ..ContextRequest::new("zebra")
  };
  let result = e.build_context(&request).await.unwrap();

  assert!(result.source_count >= 1);
  assert!(result.sources.iter().all(|s| !s.truncated));
  assert!(estimate_tokens(&result.context) <= 200);
}
