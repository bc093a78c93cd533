//! [`GraphTraversal`] — bounded breadth-first discovery of entities
//! connected to a seed entity through relations.
//!
//! The walk is an explicit frontier loop (no recursion): at each depth
//! layer the current frontier's outgoing relations are fetched before its
//! incoming ones, unvisited endpoints are appended to the result in
//! discovery order, and first discovery wins — a node reachable by several
//! paths appears exactly once, with no shortest-path guarantee.

use std::{collections::HashSet, sync::Arc};

use loam_core::{
  Entity, Relation,
  store::{KnowledgeStore, RelationFilter},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Which end of the relation the discovered entity sits on, from the
/// perspective of the frontier node it was reached from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Outgoing,
  Incoming,
}

/// Bounds and filters for a traversal.
#[derive(Debug, Clone)]
pub struct RelatedOptions {
  /// Maximum number of hops; `1` returns direct neighbours only.
  pub depth:         usize,
  /// If set, only relations of this type are followed.
  pub relation_type: Option<String>,
  /// If set, only connected entities of this type are returned (or
  /// expanded further).
  pub entity_type:   Option<String>,
}

impl Default for RelatedOptions {
  fn default() -> Self {
    Self { depth: 1, relation_type: None, entity_type: None }
  }
}

/// One discovered entity, annotated with the relation and direction it was
/// reached through.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedEntity {
  pub entity:    Entity,
  pub relation:  Relation,
  pub direction: Direction,
}

pub struct GraphTraversal<S> {
  store: Arc<S>,
}

impl<S: KnowledgeStore> GraphTraversal<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Discover entities connected to `origin` within `opts.depth` hops.
  ///
  /// The origin itself never appears in the result. Fails with
  /// [`Error::EntityNotFound`] before any traversal if the origin is
  /// unknown.
  pub async fn find_related(
    &self,
    origin: Uuid,
    opts:   &RelatedOptions,
  ) -> Result<Vec<RelatedEntity>> {
    if opts.depth == 0 {
      return Err(Error::InvalidArgument("depth must be at least 1".into()));
    }
    self
      .store
      .get_entity(origin)
      .await
      .map_err(Error::store)?
      .ok_or(Error::EntityNotFound(origin))?;

    let mut visited: HashSet<Uuid> = HashSet::from([origin]);
    let mut results: Vec<RelatedEntity> = Vec::new();
    let mut frontier = vec![origin];
    let mut remaining = opts.depth;

    while remaining > 0 && !frontier.is_empty() {
      let mut next = Vec::new();

      for &current in &frontier {
        for direction in [Direction::Outgoing, Direction::Incoming] {
          let filter = match direction {
            Direction::Outgoing => RelationFilter {
              source_id: Some(current),
              relation_type: opts.relation_type.clone(),
              ..Default::default()
            },
            Direction::Incoming => RelationFilter {
              target_id: Some(current),
              relation_type: opts.relation_type.clone(),
              ..Default::default()
            },
          };
          let relations = self
            .store
            .find_relations(&filter)
            .await
            .map_err(Error::store)?;

          for relation in relations {
            let other = match direction {
              Direction::Outgoing => relation.target_id,
              Direction::Incoming => relation.source_id,
            };
            if visited.contains(&other) {
              continue;
            }
            // A dangling edge (endpoint deleted mid-walk) is skipped, not
            // fatal.
            let Some(entity) =
              self.store.get_entity(other).await.map_err(Error::store)?
            else {
              continue;
            };
            if let Some(et) = &opts.entity_type
              && entity.entity_type != *et
            {
              continue;
            }

            visited.insert(other);
            if remaining > 1 {
              next.push(other);
            }
            results.push(RelatedEntity { entity, relation, direction });
          }
        }
      }

      frontier = next;
      remaining -= 1;
    }

    Ok(results)
  }
}
