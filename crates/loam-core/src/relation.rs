//! Relation — a typed, directional edge between two entities.
//!
//! A `(source_id, target_id, relation_type)` triple is unique. Creating a
//! relation that already exists updates the mutable fields (`to_name`,
//! `context`, `attributes`) of the existing row instead of duplicating it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed edge from `source_id` to `target_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
  pub relation_id:   Uuid,
  pub source_id:     Uuid,
  pub target_id:     Uuid,
  pub relation_type: String,
  /// Display label for the target from this relation's point of view.
  pub to_name:       Option<String>,
  pub context:       Option<String>,
  pub attributes:    serde_json::Map<String, serde_json::Value>,
  pub created_at:    DateTime<Utc>,
}

/// Input for creating (or upserting) a relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRelation {
  pub source_id:     Uuid,
  pub target_id:     Uuid,
  pub relation_type: String,
  pub to_name:       Option<String>,
  pub context:       Option<String>,
  #[serde(default)]
  pub attributes:    serde_json::Map<String, serde_json::Value>,
}

impl NewRelation {
  /// A bare edge with the default `"reference"` type.
  pub fn new(source_id: Uuid, target_id: Uuid) -> Self {
    Self {
      source_id,
      target_id,
      relation_type: "reference".to_owned(),
      to_name: None,
      context: None,
      attributes: serde_json::Map::new(),
    }
  }

  pub fn typed(source_id: Uuid, target_id: Uuid, relation_type: impl Into<String>) -> Self {
    Self {
      relation_type: relation_type.into(),
      ..Self::new(source_id, target_id)
    }
  }
}
