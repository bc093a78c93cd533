//! Observation — a categorised annotation attached to one entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An annotation owned by an entity (cascade-deleted with it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
  pub observation_id: Uuid,
  pub entity_id:      Uuid,
  pub content:        String,
  pub category:       String,
  pub context:        Option<String>,
  /// Ordered; order is preserved through storage.
  pub tags:           Vec<String>,
  pub created_at:     DateTime<Utc>,
}

/// Input for attaching an observation to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObservation {
  pub entity_id: Uuid,
  pub content:   String,
  pub category:  String,
  pub context:   Option<String>,
  #[serde(default)]
  pub tags:      Vec<String>,
}

impl NewObservation {
  /// An observation with the default `"note"` category and no tags.
  pub fn new(entity_id: Uuid, content: impl Into<String>) -> Self {
    Self {
      entity_id,
      content: content.into(),
      category: "note".to_owned(),
      context: None,
      tags: Vec::new(),
    }
  }
}
