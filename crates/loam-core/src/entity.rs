//! Entity — the root aggregate of the knowledge base.
//!
//! An entity is a stored note: a title, a unique permalink slug, raw
//! markdown content, and a free-form attribute map. Observations and
//! relations hang off entities and cascade with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored note.
///
/// `permalink` is unique across all entities; writes are upserts keyed by
/// it. `checksum` is the lowercase hex SHA-256 of `content` — the store
/// skips a write when an upsert carries unchanged content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
  pub entity_id:     Uuid,
  pub title:         String,
  pub permalink:     String,
  pub content:       String,
  pub entity_type:   String,
  pub attributes:    serde_json::Map<String, serde_json::Value>,
  pub checksum:      String,
  pub created_at:    DateTime<Utc>,
  pub last_modified: DateTime<Utc>,
}

/// Input for creating (or upserting) an entity. The store assigns the id,
/// checksum, and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntity {
  pub title:       String,
  pub permalink:   String,
  pub content:     String,
  pub entity_type: String,
  #[serde(default)]
  pub attributes:  serde_json::Map<String, serde_json::Value>,
}

impl NewEntity {
  /// A plain note with the default `"note"` type and no attributes.
  pub fn new(
    title: impl Into<String>,
    permalink: impl Into<String>,
    content: impl Into<String>,
  ) -> Self {
    Self {
      title:       title.into(),
      permalink:   permalink.into(),
      content:     content.into(),
      entity_type: "note".to_owned(),
      attributes:  serde_json::Map::new(),
    }
  }
}
