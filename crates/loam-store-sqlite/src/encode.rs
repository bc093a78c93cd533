//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Attribute maps and tag
//! lists are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use loam_core::{Entity, Observation, Relation};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::Result;

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_attributes(
  map: &serde_json::Map<String, serde_json::Value>,
) -> Result<String> {
  Ok(serde_json::to_string(map)?)
}

pub fn decode_attributes(
  s: &str,
) -> Result<serde_json::Map<String, serde_json::Value>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Checksum ────────────────────────────────────────────────────────────────

/// Lowercase hex SHA-256 of entity content. Upserts with an unchanged
/// checksum skip the write entirely.
pub fn content_checksum(content: &str) -> String {
  hex::encode(Sha256::digest(content.as_bytes()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `entities` row.
pub struct RawEntity {
  pub entity_id:     String,
  pub title:         String,
  pub permalink:     String,
  pub content:       String,
  pub entity_type:   String,
  pub attributes:    String,
  pub checksum:      String,
  pub created_at:    String,
  pub last_modified: String,
}

impl RawEntity {
  pub fn into_entity(self) -> Result<Entity> {
    Ok(Entity {
      entity_id:     decode_uuid(&self.entity_id)?,
      title:         self.title,
      permalink:     self.permalink,
      content:       self.content,
      entity_type:   self.entity_type,
      attributes:    decode_attributes(&self.attributes)?,
      checksum:      self.checksum,
      created_at:    decode_dt(&self.created_at)?,
      last_modified: decode_dt(&self.last_modified)?,
    })
  }
}

/// Raw strings read directly from an `observations` row.
pub struct RawObservation {
  pub observation_id: String,
  pub entity_id:      String,
  pub content:        String,
  pub category:       String,
  pub context:        Option<String>,
  pub tags:           String,
  pub created_at:     String,
}

impl RawObservation {
  pub fn into_observation(self) -> Result<Observation> {
    Ok(Observation {
      observation_id: decode_uuid(&self.observation_id)?,
      entity_id:      decode_uuid(&self.entity_id)?,
      content:        self.content,
      category:       self.category,
      context:        self.context,
      tags:           decode_tags(&self.tags)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `relations` row.
pub struct RawRelation {
  pub relation_id:   String,
  pub source_id:     String,
  pub target_id:     String,
  pub relation_type: String,
  pub to_name:       Option<String>,
  pub context:       Option<String>,
  pub attributes:    String,
  pub created_at:    String,
}

impl RawRelation {
  pub fn into_relation(self) -> Result<Relation> {
    Ok(Relation {
      relation_id:   decode_uuid(&self.relation_id)?,
      source_id:     decode_uuid(&self.source_id)?,
      target_id:     decode_uuid(&self.target_id)?,
      relation_type: self.relation_type,
      to_name:       self.to_name,
      context:       self.context,
      attributes:    decode_attributes(&self.attributes)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
