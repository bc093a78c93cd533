//! [`SqliteStore`] — the SQLite implementation of [`KnowledgeStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use loam_core::{
  entity::{Entity, NewEntity},
  observation::{NewObservation, Observation},
  relation::{NewRelation, Relation},
  store::{EntityFilter, IndexEntry, KnowledgeStore, Page, RelationFilter},
};

use crate::{
  encode::{
    content_checksum, encode_attributes, encode_dt, encode_tags, encode_uuid,
    RawEntity, RawObservation, RawRelation,
  },
  schema::{FTS_SCHEMA, SCHEMA},
  Error, Result,
};

// ─── Column lists & row mappers ──────────────────────────────────────────────

const ENTITY_COLS: &str = "e.entity_id, e.title, e.permalink, e.content, \
   e.entity_type, e.attributes, e.checksum, e.created_at, e.last_modified";

const RELATION_COLS: &str = "relation_id, source_id, target_id, \
   relation_type, to_name, context, attributes, created_at";

const OBSERVATION_COLS: &str = "observation_id, entity_id, content, \
   category, context, tags, created_at";

fn raw_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntity> {
  Ok(RawEntity {
    entity_id:     row.get(0)?,
    title:         row.get(1)?,
    permalink:     row.get(2)?,
    content:       row.get(3)?,
    entity_type:   row.get(4)?,
    attributes:    row.get(5)?,
    checksum:      row.get(6)?,
    created_at:    row.get(7)?,
    last_modified: row.get(8)?,
  })
}

fn raw_observation(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawObservation> {
  Ok(RawObservation {
    observation_id: row.get(0)?,
    entity_id:      row.get(1)?,
    content:        row.get(2)?,
    category:       row.get(3)?,
    context:        row.get(4)?,
    tags:           row.get(5)?,
    created_at:     row.get(6)?,
  })
}

fn raw_relation(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRelation> {
  Ok(RawRelation {
    relation_id:   row.get(0)?,
    source_id:     row.get(1)?,
    target_id:     row.get(2)?,
    relation_type: row.get(3)?,
    to_name:       row.get(4)?,
    context:       row.get(5)?,
    attributes:    row.get(6)?,
    created_at:    row.get(7)?,
  })
}

/// Append WHERE conditions (and their parameter values) for an
/// [`EntityFilter`], numbering placeholders after whatever is already in
/// `params`. Category and tag match through the entity's observations.
fn push_entity_filter(
  filter: &EntityFilter,
  conds:  &mut Vec<String>,
  params: &mut Vec<String>,
) {
  if let Some(t) = &filter.entity_type {
    params.push(t.clone());
    conds.push(format!("e.entity_type = ?{}", params.len()));
  }
  if let Some(c) = &filter.category {
    params.push(c.clone());
    conds.push(format!(
      "EXISTS (SELECT 1 FROM observations o \
         WHERE o.entity_id = e.entity_id AND o.category = ?{})",
      params.len()
    ));
  }
  if let Some(tag) = &filter.tag {
    params.push(tag.clone());
    conds.push(format!(
      "EXISTS (SELECT 1 FROM observations o, json_each(o.tags) jt \
         WHERE o.entity_id = e.entity_id AND jt.value = ?{})",
      params.len()
    ));
  }
}

fn where_clause(conds: &[String]) -> String {
  if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Loam knowledge store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    // FTS5 may be missing from the linked SQLite. The store then runs in
    // substring-fallback mode: probe_index reports false and the search
    // layer never touches the virtual table.
    let fts = self
      .conn
      .call(|conn| {
        conn.execute_batch(FTS_SCHEMA)?;
        Ok(())
      })
      .await;
    if let Err(e) = fts {
      tracing::warn!(error = %e, "full-text index unavailable, falling back to substring search");
    }

    Ok(())
  }

  /// Fetch one entity row by permalink, raw.
  fn select_by_permalink(
    conn:      &rusqlite::Connection,
    permalink: &str,
  ) -> rusqlite::Result<Option<RawEntity>> {
    conn
      .query_row(
        &format!("SELECT {ENTITY_COLS} FROM entities e WHERE e.permalink = ?1"),
        rusqlite::params![permalink],
        raw_entity,
      )
      .optional()
  }
}

// ─── KnowledgeStore impl ─────────────────────────────────────────────────────

impl KnowledgeStore for SqliteStore {
  type Error = Error;

  // ── Entities ──────────────────────────────────────────────────────────────

  async fn create_entity(&self, input: NewEntity) -> Result<Entity> {
    let checksum = content_checksum(&input.content);
    let attrs    = encode_attributes(&input.attributes)?;
    let now_str  = encode_dt(Utc::now());
    let new_id   = encode_uuid(Uuid::new_v4());

    let NewEntity { title, permalink, content, entity_type, .. } = input;

    let raw: RawEntity = self
      .conn
      .call(move |conn| {
        let existing = Self::select_by_permalink(conn, &permalink)?;

        match existing {
          // Unchanged content: skip the write, timestamps untouched.
          Some(raw) if raw.checksum == checksum => Ok(raw),

          Some(_) => {
            conn.execute(
              "UPDATE entities
                 SET title = ?2, content = ?3, entity_type = ?4,
                     attributes = ?5, checksum = ?6, last_modified = ?7
               WHERE permalink = ?1",
              rusqlite::params![
                permalink, title, content, entity_type, attrs, checksum,
                now_str,
              ],
            )?;
            let raw = Self::select_by_permalink(conn, &permalink)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            Ok(raw)
          }

          None => {
            conn.execute(
              "INSERT INTO entities (
                 entity_id, title, permalink, content, entity_type,
                 attributes, checksum, created_at, last_modified
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
              rusqlite::params![
                new_id, title, permalink, content, entity_type, attrs,
                checksum, now_str, now_str,
              ],
            )?;
            let raw = Self::select_by_permalink(conn, &permalink)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            Ok(raw)
          }
        }
      })
      .await?;

    raw.into_entity()
  }

  async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawEntity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ENTITY_COLS} FROM entities e WHERE e.entity_id = ?1"),
              rusqlite::params![id_str],
              raw_entity,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEntity::into_entity).transpose()
  }

  async fn get_entity_by_permalink(&self, permalink: &str) -> Result<Option<Entity>> {
    let permalink = permalink.to_owned();

    let raw: Option<RawEntity> = self
      .conn
      .call(move |conn| Ok(Self::select_by_permalink(conn, &permalink)?))
      .await?;

    raw.map(RawEntity::into_entity).transpose()
  }

  async fn delete_entity(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM entities WHERE entity_id = ?1",
          rusqlite::params![id_str],
        )?;
        if n > 0 {
          // Virtual tables have no foreign keys; the index table may also
          // be absent entirely in fallback mode.
          let _ = conn.execute(
            "DELETE FROM search_index WHERE entity_id = ?1",
            rusqlite::params![id_str],
          );
        }
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  async fn list_entities(
    &self,
    filter: &EntityFilter,
    page:   &Page,
  ) -> Result<(Vec<Entity>, usize)> {
    let filter = filter.clone();
    let page   = *page;

    let (raws, total): (Vec<RawEntity>, usize) = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<String>  = vec![];
        let mut params: Vec<String> = vec![];
        push_entity_filter(&filter, &mut conds, &mut params);
        let where_sql = where_clause(&conds);

        let sql = format!(
          "SELECT {ENTITY_COLS} FROM entities e {where_sql}
           ORDER BY e.title ASC LIMIT {} OFFSET {}",
          page.limit, page.offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), raw_entity)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let count_sql = format!("SELECT COUNT(*) FROM entities e {where_sql}");
        let total: i64 = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(params.iter()),
          |r| r.get(0),
        )?;

        Ok((rows, total as usize))
      })
      .await?;

    let entities = raws
      .into_iter()
      .map(RawEntity::into_entity)
      .collect::<Result<Vec<_>>>()?;
    Ok((entities, total))
  }

  // ── Observations & relations ──────────────────────────────────────────────

  async fn add_observation(&self, input: NewObservation) -> Result<Observation> {
    let observation = Observation {
      observation_id: Uuid::new_v4(),
      entity_id:      input.entity_id,
      content:        input.content,
      category:       input.category,
      context:        input.context,
      tags:           input.tags,
      created_at:     Utc::now(),
    };

    let obs_id_str = encode_uuid(observation.observation_id);
    let ent_id_str = encode_uuid(observation.entity_id);
    let content    = observation.content.clone();
    let category   = observation.category.clone();
    let context    = observation.context.clone();
    let tags_str   = encode_tags(&observation.tags)?;
    let at_str     = encode_dt(observation.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO observations (
             observation_id, entity_id, content, category, context, tags,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            obs_id_str, ent_id_str, content, category, context, tags_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(observation)
  }

  async fn list_observations(&self, entity_id: Uuid) -> Result<Vec<Observation>> {
    let id_str = encode_uuid(entity_id);

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OBSERVATION_COLS} FROM observations
            WHERE entity_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_observation)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }

  async fn create_relation(&self, input: NewRelation) -> Result<Relation> {
    let src_str   = encode_uuid(input.source_id);
    let tgt_str   = encode_uuid(input.target_id);
    let attrs     = encode_attributes(&input.attributes)?;
    let new_id    = encode_uuid(Uuid::new_v4());
    let at_str    = encode_dt(Utc::now());
    let rel_type  = input.relation_type;
    let to_name   = input.to_name;
    let context   = input.context;

    let raw: RawRelation = self
      .conn
      .call(move |conn| {
        let existing: Option<String> = conn
          .query_row(
            "SELECT relation_id FROM relations
              WHERE source_id = ?1 AND target_id = ?2 AND relation_type = ?3",
            rusqlite::params![src_str, tgt_str, rel_type],
            |r| r.get(0),
          )
          .optional()?;

        let relation_id = match existing {
          // The triple already exists: refresh the mutable fields.
          Some(rid) => {
            conn.execute(
              "UPDATE relations SET to_name = ?2, context = ?3, attributes = ?4
                WHERE relation_id = ?1",
              rusqlite::params![rid, to_name, context, attrs],
            )?;
            rid
          }
          None => {
            conn.execute(
              "INSERT INTO relations (
                 relation_id, source_id, target_id, relation_type, to_name,
                 context, attributes, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
              rusqlite::params![
                new_id, src_str, tgt_str, rel_type, to_name, context, attrs,
                at_str,
              ],
            )?;
            new_id
          }
        };

        Ok(conn.query_row(
          &format!("SELECT {RELATION_COLS} FROM relations WHERE relation_id = ?1"),
          rusqlite::params![relation_id],
          raw_relation,
        )?)
      })
      .await?;

    raw.into_relation()
  }

  async fn find_relations(&self, filter: &RelationFilter) -> Result<Vec<Relation>> {
    let filter = filter.clone();

    let raws: Vec<RawRelation> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<String>  = vec![];
        let mut params: Vec<String> = vec![];
        if let Some(id) = filter.source_id {
          params.push(encode_uuid(id));
          conds.push(format!("source_id = ?{}", params.len()));
        }
        if let Some(id) = filter.target_id {
          params.push(encode_uuid(id));
          conds.push(format!("target_id = ?{}", params.len()));
        }
        if let Some(t) = filter.relation_type {
          params.push(t);
          conds.push(format!("relation_type = ?{}", params.len()));
        }
        let where_sql = where_clause(&conds);

        let sql = format!(
          "SELECT {RELATION_COLS} FROM relations {where_sql} ORDER BY rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), raw_relation)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelation::into_relation).collect()
  }

  // ── Search index ──────────────────────────────────────────────────────────

  async fn probe_index(&self) -> Result<bool> {
    let present = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'search_index'",
              [],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(present)
  }

  async fn upsert_index_entry(&self, entity_id: Uuid, entry: &IndexEntry) -> Result<()> {
    let id_str  = encode_uuid(entity_id);
    let title   = entry.title_tokens.join(" ");
    let content = entry.content_tokens.join(" ");
    let now_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM search_index WHERE entity_id = ?1",
          rusqlite::params![id_str],
        )?;
        conn.execute(
          "INSERT INTO search_index (title, content, entity_id, last_updated)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![title, content, id_str, now_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn has_index_entry(&self, entity_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(entity_id);

    let present = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM search_index WHERE entity_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(present)
  }

  async fn search_index(
    &self,
    match_expr: &str,
    filter:     &EntityFilter,
    page:       &Page,
  ) -> Result<(Vec<Entity>, usize)> {
    let match_expr = match_expr.to_owned();
    let filter     = filter.clone();
    let page       = *page;

    let (raws, total): (Vec<RawEntity>, usize) = self
      .conn
      .call(move |conn| {
        let mut params: Vec<String> = vec![match_expr];
        let mut conds: Vec<String>  = vec!["s.search_index MATCH ?1".to_owned()];
        push_entity_filter(&filter, &mut conds, &mut params);
        let where_sql = where_clause(&conds);

        let sql = format!(
          "SELECT {ENTITY_COLS}
             FROM search_index s
             JOIN entities e ON e.entity_id = s.entity_id
           {where_sql}
           ORDER BY s.rank LIMIT {} OFFSET {}",
          page.limit, page.offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), raw_entity)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let count_sql = format!(
          "SELECT COUNT(*)
             FROM search_index s
             JOIN entities e ON e.entity_id = s.entity_id
           {where_sql}"
        );
        let total: i64 = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(params.iter()),
          |r| r.get(0),
        )?;

        Ok((rows, total as usize))
      })
      .await?;

    let entities = raws
      .into_iter()
      .map(RawEntity::into_entity)
      .collect::<Result<Vec<_>>>()?;
    Ok((entities, total))
  }

  async fn match_entities(
    &self,
    text:            &str,
    include_content: bool,
    filter:          &EntityFilter,
    page:            &Page,
  ) -> Result<Vec<Entity>> {
    let pattern = format!("%{text}%");
    let filter  = filter.clone();
    let page    = *page;

    let raws: Vec<RawEntity> = self
      .conn
      .call(move |conn| {
        let mut params: Vec<String> = vec![pattern];
        let mut conds: Vec<String>  = vec![if include_content {
          "(e.title LIKE ?1 OR e.content LIKE ?1)".to_owned()
        } else {
          "e.title LIKE ?1".to_owned()
        }];
        push_entity_filter(&filter, &mut conds, &mut params);
        let where_sql = where_clause(&conds);

        // Title matches rank ahead of content-only matches; recency breaks
        // ties within each group.
        let sql = format!(
          "SELECT {ENTITY_COLS} FROM entities e {where_sql}
           ORDER BY CASE WHEN e.title LIKE ?1 THEN 0 ELSE 1 END,
                    e.last_modified DESC, e.title ASC
           LIMIT {} OFFSET {}",
          page.limit, page.offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), raw_entity)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntity::into_entity).collect()
  }

  async fn count_word_matches(
    &self,
    words:  &[String],
    filter: &EntityFilter,
  ) -> Result<usize> {
    let words  = words.to_vec();
    let filter = filter.clone();

    let total = self
      .conn
      .call(move |conn| {
        let mut params: Vec<String> = vec![];
        let mut conds: Vec<String>  = vec![];
        for word in &words {
          params.push(format!("%{word}%"));
          conds.push(format!(
            "(e.title LIKE ?{n} OR e.content LIKE ?{n})",
            n = params.len()
          ));
        }
        push_entity_filter(&filter, &mut conds, &mut params);
        let where_sql = where_clause(&conds);

        let sql = format!("SELECT COUNT(*) FROM entities e {where_sql}");
        let total: i64 = conn.query_row(
          &sql,
          rusqlite::params_from_iter(params.iter()),
          |r| r.get(0),
        )?;
        Ok(total as usize)
      })
      .await?;

    Ok(total)
  }
}
