//! SQL schema for the Loam SQLite store.
//!
//! Executed once at connection startup. The FTS5 virtual table is created
//! separately (see [`FTS_SCHEMA`]) so its absence degrades the store to
//! substring matching instead of failing startup.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS entities (
    entity_id     TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    permalink     TEXT NOT NULL UNIQUE,
    content       TEXT NOT NULL,
    entity_type   TEXT NOT NULL DEFAULT 'note',
    attributes    TEXT NOT NULL DEFAULT '{}',  -- JSON object
    checksum      TEXT NOT NULL,               -- lowercase hex SHA-256 of content
    created_at    TEXT NOT NULL,               -- ISO 8601 UTC
    last_modified TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS observations (
    observation_id TEXT PRIMARY KEY,
    entity_id      TEXT NOT NULL REFERENCES entities(entity_id) ON DELETE CASCADE,
    content        TEXT NOT NULL,
    category       TEXT NOT NULL DEFAULT 'note',
    context        TEXT,
    tags           TEXT NOT NULL DEFAULT '[]', -- JSON array, order preserved
    created_at     TEXT NOT NULL
);

-- One row per (source, target, type) triple; re-creation updates in place.
CREATE TABLE IF NOT EXISTS relations (
    relation_id   TEXT PRIMARY KEY,
    source_id     TEXT NOT NULL REFERENCES entities(entity_id) ON DELETE CASCADE,
    target_id     TEXT NOT NULL REFERENCES entities(entity_id) ON DELETE CASCADE,
    relation_type TEXT NOT NULL DEFAULT 'reference',
    to_name       TEXT,
    context       TEXT,
    attributes    TEXT NOT NULL DEFAULT '{}',
    created_at    TEXT NOT NULL,
    UNIQUE (source_id, target_id, relation_type)
);

CREATE INDEX IF NOT EXISTS observations_entity_idx ON observations(entity_id);
CREATE INDEX IF NOT EXISTS relations_source_idx    ON relations(source_id);
CREATE INDEX IF NOT EXISTS relations_target_idx    ON relations(target_id);

PRAGMA user_version = 1;
";

/// The accelerated search structure. Virtual tables have no foreign keys,
/// so `delete_entity` clears the matching row explicitly.
pub const FTS_SCHEMA: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(
    title,
    content,
    entity_id    UNINDEXED,
    last_updated UNINDEXED
);
";
