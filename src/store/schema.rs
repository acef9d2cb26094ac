//! SQLite schema for the record store.
//!
//! Each row carries the indexed columns used by exact-match lookups plus the
//! full record serialized as a JSON blob. The blob is the source of truth;
//! the columns exist only so secondary indexes can answer queries without
//! decoding every record.

/// Schema for the record tables. Idempotent, run on every open.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    mode TEXT NOT NULL,
    project_id TEXT,
    created_at INTEGER NOT NULL,
    pinned INTEGER NOT NULL DEFAULT 0,
    starred INTEGER NOT NULL DEFAULT 0,
    data BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_mode ON entries(mode);
CREATE INDEX IF NOT EXISTS idx_entries_project ON entries(project_id);
CREATE INDEX IF NOT EXISTS idx_entries_created ON entries(created_at);
CREATE INDEX IF NOT EXISTS idx_entries_pinned ON entries(pinned);
CREATE INDEX IF NOT EXISTS idx_entries_starred ON entries(starred);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    data BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_created ON projects(created_at);
"#;
