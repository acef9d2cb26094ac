//! Durable, transactional storage for entries and projects.
//!
//! One `Store` owns one SQLite connection for the life of the process and is
//! injected into the query, backup and CLI layers. All writes are upserts by
//! primary key; multi-record operations (cascade delete, snapshot import,
//! seeding) run inside a single transaction and either commit fully or not
//! at all.

pub mod error;
pub mod records;
pub mod schema;

pub use error::{Result, StoreError};
pub use records::{default_projects, Entry, Feeling, Mode, Project};

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Secondary indexes available for exact-match entry lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryIndex {
  Mode(Mode),
  Project(String),
  Pinned(bool),
  Starred(bool),
}

/// Connection handle to the record store.
pub struct Store {
  conn: Mutex<Connection>,
}

impl Store {
  /// Open (or create) the store at the given path and provision the schema.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
      })?;
    }

    let conn = Connection::open(path)
      .map_err(|e| StoreError::Unavailable(format!("cannot open {}: {e}", path.display())))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.provision()?;

    info!(path = %path.display(), "record store opened");
    Ok(store)
  }

  /// In-memory store for tests.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| StoreError::Unavailable(format!("cannot open in-memory store: {e}")))?;
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.provision()?;
    Ok(store)
  }

  fn provision(&self) -> Result<()> {
    let conn = self.conn()?;
    conn
      .execute_batch(schema::SCHEMA)
      .map_err(|e| StoreError::Unavailable(format!("cannot provision schema: {e}")))?;
    Ok(())
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {e}")))
  }

  /// Upsert an entry by primary key. Returns the key.
  ///
  /// No foreign-key or enum-domain validation happens here; any well-formed
  /// record is accepted and validation is the caller's responsibility.
  pub fn put_entry(&self, entry: &Entry) -> Result<String> {
    let conn = self.conn()?;
    upsert_entry(&conn, entry)?;
    debug!(id = %entry.id, mode = entry.mode.as_str(), "entry stored");
    Ok(entry.id.clone())
  }

  /// Upsert a project by primary key. Returns the key.
  pub fn put_project(&self, project: &Project) -> Result<String> {
    let conn = self.conn()?;
    upsert_project(&conn, project)?;
    debug!(id = %project.id, "project stored");
    Ok(project.id.clone())
  }

  /// Read a single entry. Absent is `Ok(None)`, not an error.
  pub fn get_entry(&self, id: &str) -> Result<Option<Entry>> {
    let conn = self.conn()?;
    let data: Option<Vec<u8>> = conn
      .query_row("SELECT data FROM entries WHERE id = ?1", params![id], |row| {
        row.get(0)
      })
      .optional()?;
    decode_opt(data)
  }

  /// Read a single project. Absent is `Ok(None)`, not an error.
  pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
    let conn = self.conn()?;
    let data: Option<Vec<u8>> = conn
      .query_row(
        "SELECT data FROM projects WHERE id = ?1",
        params![id],
        |row| row.get(0),
      )
      .optional()?;
    decode_opt(data)
  }

  /// Every entry, newest first.
  ///
  /// Ordering is applied here at the query boundary with an explicit
  /// `ORDER BY`; the engine's native row order is never relied on.
  pub fn all_entries(&self) -> Result<Vec<Entry>> {
    let conn = self.conn()?;
    collect_records(
      &conn,
      "SELECT data FROM entries ORDER BY created_at DESC, id DESC",
    )
  }

  /// Every project, newest first.
  pub fn all_projects(&self) -> Result<Vec<Project>> {
    let conn = self.conn()?;
    collect_records(
      &conn,
      "SELECT data FROM projects ORDER BY created_at DESC, id DESC",
    )
  }

  /// Exact-match secondary-index lookup, newest first.
  pub fn entries_by(&self, index: &EntryIndex) -> Result<Vec<Entry>> {
    let (clause, value): (&str, Box<dyn rusqlite::types::ToSql>) = match index {
      EntryIndex::Mode(mode) => ("mode = ?1", Box::new(mode.as_str())),
      EntryIndex::Project(id) => ("project_id = ?1", Box::new(id.clone())),
      EntryIndex::Pinned(flag) => ("pinned = ?1", Box::new(*flag)),
      EntryIndex::Starred(flag) => ("starred = ?1", Box::new(*flag)),
    };
    let sql =
      format!("SELECT data FROM entries WHERE {clause} ORDER BY created_at DESC, id DESC");

    let conn = self.conn()?;
    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> = vec![value.as_ref()];
    let rows = stmt.query_map(params_ref.as_slice(), |row| row.get::<_, Vec<u8>>(0))?;

    let mut entries = Vec::new();
    for data in rows {
      entries.push(serde_json::from_slice(&data?)?);
    }
    Ok(entries)
  }

  /// Delete a single entry. No-op when absent.
  pub fn delete_entry(&self, id: &str) -> Result<()> {
    let conn = self.conn()?;
    conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
    Ok(())
  }

  /// Delete a single project without touching its entries. No-op when absent.
  pub fn delete_project(&self, id: &str) -> Result<()> {
    let conn = self.conn()?;
    conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
    Ok(())
  }

  /// Delete a project together with every entry referencing it.
  ///
  /// The index-scoped sweep and the project delete run inside one
  /// transaction, so a reader on this connection never observes the project
  /// gone while its entries remain, or the reverse. Any failure rolls the
  /// whole transaction back.
  pub fn delete_project_cascade(&self, project_id: &str) -> Result<()> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;

    let swept = tx.execute(
      "DELETE FROM entries WHERE project_id = ?1",
      params![project_id],
    )?;
    tx.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;

    tx.commit()?;
    debug!(project_id, swept, "project cascade delete committed");
    Ok(())
  }

  /// Upsert a batch of projects, then entries, inside one transaction.
  ///
  /// Projects go first so that any entry referencing a just-written project
  /// id observes a consistent store at commit. Used by snapshot import.
  pub fn put_all(&self, projects: &[Project], entries: &[Entry]) -> Result<()> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;

    for project in projects {
      upsert_project(&tx, project)?;
    }
    for entry in entries {
      upsert_entry(&tx, entry)?;
    }

    tx.commit()?;
    debug!(
      projects = projects.len(),
      entries = entries.len(),
      "batch upsert committed"
    );
    Ok(())
  }

  /// One-time bootstrap: if zero projects exist, insert the five default
  /// folders. Idempotent; triggered explicitly by the caller, never by open.
  pub fn seed_default_projects(&self) -> Result<usize> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;

    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
    if existing > 0 {
      debug!(existing, "seed skipped, projects already present");
      return Ok(0);
    }

    let seeds = default_projects();
    for project in &seeds {
      upsert_project(&tx, project)?;
    }

    tx.commit()?;
    info!(seeded = seeds.len(), "default project folders seeded");
    Ok(seeds.len())
  }
}

fn upsert_entry(conn: &Connection, entry: &Entry) -> Result<()> {
  let data = serde_json::to_vec(entry)?;
  conn.execute(
    "INSERT OR REPLACE INTO entries (id, mode, project_id, created_at, pinned, starred, data)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      entry.id,
      entry.mode.as_str(),
      entry.project_id,
      entry.created_at,
      entry.pinned,
      entry.starred,
      data
    ],
  )?;
  Ok(())
}

fn upsert_project(conn: &Connection, project: &Project) -> Result<()> {
  let data = serde_json::to_vec(project)?;
  conn.execute(
    "INSERT OR REPLACE INTO projects (id, created_at, data) VALUES (?1, ?2, ?3)",
    params![project.id, project.created_at, data],
  )?;
  Ok(())
}

fn collect_records<T: serde::de::DeserializeOwned>(conn: &Connection, sql: &str) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

  let mut records = Vec::new();
  for data in rows {
    records.push(serde_json::from_slice(&data?)?);
  }
  Ok(records)
}

fn decode_opt<T: serde::de::DeserializeOwned>(data: Option<Vec<u8>>) -> Result<Option<T>> {
  match data {
    Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
    None => Ok(None),
  }
}
