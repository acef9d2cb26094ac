//! Whole-store snapshot export and last-write-wins merge import.
//!
//! The snapshot shape `{ version, exportedAt, entries, projects }` with
//! camelCase fields is the portable compatibility contract; anything that
//! produces or consumes it must keep that exact shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::store::records::now_ms;
use crate::store::{Entry, Project, Result, Store, StoreError};

/// Snapshot format version written by [`export`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Portable backup of the whole store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  pub version: u32,
  /// Millisecond epoch at export time.
  pub exported_at: i64,
  pub entries: Vec<Entry>,
  pub projects: Vec<Project>,
}

impl Snapshot {
  /// Decode a snapshot from raw JSON.
  ///
  /// Fails with `InvalidFormat` unless `entries` and `projects` are present
  /// and array-typed, or when any record in them does not decode.
  pub fn from_json(value: Value) -> Result<Self> {
    for field in ["entries", "projects"] {
      match value.get(field) {
        Some(Value::Array(_)) => {}
        _ => {
          return Err(StoreError::InvalidFormat(format!(
            "`{field}` must be an array"
          )))
        }
      }
    }
    serde_json::from_value(value).map_err(|e| StoreError::InvalidFormat(e.to_string()))
  }
}

/// Snapshot every entry and project. Succeeds whenever the store is readable.
pub fn export(store: &Store) -> Result<Snapshot> {
  let snapshot = Snapshot {
    version: SNAPSHOT_VERSION,
    exported_at: now_ms(),
    entries: store.all_entries()?,
    projects: store.all_projects()?,
  };
  info!(
    entries = snapshot.entries.len(),
    projects = snapshot.projects.len(),
    "store exported"
  );
  Ok(snapshot)
}

/// Upsert every project, then every entry, inside one transaction.
///
/// Projects are written first so an entry referencing a just-imported
/// project id observes a consistent store at commit. Records already present
/// are overwritten whole (last-write-wins); records present only in the live
/// store are left untouched; import never deletes.
pub fn import(store: &Store, snapshot: &Snapshot) -> Result<()> {
  store.put_all(&snapshot.projects, &snapshot.entries)?;
  info!(
    entries = snapshot.entries.len(),
    projects = snapshot.projects.len(),
    "snapshot imported"
  );
  Ok(())
}
