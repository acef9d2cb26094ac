//! Read-side conveniences over the record store: indexed listings and
//! full-scan text search with facet filters.

use crate::store::{Entry, EntryIndex, Mode, Result, Store};

/// Facet filters for [`search`]. Every supplied facet must match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFilters {
  pub mode: Option<Mode>,
  /// When true, only pinned entries match.
  pub pinned: bool,
  /// When true, only starred entries match.
  pub starred: bool,
}

/// Entries of the given mode, newest first.
pub fn list_by_mode(store: &Store, mode: Mode) -> Result<Vec<Entry>> {
  store.entries_by(&EntryIndex::Mode(mode))
}

/// Entries belonging to the given project, newest first.
pub fn list_by_project(store: &Store, project_id: &str) -> Result<Vec<Entry>> {
  store.entries_by(&EntryIndex::Project(project_id.to_string()))
}

/// Text search across body, title and tags, combined with facet filters.
///
/// The query is trimmed and lowercased; an entry matches when the query is
/// empty or is a substring of its lowercased body, title, or any tag. Facets
/// AND-compose on top of the text match.
///
/// This is a full scan over every stored entry. Linear cost is fine for a
/// personal journal; a real text index is needed before this sees a large
/// corpus.
pub fn search(store: &Store, query: &str, filters: &SearchFilters) -> Result<Vec<Entry>> {
  let needle = query.trim().to_lowercase();
  let entries = store.all_entries()?;
  Ok(
    entries
      .into_iter()
      .filter(|entry| matches_text(entry, &needle) && matches_facets(entry, filters))
      .collect(),
  )
}

fn matches_text(entry: &Entry, needle: &str) -> bool {
  if needle.is_empty() {
    return true;
  }
  entry.body.to_lowercase().contains(needle)
    || entry.title.to_lowercase().contains(needle)
    || entry.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

fn matches_facets(entry: &Entry, filters: &SearchFilters) -> bool {
  let mode_ok = filters.mode.map_or(true, |mode| entry.mode == mode);
  let pinned_ok = !filters.pinned || entry.pinned;
  let starred_ok = !filters.starred || entry.starred;
  mode_ok && pinned_ok && starred_ok
}
