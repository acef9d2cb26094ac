//! Generation-named asset storage on the filesystem.
//!
//! One directory per cache generation under the cache root, named
//! `shell-<version>`. Assets are keyed by a SHA-256 of their request URL and
//! stored as a body file plus a JSON metadata sidecar. Eviction is
//! generational only: activation deletes every sibling generation and
//! nothing expires per asset.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info};
use url::Url;

const GENERATION_PREFIX: &str = "shell-";

/// A cached response body plus the metadata stored alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssetMeta {
  url: String,
  status: u16,
  content_type: Option<String>,
  cached_at: i64,
}

/// Handle to one named cache generation.
#[derive(Debug, Clone)]
pub struct CacheGeneration {
  root: PathBuf,
  name: String,
}

impl CacheGeneration {
  /// The generation named for `version` under the cache root.
  pub fn new(cache_root: impl Into<PathBuf>, version: &str) -> Self {
    Self {
      root: cache_root.into(),
      name: format!("{GENERATION_PREFIX}{version}"),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  fn dir(&self) -> PathBuf {
    self.root.join(&self.name)
  }

  /// Stable fixed-length storage key for a request URL.
  fn asset_key(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Store an asset keyed by its request URL, overwriting any previous copy.
  pub fn store(&self, url: &Url, asset: &StoredAsset) -> Result<()> {
    let dir = self.dir();
    std::fs::create_dir_all(&dir)
      .map_err(|e| eyre!("cannot create cache generation {}: {e}", dir.display()))?;

    let key = Self::asset_key(url);
    let meta = AssetMeta {
      url: url.as_str().to_string(),
      status: asset.status,
      content_type: asset.content_type.clone(),
      cached_at: chrono::Utc::now().timestamp_millis(),
    };
    let meta_json = serde_json::to_vec(&meta)?;

    std::fs::write(dir.join(format!("{key}.body")), &asset.body)
      .map_err(|e| eyre!("cannot write cached body for {url}: {e}"))?;
    std::fs::write(dir.join(format!("{key}.meta")), meta_json)
      .map_err(|e| eyre!("cannot write cache metadata for {url}: {e}"))?;

    debug!(url = %url, generation = %self.name, "asset cached");
    Ok(())
  }

  /// Look up a cached asset. Any read or decode failure is treated as a
  /// cache miss rather than surfaced.
  pub fn lookup(&self, url: &Url) -> Option<StoredAsset> {
    let dir = self.dir();
    let key = Self::asset_key(url);

    let body = std::fs::read(dir.join(format!("{key}.body"))).ok()?;
    let meta_bytes = std::fs::read(dir.join(format!("{key}.meta"))).ok()?;
    let meta: AssetMeta = serde_json::from_slice(&meta_bytes).ok()?;

    Some(StoredAsset {
      status: meta.status,
      content_type: meta.content_type,
      body,
    })
  }

  /// Delete every generation directory except this one and return the names
  /// removed. The current generation's contents are untouched. This is the
  /// sole eviction mechanism.
  pub fn activate(&self) -> Result<Vec<String>> {
    std::fs::create_dir_all(self.dir())
      .map_err(|e| eyre!("cannot create cache generation {}: {e}", self.dir().display()))?;

    let mut removed = Vec::new();
    let entries = std::fs::read_dir(&self.root)
      .map_err(|e| eyre!("cannot read cache root {}: {e}", self.root.display()))?;

    for dirent in entries {
      let dirent = dirent.map_err(|e| eyre!("cannot read cache root entry: {e}"))?;
      let path = dirent.path();
      if !path.is_dir() {
        continue;
      }
      let name = dirent.file_name().to_string_lossy().to_string();
      if name == self.name {
        continue;
      }
      std::fs::remove_dir_all(&path)
        .map_err(|e| eyre!("cannot remove stale generation {name}: {e}"))?;
      info!(name = %name, "stale cache generation removed");
      removed.push(name);
    }

    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn asset(body: &[u8]) -> StoredAsset {
    StoredAsset {
      status: 200,
      content_type: Some("text/css".to_string()),
      body: body.to_vec(),
    }
  }

  #[test]
  fn test_store_then_lookup_returns_identical_asset() {
    let dir = tempfile::tempdir().unwrap();
    let generation = CacheGeneration::new(dir.path(), "v1");
    let url = Url::parse("https://host.example/app/styles/app.css").unwrap();

    let stored = asset(b"body { margin: 0 }");
    generation.store(&url, &stored).unwrap();

    assert_eq!(generation.lookup(&url).unwrap(), stored);
  }

  #[test]
  fn test_lookup_miss_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let generation = CacheGeneration::new(dir.path(), "v1");
    let url = Url::parse("https://host.example/nope.js").unwrap();
    assert!(generation.lookup(&url).is_none());
  }

  #[test]
  fn test_activate_removes_every_other_generation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("shell-v1")).unwrap();
    std::fs::create_dir_all(dir.path().join("shell-v2")).unwrap();
    std::fs::create_dir_all(dir.path().join("leftover")).unwrap();

    let current = CacheGeneration::new(dir.path(), "v3");
    let url = Url::parse("https://host.example/index.html").unwrap();
    current.store(&url, &asset(b"<html></html>")).unwrap();

    let mut removed = current.activate().unwrap();
    removed.sort();
    assert_eq!(removed, vec!["leftover", "shell-v1", "shell-v2"]);

    // The current generation and its contents survive.
    assert!(dir.path().join("shell-v3").is_dir());
    assert!(generation_still_serves(&current, &url));
    assert!(!dir.path().join("shell-v1").exists());
  }

  #[test]
  fn test_activate_on_fresh_root_removes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let generation = CacheGeneration::new(dir.path().join("cache"), "v1");
    assert!(generation.activate().unwrap().is_empty());
    assert!(dir.path().join("cache").join("shell-v1").is_dir());
  }

  fn generation_still_serves(generation: &CacheGeneration, url: &Url) -> bool {
    generation
      .lookup(url)
      .map(|a| a.body == b"<html></html>")
      .unwrap_or(false)
  }
}
