//! Request routing for the offline shell.
//!
//! Same-origin assets are answered cache-first, font-provider hosts
//! network-first, and anything else passes through uncached. Total network
//! failure degrades to the cached shell document, the cached root, or a
//! synthesized 503. Routing never fails the caller: the shell has to keep
//! working offline.

use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use url::Url;

use super::generations::{CacheGeneration, StoredAsset};
use super::manifest::ShellManifest;
use crate::config::Config;

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  Cache,
  Network,
  Fallback,
}

/// A request at the interception boundary.
#[derive(Debug, Clone)]
pub struct AssetRequest {
  pub method: String,
  pub url: Url,
}

impl AssetRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: "GET".to_string(),
      url,
    }
  }
}

/// Response handed back to the interception boundary.
#[derive(Debug, Clone)]
pub struct AssetResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
  pub source: ResponseSource,
}

impl AssetResponse {
  fn with_source(asset: StoredAsset, source: ResponseSource) -> Self {
    Self {
      status: asset.status,
      content_type: asset.content_type,
      body: asset.body,
      source,
    }
  }

  /// Synthesized last-resort reply when nothing cached can answer.
  fn offline() -> Self {
    Self {
      status: 503,
      content_type: Some("text/plain".to_string()),
      body: b"offline".to_vec(),
      source: ResponseSource::Fallback,
    }
  }
}

/// Outcome of pre-caching the shell.
#[derive(Debug, Default)]
pub struct InstallReport {
  pub stored: usize,
  pub failed: usize,
}

/// Versioned cache of the application shell with request routing.
pub struct ShellCache {
  manifest: ShellManifest,
  generation: CacheGeneration,
  font_hosts: BTreeSet<String>,
  client: Client,
}

impl ShellCache {
  pub fn new(
    manifest: ShellManifest,
    generation: CacheGeneration,
    font_hosts: BTreeSet<String>,
  ) -> Result<Self> {
    let client = Client::builder()
      .build()
      .map_err(|e| eyre!("cannot build http client: {e}"))?;
    Ok(Self {
      manifest,
      generation,
      font_hosts,
      client,
    })
  }

  /// Assemble the cache from configuration.
  pub fn from_config(config: &Config) -> Result<Self> {
    let shell = &config.shell;
    let manifest = ShellManifest::new(&shell.base_url, &shell.document, &shell.assets)?;
    let generation = CacheGeneration::new(config.cache_root()?, &shell.version);
    Self::new(manifest, generation, shell.font_hosts.clone())
  }

  /// Pre-cache every manifest asset into the current generation.
  ///
  /// Individual fetch failures are logged and tolerated; one blocked font
  /// or icon never aborts installation. Readiness is immediate once this
  /// returns; nothing waits on older generations or open clients.
  pub async fn install(&self) -> InstallReport {
    let fetches = self
      .manifest
      .asset_urls()
      .iter()
      .map(|url| self.fetch_and_store(url));
    let outcomes = futures::future::join_all(fetches).await;

    let mut report = InstallReport::default();
    for (url, outcome) in self.manifest.asset_urls().iter().zip(outcomes) {
      match outcome {
        Ok(()) => report.stored += 1,
        Err(e) => {
          warn!(url = %url, error = %e, "shell asset skipped during install");
          report.failed += 1;
        }
      }
    }

    info!(
      stored = report.stored,
      failed = report.failed,
      generation = self.generation.name(),
      "shell install finished"
    );
    report
  }

  /// Drop every cache generation but the current one. Returns the names of
  /// the generations removed.
  pub fn activate(&self) -> Result<Vec<String>> {
    self.generation.activate()
  }

  /// Route one request through the cache policies.
  pub async fn handle(&self, request: &AssetRequest) -> AssetResponse {
    let intercepted = request.method.eq_ignore_ascii_case("GET")
      && matches!(request.url.scheme(), "http" | "https");
    if !intercepted {
      return self.passthrough(request).await;
    }

    if self.is_font_host(&request.url) {
      return self.network_first(&request.url).await;
    }
    if self.manifest.is_same_origin(&request.url) {
      return self.cache_first(&request.url).await;
    }
    self.passthrough(request).await
  }

  fn is_font_host(&self, url: &Url) -> bool {
    url
      .host_str()
      .map(|host| self.font_hosts.contains(&host.to_lowercase()))
      .unwrap_or(false)
  }

  /// Cache-first: a cached copy wins outright; otherwise the network fills
  /// the cache on `ok` responses; total network failure walks the shell
  /// fallback chain.
  async fn cache_first(&self, url: &Url) -> AssetResponse {
    if let Some(asset) = self.generation.lookup(url) {
      debug!(url = %url, "cache hit");
      return AssetResponse::with_source(asset, ResponseSource::Cache);
    }

    match self.fetch(url).await {
      Ok(asset) => {
        if is_ok(asset.status) {
          self.store_copy(url, &asset);
        }
        AssetResponse::with_source(asset, ResponseSource::Network)
      }
      Err(e) => {
        debug!(url = %url, error = %e, "network unreachable, serving shell fallback");
        self.shell_fallback()
      }
    }
  }

  /// Network-first: used for font-provider hosts. A reachable network
  /// refreshes the stored copy; otherwise the last cached copy answers.
  async fn network_first(&self, url: &Url) -> AssetResponse {
    match self.fetch(url).await {
      Ok(asset) => {
        self.store_copy(url, &asset);
        AssetResponse::with_source(asset, ResponseSource::Network)
      }
      Err(e) => match self.generation.lookup(url) {
        Some(asset) => {
          debug!(url = %url, error = %e, "font provider unreachable, serving cached copy");
          AssetResponse::with_source(asset, ResponseSource::Cache)
        }
        None => AssetResponse::offline(),
      },
    }
  }

  /// Cached shell document, then cached root, then a synthesized 503,
  /// in that order.
  fn shell_fallback(&self) -> AssetResponse {
    if let Some(document) = self.generation.lookup(self.manifest.document_url()) {
      return AssetResponse::with_source(document, ResponseSource::Fallback);
    }
    if let Some(root) = self.generation.lookup(self.manifest.root_url()) {
      return AssetResponse::with_source(root, ResponseSource::Fallback);
    }
    AssetResponse::offline()
  }

  /// Uncached pass-through for requests the policies do not cover.
  async fn passthrough(&self, request: &AssetRequest) -> AssetResponse {
    let method = match reqwest::Method::from_bytes(request.method.as_bytes()) {
      Ok(method) => method,
      Err(_) => return AssetResponse::offline(),
    };

    match self.client.request(method, request.url.clone()).send().await {
      Ok(response) => match read_response(response).await {
        Ok(asset) => AssetResponse::with_source(asset, ResponseSource::Network),
        Err(_) => AssetResponse::offline(),
      },
      Err(e) => {
        debug!(url = %request.url, error = %e, "passthrough request failed");
        AssetResponse::offline()
      }
    }
  }

  async fn fetch(&self, url: &Url) -> Result<StoredAsset> {
    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("fetch {url} failed: {e}"))?;
    read_response(response).await
  }

  async fn fetch_and_store(&self, url: &Url) -> Result<()> {
    let asset = self.fetch(url).await?;
    if !is_ok(asset.status) {
      return Err(eyre!("fetch {url} returned status {}", asset.status));
    }
    self.generation.store(url, &asset)
  }

  fn store_copy(&self, url: &Url, asset: &StoredAsset) {
    if let Err(e) = self.generation.store(url, asset) {
      warn!(url = %url, error = %e, "failed to store response copy");
    }
  }
}

fn is_ok(status: u16) -> bool {
  (200..300).contains(&status)
}

async fn read_response(response: reqwest::Response) -> Result<StoredAsset> {
  let status = response.status().as_u16();
  let content_type = response
    .headers()
    .get(reqwest::header::CONTENT_TYPE)
    .and_then(|value| value.to_str().ok())
    .map(String::from);
  let body = response
    .bytes()
    .await
    .map_err(|e| eyre!("reading response body failed: {e}"))?
    .to_vec();
  Ok(StoredAsset {
    status,
    content_type,
    body,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  // Connections to these addresses are refused immediately, which is exactly
  // the "network unreachable" condition the fallback paths are for.
  const DEAD_ORIGIN: &str = "http://127.0.0.1:9/app/";
  const DEAD_FONT_HOST: &str = "127.1.2.3";

  fn cache_in(dir: &std::path::Path) -> ShellCache {
    let manifest = ShellManifest::new(
      DEAD_ORIGIN,
      "index.html",
      &["index.html".to_string(), "styles/app.css".to_string()],
    )
    .unwrap();
    let generation = CacheGeneration::new(dir, "v1");
    let font_hosts = [DEAD_FONT_HOST.to_string()].into_iter().collect();
    ShellCache::new(manifest, generation, font_hosts).unwrap()
  }

  fn asset(body: &[u8], content_type: &str) -> StoredAsset {
    StoredAsset {
      status: 200,
      content_type: Some(content_type.to_string()),
      body: body.to_vec(),
    }
  }

  #[tokio::test]
  async fn test_cache_first_serves_cached_bytes_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    let url = Url::parse(DEAD_ORIGIN).unwrap().join("styles/app.css").unwrap();
    cache
      .generation
      .store(&url, &asset(b"body { margin: 0 }", "text/css"))
      .unwrap();

    let response = cache.handle(&AssetRequest::get(url)).await;
    assert_eq!(response.source, ResponseSource::Cache);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"body { margin: 0 }");
  }

  #[tokio::test]
  async fn test_cache_first_falls_back_to_cached_shell_document() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    let document = Url::parse(DEAD_ORIGIN).unwrap().join("index.html").unwrap();
    cache
      .generation
      .store(&document, &asset(b"<html>shell</html>", "text/html"))
      .unwrap();

    // Not cached, network refused: the shell document answers instead.
    let missing = Url::parse(DEAD_ORIGIN).unwrap().join("js/app.js").unwrap();
    let response = cache.handle(&AssetRequest::get(missing)).await;
    assert_eq!(response.source, ResponseSource::Fallback);
    assert_eq!(response.body, b"<html>shell</html>");
  }

  #[tokio::test]
  async fn test_cache_first_falls_back_to_cached_root_then_503() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    // Nothing cached at all: synthesized offline response.
    let missing = Url::parse(DEAD_ORIGIN).unwrap().join("js/app.js").unwrap();
    let response = cache.handle(&AssetRequest::get(missing.clone())).await;
    assert_eq!(response.status, 503);
    assert_eq!(response.body, b"offline");
    assert_eq!(response.source, ResponseSource::Fallback);

    // With only the root cached, the root answers before the 503.
    let root = Url::parse(DEAD_ORIGIN).unwrap();
    cache
      .generation
      .store(&root, &asset(b"<html>root</html>", "text/html"))
      .unwrap();
    let response = cache.handle(&AssetRequest::get(missing)).await;
    assert_eq!(response.source, ResponseSource::Fallback);
    assert_eq!(response.body, b"<html>root</html>");
  }

  #[tokio::test]
  async fn test_font_host_serves_cached_copy_when_network_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    let font = Url::parse(&format!("http://{DEAD_FONT_HOST}:9/inter.woff2")).unwrap();
    cache
      .generation
      .store(&font, &asset(b"woff2-bytes", "font/woff2"))
      .unwrap();

    let response = cache.handle(&AssetRequest::get(font)).await;
    assert_eq!(response.source, ResponseSource::Cache);
    assert_eq!(response.body, b"woff2-bytes");
  }

  #[tokio::test]
  async fn test_font_host_with_nothing_cached_degrades_to_503() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    let font = Url::parse(&format!("http://{DEAD_FONT_HOST}:9/inter.woff2")).unwrap();
    let response = cache.handle(&AssetRequest::get(font)).await;
    assert_eq!(response.status, 503);
  }

  #[tokio::test]
  async fn test_non_get_bypasses_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    // Cached under the same URL, but POST must not be answered from cache.
    let url = Url::parse(DEAD_ORIGIN).unwrap().join("styles/app.css").unwrap();
    cache
      .generation
      .store(&url, &asset(b"cached", "text/css"))
      .unwrap();

    let request = AssetRequest {
      method: "POST".to_string(),
      url,
    };
    let response = cache.handle(&request).await;
    assert_ne!(response.source, ResponseSource::Cache);
    assert_eq!(response.status, 503);
  }

  #[tokio::test]
  async fn test_cross_origin_non_font_is_passed_through_uncached() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    let elsewhere = Url::parse("http://127.4.5.6:9/api/data").unwrap();
    let response = cache.handle(&AssetRequest::get(elsewhere.clone())).await;
    assert_eq!(response.status, 503);
    assert!(cache.generation.lookup(&elsewhere).is_none());
  }

  #[tokio::test]
  async fn test_install_tolerates_every_asset_failing() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    let report = cache.install().await;
    assert_eq!(report.stored, 0);
    assert_eq!(report.failed, 2);
  }
}
