//! Shell asset manifest resolved against the deployment base.

use color_eyre::{eyre::eyre, Result};
use url::Url;

/// Relative paths that make up the offline application shell.
pub const DEFAULT_SHELL_ASSETS: &[&str] = &[
  "index.html",
  "styles/app.css",
  "js/app.js",
  "js/store.js",
  "js/editor.js",
  "icons/icon-192.png",
  "icons/icon-512.png",
  "manifest.webmanifest",
];

/// The set of shell assets as absolute URLs under one deployment base.
///
/// Asset paths are resolved at construction, so the same manifest works
/// whether the application is served from a domain root or a sub-path.
#[derive(Debug, Clone)]
pub struct ShellManifest {
  base: Url,
  document: Url,
  assets: Vec<Url>,
}

impl ShellManifest {
  /// Build a manifest for the given base URL, shell document and asset paths.
  pub fn new(base_url: &str, document: &str, assets: &[String]) -> Result<Self> {
    let mut base =
      Url::parse(base_url).map_err(|e| eyre!("invalid base url {base_url}: {e}"))?;

    // A trailing slash makes Url::join treat the base as a directory, so
    // relative assets resolve under the sub-path instead of replacing it.
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let document = base
      .join(document)
      .map_err(|e| eyre!("cannot resolve shell document {document}: {e}"))?;

    let assets = assets
      .iter()
      .map(|asset| {
        base
          .join(asset)
          .map_err(|e| eyre!("cannot resolve shell asset {asset}: {e}"))
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      base,
      document,
      assets,
    })
  }

  /// The deployment base (always directory-shaped).
  pub fn root_url(&self) -> &Url {
    &self.base
  }

  /// The shell document used as the primary offline fallback.
  pub fn document_url(&self) -> &Url {
    &self.document
  }

  /// Every shell asset as an absolute URL.
  pub fn asset_urls(&self) -> &[Url] {
    &self.assets
  }

  /// Whether a request URL shares scheme, host and port with the base.
  pub fn is_same_origin(&self, url: &Url) -> bool {
    url.origin() == self.base.origin()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assets(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
  }

  #[test]
  fn test_assets_resolve_under_domain_root() {
    let manifest =
      ShellManifest::new("https://journal.example/", "index.html", &assets(&["styles/app.css"]))
        .unwrap();
    assert_eq!(
      manifest.asset_urls()[0].as_str(),
      "https://journal.example/styles/app.css"
    );
    assert_eq!(
      manifest.document_url().as_str(),
      "https://journal.example/index.html"
    );
  }

  #[test]
  fn test_assets_resolve_under_sub_path_without_trailing_slash() {
    let manifest = ShellManifest::new(
      "https://host.example/journal",
      "index.html",
      &assets(&["js/app.js"]),
    )
    .unwrap();
    assert_eq!(
      manifest.asset_urls()[0].as_str(),
      "https://host.example/journal/js/app.js"
    );
    assert_eq!(
      manifest.root_url().as_str(),
      "https://host.example/journal/"
    );
  }

  #[test]
  fn test_same_origin_compares_scheme_host_and_port() {
    let manifest =
      ShellManifest::new("https://host.example/app/", "index.html", &assets(&[])).unwrap();

    let same = Url::parse("https://host.example/other/path.css").unwrap();
    assert!(manifest.is_same_origin(&same));

    let other_port = Url::parse("https://host.example:8443/app/x.css").unwrap();
    assert!(!manifest.is_same_origin(&other_port));

    let other_host = Url::parse("https://fonts.example/app.css").unwrap();
    assert!(!manifest.is_same_origin(&other_host));
  }

  #[test]
  fn test_invalid_base_is_rejected() {
    assert!(ShellManifest::new("not a url", "index.html", &assets(&[])).is_err());
  }
}
