use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::shell::DEFAULT_SHELL_ASSETS;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory holding the journal database (platform data dir when unset)
  pub data_dir: Option<PathBuf>,
  /// Directory holding shell cache generations (platform cache dir when unset)
  pub cache_dir: Option<PathBuf>,
  pub shell: ShellConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
  /// Deployment base the shell is served from; sub-paths work.
  pub base_url: String,
  /// Cache generation tag. Bumping it replaces the whole generation on the
  /// next install/activate cycle.
  pub version: String,
  /// Shell document served as the offline fallback.
  pub document: String,
  /// Asset paths resolved relative to `base_url`.
  pub assets: Vec<String>,
  /// Hosts answered network-first (external font providers, case-insensitive)
  #[serde(deserialize_with = "deserialize_lowercase_set")]
  pub font_hosts: BTreeSet<String>,
}

impl Default for ShellConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000/".to_string(),
      version: "v1".to_string(),
      document: "index.html".to_string(),
      assets: DEFAULT_SHELL_ASSETS.iter().map(|s| s.to_string()).collect(),
      font_hosts: ["fonts.googleapis.com", "fonts.gstatic.com"]
        .into_iter()
        .map(String::from)
        .collect(),
    }
  }
}

fn deserialize_lowercase_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v: Vec<String> = Vec::deserialize(deserializer)?;
  Ok(v.into_iter().map(|s| s.to_lowercase()).collect())
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fieldbook.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fieldbook/config.yaml
  ///
  /// Built-in defaults apply when no file exists; see config.example.yaml
  /// for the format.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fieldbook.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fieldbook").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  fn data_dir(&self) -> Result<PathBuf> {
    match &self.data_dir {
      Some(dir) => Ok(dir.clone()),
      None => {
        let base = dirs::data_dir()
          .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
          .ok_or_else(|| eyre!("Could not determine data directory"))?;
        Ok(base.join("fieldbook"))
      }
    }
  }

  /// Path of the journal database.
  pub fn db_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("journal.db"))
  }

  /// Directory for log files.
  pub fn log_dir(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("logs"))
  }

  /// Root directory holding shell cache generations.
  pub fn cache_root(&self) -> Result<PathBuf> {
    match &self.cache_dir {
      Some(dir) => Ok(dir.clone()),
      None => {
        let base =
          dirs::cache_dir().ok_or_else(|| eyre!("Could not determine cache directory"))?;
        Ok(base.join("fieldbook").join("shell"))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_cover_the_full_shell_section() {
    let config = Config::default();
    assert!(config.shell.base_url.ends_with('/'));
    assert_eq!(config.shell.document, "index.html");
    assert!(!config.shell.assets.is_empty());
    assert!(config.shell.font_hosts.contains("fonts.gstatic.com"));
  }

  #[test]
  fn test_yaml_overrides_and_lowercases_font_hosts() {
    let yaml = r#"
data_dir: /tmp/fb-data
shell:
  base_url: https://notes.example/journal
  version: v7
  font_hosts:
    - Fonts.Example.COM
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/fb-data")));
    assert_eq!(config.shell.version, "v7");
    assert!(config.shell.font_hosts.contains("fonts.example.com"));
    // Unspecified shell fields keep their defaults.
    assert_eq!(config.shell.document, "index.html");
  }

  #[test]
  fn test_db_path_respects_explicit_data_dir() {
    let config = Config {
      data_dir: Some(PathBuf::from("/tmp/fb")),
      ..Default::default()
    };
    assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/fb/journal.db"));
  }
}
