//! Record types held by the store: journal entries and project folders.

use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
  Utc::now().timestamp_millis()
}

/// Context an entry was captured in. Immutable once set; editing an entry
/// preserves its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  Daily,
  Project,
  Thinking,
}

impl Mode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Mode::Daily => "daily",
      Mode::Project => "project",
      Mode::Thinking => "thinking",
    }
  }
}

impl std::str::FromStr for Mode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "daily" => Ok(Mode::Daily),
      "project" => Ok(Mode::Project),
      "thinking" => Ok(Mode::Thinking),
      other => Err(format!("unknown mode: {other}")),
    }
  }
}

/// Five-point scale used for both `mood` (daily/thinking entries) and
/// `rating` (project entries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feeling {
  Great,
  Good,
  Okay,
  Off,
  Bad,
}

impl std::str::FromStr for Feeling {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "great" => Ok(Feeling::Great),
      "good" => Ok(Feeling::Good),
      "okay" => Ok(Feeling::Okay),
      "off" => Ok(Feeling::Off),
      "bad" => Ok(Feeling::Bad),
      other => Err(format!("unknown feeling: {other}")),
    }
  }
}

/// A single journal entry.
///
/// Entries are mutated by full-record upsert only; there is no field-level
/// patch operation. The serialized field names (camelCase) are part of the
/// backup snapshot contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
  pub id: String,
  pub mode: Mode,
  /// Reference to a project folder; set iff `mode == Project` by convention.
  /// The store does not verify the target exists.
  #[serde(default)]
  pub project_id: Option<String>,
  /// How the entry was created (informational only).
  #[serde(default)]
  pub capture_type: String,
  pub title: String,
  pub body: String,
  #[serde(default)]
  pub mood: Option<Feeling>,
  #[serde(default)]
  pub rating: Option<Feeling>,
  /// Lowercase tags, insertion order preserved. Uniqueness is the UI's job.
  #[serde(default)]
  pub tags: Vec<String>,
  /// Inline-encoded image blobs (data URLs), order preserved.
  #[serde(default)]
  pub attachments: Vec<String>,
  #[serde(default)]
  pub sleep_hours: Option<f64>,
  #[serde(default)]
  pub coffee_count: Option<u32>,
  #[serde(default)]
  pub pinned: bool,
  #[serde(default)]
  pub starred: bool,
  /// Millisecond epoch, set once at creation.
  pub created_at: i64,
  /// Millisecond epoch, advances on every save.
  pub updated_at: i64,
}

impl Entry {
  /// Create a fresh entry with a generated id and both timestamps set to now.
  pub fn new(mode: Mode, title: impl Into<String>) -> Self {
    let now = now_ms();
    Self {
      id: Uuid::new_v4().to_string(),
      mode,
      project_id: None,
      capture_type: "manual".to_string(),
      title: title.into(),
      body: String::new(),
      mood: None,
      rating: None,
      tags: Vec::new(),
      attachments: Vec::new(),
      sleep_hours: None,
      coffee_count: None,
      pinned: false,
      starred: false,
      created_at: now,
      updated_at: now,
    }
  }

  /// Advance `updated_at` ahead of a save. `created_at` is never touched.
  pub fn touch(&mut self) {
    self.updated_at = now_ms();
  }

  /// Append raw bytes as an inline data-URL attachment.
  pub fn attach_bytes(&mut self, mime: &str, bytes: &[u8]) {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    self.attachments.push(format!("data:{mime};base64,{encoded}"));
  }
}

/// A project folder grouping entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id: String,
  pub name: String,
  pub icon: String,
  #[serde(default)]
  pub description: String,
  pub created_at: i64,
  pub updated_at: i64,
}

impl Project {
  /// Create a fresh project with a generated id and both timestamps set to now.
  pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
    let now = now_ms();
    Self {
      id: Uuid::new_v4().to_string(),
      name: name.into(),
      icon: icon.into(),
      description: String::new(),
      created_at: now,
      updated_at: now,
    }
  }
}

/// The five folders seeded on first run.
pub fn default_projects() -> Vec<Project> {
  [
    ("Field Notes", "🌿", "Observations from outside"),
    ("Workshop", "🔧", "Builds, repairs and experiments"),
    ("Trips", "🧭", "Planning and trip logs"),
    ("Reading", "📚", "Books and articles worth keeping"),
    ("Someday", "🌙", "Ideas without a deadline yet"),
  ]
  .into_iter()
  .map(|(name, icon, description)| {
    let mut project = Project::new(name, icon);
    project.description = description.to_string();
    project
  })
  .collect()
}
