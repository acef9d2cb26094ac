mod backup;
mod config;
mod query;
mod shell;
mod store;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::Config;
use crate::query::SearchFilters;
use crate::shell::{AssetRequest, ShellCache};
use crate::store::{Entry, EntryIndex, Mode, Store};

#[derive(Parser, Debug)]
#[command(name = "fieldbook")]
#[command(about = "Local-first field journal store with an offline shell cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fieldbook/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the data directory
  #[arg(long)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create a journal entry
  Add {
    title: String,
    /// Entry mode: daily, project or thinking
    #[arg(long, default_value = "daily")]
    mode: String,
    #[arg(long, default_value = "")]
    body: String,
    /// Tag to attach (repeatable, stored lowercase)
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Project folder this entry belongs to
    #[arg(long)]
    project: Option<String>,
    /// Mood or rating: great, good, okay, off or bad
    #[arg(long)]
    mood: Option<String>,
    /// Image file to embed as an inline attachment (repeatable)
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,
  },
  /// List entries, newest first
  List {
    /// Only entries of this mode
    #[arg(long)]
    mode: Option<String>,
    /// Only entries in this project folder
    #[arg(long)]
    project: Option<String>,
    /// Only pinned entries
    #[arg(long)]
    pinned: bool,
    /// Only starred entries
    #[arg(long)]
    starred: bool,
  },
  /// Print one entry in full
  Show { id: String },
  /// Toggle the pinned flag on an entry
  Pin { id: String },
  /// Toggle the starred flag on an entry
  Star { id: String },
  /// Search entries by text with optional facets
  Search {
    query: String,
    #[arg(long)]
    mode: Option<String>,
    /// Only pinned entries
    #[arg(long)]
    pinned: bool,
    /// Only starred entries
    #[arg(long)]
    starred: bool,
  },
  /// Delete a single entry
  Rm { id: String },
  /// Delete a project folder together with every entry in it
  RmProject {
    id: String,
    /// Delete only the folder, leaving its entries in place
    #[arg(long)]
    keep_entries: bool,
  },
  /// Seed the five default project folders (one-time, idempotent)
  Seed,
  /// Export the whole store to a snapshot file
  Export { file: PathBuf },
  /// Import a snapshot file (last-write-wins upsert, never deletes)
  Import { file: PathBuf },
  /// Manage the offline shell cache
  Shell {
    #[command(subcommand)]
    command: ShellCommand,
  },
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
  /// Pre-cache the shell assets into the current generation
  Install,
  /// Delete every cache generation except the current one
  Activate,
  /// Route one request through the cache policies and print the outcome
  Fetch { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let config = if let Some(data_dir) = args.data_dir {
    Config {
      data_dir: Some(data_dir),
      ..config
    }
  } else {
    config
  };

  let _log_guard = init_tracing(&config)?;

  match args.command {
    Command::Add {
      title,
      mode,
      body,
      tags,
      project,
      mood,
      attachments,
    } => {
      let mode: Mode = mode.parse().map_err(|e: String| eyre!(e))?;
      let mut entry = Entry::new(mode, title);
      entry.body = body;
      entry.tags = tags.iter().map(|t| t.trim().to_lowercase()).collect();
      entry.project_id = project;
      if let Some(feeling) = mood {
        let feeling = feeling.parse().map_err(|e: String| eyre!(e))?;
        match mode {
          Mode::Project => entry.rating = Some(feeling),
          Mode::Daily | Mode::Thinking => entry.mood = Some(feeling),
        }
      }
      for path in &attachments {
        let bytes = std::fs::read(path)
          .map_err(|e| eyre!("cannot read attachment {}: {e}", path.display()))?;
        entry.attach_bytes(mime_for(path), &bytes);
      }

      let store = open_store(&config)?;
      let id = store.put_entry(&entry)?;
      println!("{id}");
    }

    Command::List {
      mode,
      project,
      pinned,
      starred,
    } => {
      let selectors = [mode.is_some(), project.is_some(), pinned, starred]
        .into_iter()
        .filter(|s| *s)
        .count();
      if selectors > 1 {
        return Err(eyre!(
          "--mode, --project, --pinned and --starred are mutually exclusive"
        ));
      }

      let store = open_store(&config)?;
      let entries = if let Some(mode) = mode {
        query::list_by_mode(&store, mode.parse().map_err(|e: String| eyre!(e))?)?
      } else if let Some(project) = project {
        if store.get_project(&project)?.is_none() {
          warn!(project = %project, "unknown project folder");
        }
        query::list_by_project(&store, &project)?
      } else if pinned {
        store.entries_by(&EntryIndex::Pinned(true))?
      } else if starred {
        store.entries_by(&EntryIndex::Starred(true))?
      } else {
        store.all_entries()?
      };
      print_entries(&entries);
    }

    Command::Show { id } => {
      let store = open_store(&config)?;
      match store.get_entry(&id)? {
        Some(entry) => print_entry_full(&entry),
        None => println!("no entry with id {id}"),
      }
    }

    Command::Pin { id } => {
      let store = open_store(&config)?;
      let mut entry = store
        .get_entry(&id)?
        .ok_or_else(|| eyre!("no entry with id {id}"))?;
      entry.pinned = !entry.pinned;
      entry.touch();
      store.put_entry(&entry)?;
      println!("pinned: {}", entry.pinned);
    }

    Command::Star { id } => {
      let store = open_store(&config)?;
      let mut entry = store
        .get_entry(&id)?
        .ok_or_else(|| eyre!("no entry with id {id}"))?;
      entry.starred = !entry.starred;
      entry.touch();
      store.put_entry(&entry)?;
      println!("starred: {}", entry.starred);
    }

    Command::Search {
      query: text,
      mode,
      pinned,
      starred,
    } => {
      let filters = SearchFilters {
        mode: mode
          .map(|m| m.parse().map_err(|e: String| eyre!(e)))
          .transpose()?,
        pinned,
        starred,
      };
      let store = open_store(&config)?;
      let hits = query::search(&store, &text, &filters)?;
      print_entries(&hits);
    }

    Command::Rm { id } => {
      let store = open_store(&config)?;
      store.delete_entry(&id)?;
    }

    Command::RmProject { id, keep_entries } => {
      let store = open_store(&config)?;
      if keep_entries {
        store.delete_project(&id)?;
      } else {
        store.delete_project_cascade(&id)?;
      }
    }

    Command::Seed => {
      let store = open_store(&config)?;
      let seeded = store.seed_default_projects()?;
      if seeded == 0 {
        println!("projects already present, nothing seeded");
      } else {
        println!("seeded {seeded} default project folders");
      }
    }

    Command::Export { file } => {
      let store = open_store(&config)?;
      let snapshot = backup::export(&store)?;
      let json = serde_json::to_string_pretty(&snapshot)?;
      std::fs::write(&file, json)
        .map_err(|e| eyre!("cannot write snapshot {}: {e}", file.display()))?;
      println!(
        "exported {} entries and {} projects to {}",
        snapshot.entries.len(),
        snapshot.projects.len(),
        file.display()
      );
    }

    Command::Import { file } => {
      let contents = std::fs::read_to_string(&file)
        .map_err(|e| eyre!("cannot read snapshot {}: {e}", file.display()))?;
      let value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| eyre!("snapshot {} is not JSON: {e}", file.display()))?;
      let snapshot = backup::Snapshot::from_json(value)?;

      let store = open_store(&config)?;
      backup::import(&store, &snapshot)?;
      println!(
        "imported {} entries and {} projects",
        snapshot.entries.len(),
        snapshot.projects.len()
      );
    }

    Command::Shell { command } => {
      let cache = ShellCache::from_config(&config)?;
      match command {
        ShellCommand::Install => {
          let report = cache.install().await;
          println!("stored {} assets, {} failed", report.stored, report.failed);
        }
        ShellCommand::Activate => {
          let removed = cache.activate()?;
          if removed.is_empty() {
            println!("no stale generations");
          } else {
            println!("removed stale generations: {}", removed.join(", "));
          }
        }
        ShellCommand::Fetch { url } => {
          let url = Url::parse(&url).map_err(|e| eyre!("invalid url {url}: {e}"))?;
          let response = cache.handle(&AssetRequest::get(url)).await;
          println!(
            "{:?} {} {} ({} bytes)",
            response.source,
            response.status,
            response.content_type.as_deref().unwrap_or("-"),
            response.body.len()
          );
        }
      }
    }
  }

  Ok(())
}

fn open_store(config: &Config) -> Result<Store> {
  Ok(Store::open_at(&config.db_path()?)?)
}

fn print_entry_full(entry: &Entry) {
  let date = chrono::DateTime::from_timestamp_millis(entry.created_at)
    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_default();
  println!("{}  [{}]  {}", entry.title, entry.mode.as_str(), date);
  if let Some(project) = &entry.project_id {
    println!("project: {project}");
  }
  if !entry.tags.is_empty() {
    println!("tags: {}", entry.tags.join(", "));
  }
  if let Some(feeling) = entry.mood.or(entry.rating) {
    println!("feeling: {feeling:?}");
  }
  if entry.pinned || entry.starred {
    println!(
      "flags:{}{}",
      if entry.pinned { " pinned" } else { "" },
      if entry.starred { " starred" } else { "" }
    );
  }
  if !entry.attachments.is_empty() {
    println!("attachments: {}", entry.attachments.len());
  }
  if !entry.body.is_empty() {
    println!("\n{}", entry.body);
  }
}

fn print_entries(entries: &[Entry]) {
  for entry in entries {
    let date = chrono::DateTime::from_timestamp_millis(entry.created_at)
      .map(|d| d.format("%Y-%m-%d").to_string())
      .unwrap_or_else(|| "----------".to_string());
    println!("{date}  {:8}  {}  {}", entry.mode.as_str(), entry.id, entry.title);
  }
}

fn mime_for(path: &Path) -> &'static str {
  match path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| ext.to_lowercase())
    .as_deref()
  {
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    _ => "application/octet-stream",
  }
}

fn init_tracing(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = config.log_dir()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("cannot create log directory {}: {e}", log_dir.display()))?;

  let file_appender = tracing_appender::rolling::daily(&log_dir, "fieldbook.log");
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false),
    )
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false),
    )
    .init();

  info!("logging to {}", log_dir.display());
  Ok(guard)
}
