//! deckstat server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! ledger, and either serves the JSON API or runs a one-off command against
//! the store:
//!
//! ```text
//! deckstat serve
//! deckstat migrate snapshot.json            # dry-run, prints the plan report
//! deckstat migrate snapshot.json --commit   # commit, prints the manifest
//! deckstat stats --from 2025/01/01 --season 4
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use deckstat_core::{
  batch::MigrationBatch,
  migrate::{self, MigrationError},
  stats::{self, RawStatsFilter, StatsFilter},
};
use deckstat_server::ServerConfig;
use deckstat_store_sqlite::SqliteStore;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "deckstat match ledger")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,

  /// Plan a legacy JSON snapshot against the store, and optionally commit it.
  Migrate {
    /// The migration batch, as JSON.
    file:   PathBuf,
    /// Apply the batch. Without this flag nothing is written.
    #[arg(long)]
    commit: bool,
  },

  /// Print win-rate statistics as JSON.
  Stats {
    /// First date included, `YYYY-MM-DD` or `YYYY/MM/DD`.
    #[arg(long)]
    from:       Option<String>,
    /// Last date included.
    #[arg(long)]
    to:         Option<String>,
    #[arg(long)]
    season:     Option<u32>,
    /// ranked, casual_table or lobby_tournament.
    #[arg(long)]
    match_type: Option<String>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DECKSTAT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::Migrate { file, commit } => run_migration(&store, &file, commit).await,
    Command::Stats { from, to, season, match_type } => {
      let filter = StatsFilter::try_from(RawStatsFilter {
        start_date: from,
        end_date: to,
        season,
        match_type,
      })
      .context("invalid statistics filter")?;
      let statistics = stats::statistics(&store, &filter).await?;
      print_json(&statistics)
    }
  }
}

async fn serve(store: SqliteStore, config: &ServerConfig) -> anyhow::Result<()> {
  let app = deckstat_server::app(Arc::new(store), config);
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn run_migration(store: &SqliteStore, file: &Path, commit: bool) -> anyhow::Result<()> {
  let raw = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("failed to read {file:?}"))?;
  let batch: MigrationBatch =
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {file:?}"))?;

  if !commit {
    let report = migrate::dry_run(store, &batch).await?;
    return print_json(&report);
  }

  match migrate::commit(store, &batch, true).await {
    Ok(manifest) => print_json(&manifest),
    Err(MigrationError::Precondition { reason, report }) => {
      print_json(&report)?;
      anyhow::bail!("migration not applied: {reason}")
    }
    Err(err @ MigrationError::Storage(_)) => Err(err.into()),
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
