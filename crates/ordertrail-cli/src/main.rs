//! `ordertrail` — track order records and show how they changed.
//!
//! # Usage
//!
//! ```text
//! ordertrail poll                  # fetch once, record and print changes
//! ordertrail poll --watch 300      # keep polling every five minutes
//! ordertrail record RN123 order.json
//! ordertrail history RN123
//! ordertrail list
//! ordertrail serve
//! ```

mod client;
mod settings;
mod token;

use std::{
  io::Read as _,
  net::SocketAddr,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use ordertrail_api::{ApiState, api_router, timeline::timeline};
use ordertrail_core::{
  diff::Diff,
  fields::FieldCatalog,
  order::{self, OrderView},
  kv::KeyValueStore,
  reconcile::{OrderSource, Reconciler},
  record::{Record, display_value},
  store::{HistoryKeys, SnapshotStore},
};
use ordertrail_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{client::HttpOrderSource, settings::Settings};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ordertrail", version, about = "Order change tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "ordertrail.toml", global = true)]
  config: PathBuf,

  /// Override the SQLite store location.
  #[arg(long, env = "ORDERTRAIL_STORE", global = true)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch all orders, record changes and print them.
  Poll {
    /// Keep polling, waiting this many seconds between cycles.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    watch: Option<u64>,

    /// Access token; overrides `upstream.access_token`.
    #[arg(long, env = "ORDERTRAIL_TOKEN", hide_env_values = true)]
    token: Option<String>,
  },
  /// Reconcile one record read from a JSON file (`-` for stdin).
  Record {
    key:  String,
    file: PathBuf,
  },
  /// Print the change timeline of one order.
  History {
    key: String,
  },
  /// List tracked orders with their latest known state.
  List,
  /// Serve the JSON API.
  Serve,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let mut settings = Settings::load(&cli.config)?;
  if let Some(store) = cli.store {
    settings.store_path = store;
  }

  let engine = open_engine(&settings).await?;
  let catalog = settings.catalog();

  match cli.command {
    Command::Poll { watch, token } => {
      let access_token = token
        .or_else(|| settings.upstream.access_token.clone())
        .ok_or_else(|| anyhow!("no access token; set upstream.access_token or --token"))?;
      let now = chrono::Utc::now().timestamp();
      if !token::is_token_valid(&access_token, now) {
        bail!("access token is expired or malformed; sign in again");
      }
      let source = HttpOrderSource::new(settings.upstream.clone(), access_token)?;
      poll(&engine, &source, &catalog, watch.map(Duration::from_secs)).await
    }
    Command::Record { key, file } => {
      let record = read_record(&file)?;
      let diff = engine.reconcile(&key, record).await?;
      print_diff(&key, &diff, &catalog);
      Ok(())
    }
    Command::History { key } => history(&engine, &key, &catalog).await,
    Command::List => list(&engine, &catalog).await,
    Command::Serve => serve(engine, catalog, &settings).await,
  }
}

async fn open_engine(settings: &Settings) -> Result<Reconciler<SqliteStore>> {
  if let Some(dir) = settings.store_path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }

  let kv = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let store = SnapshotStore::with_keys(kv, HistoryKeys::new(settings.history_prefix.clone()));
  Ok(Reconciler::new(store))
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn poll<K: KeyValueStore, S: OrderSource>(
  engine: &Reconciler<K>,
  source: &S,
  catalog: &FieldCatalog,
  watch: Option<Duration>,
) -> Result<()> {
  let Some(period) = watch else {
    return poll_once(engine, source, catalog).await;
  };

  let mut ticker = tokio::time::interval(period);
  loop {
    ticker.tick().await;
    match poll_once(engine, source, catalog).await {
      Ok(()) => {}
      // A rejected token will not recover on its own; end the session.
      Err(e) if is_unauthorized(&e) => return Err(e),
      Err(e) => tracing::error!(error = %format!("{e:#}"), "poll failed; retrying next cycle"),
    }
  }
}

async fn poll_once<K: KeyValueStore, S: OrderSource>(
  engine: &Reconciler<K>,
  source: &S,
  catalog: &FieldCatalog,
) -> Result<()> {
  let report = engine.refresh(source).await.context("refresh failed")?;

  if report.has_changes() {
    for (key, diff) in &report.diffs {
      print_diff(key, diff, catalog);
    }
  } else {
    println!("{} order(s) checked, no changes", report.observed.len());
  }
  Ok(())
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
  matches!(
    err.downcast_ref::<ordertrail_core::Error>(),
    Some(ordertrail_core::Error::Unauthorized)
  )
}

async fn history(engine: &Reconciler<SqliteStore>, key: &str, catalog: &FieldCatalog) -> Result<()> {
  let snapshots = engine.store().read(key).await?;
  if snapshots.is_empty() {
    println!("No history recorded for {key} yet.");
    return Ok(());
  }

  for entry in timeline(&snapshots, catalog) {
    let when = entry
      .recorded_at
      .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
      .unwrap_or_else(|| entry.timestamp.to_string());
    let heading = if entry.is_initial { "Initial state recorded" } else { "Changes detected" };
    println!("{when}  {heading}");

    if entry.changes.is_empty() {
      println!("  No relevant changes in this snapshot.");
    }
    for change in &entry.changes {
      println!("  {}: {} → {}", change.label, change.from, change.to);
    }
    println!();
  }
  Ok(())
}

async fn list(engine: &Reconciler<SqliteStore>, catalog: &FieldCatalog) -> Result<()> {
  let keys = engine.store().list_keys().await?;
  if keys.is_empty() {
    println!("No orders tracked yet.");
  }

  for key in keys {
    let snapshots = engine.store().read(&key).await?;
    let Some(latest) = snapshots.last() else { continue };
    let view = OrderView::new(&latest.data);
    println!(
      "{key}  {}  model={}  vin={}  plate={}  snapshots={}",
      view.status().unwrap_or("N/A"),
      view.model_code().unwrap_or("N/A"),
      view.vin().unwrap_or("N/A"),
      view.license_plate().unwrap_or("N/A"),
      snapshots.len(),
    );
    let options = view.options();
    if !options.is_empty() {
      println!("    {}: {}", catalog.label(order::MKT_OPTIONS), options.join(", "));
    }
    for path in [order::DELIVERY_WINDOW, order::ETA_TO_DELIVERY_CENTER, order::VEHICLE_LOCATION] {
      if let Some(value) = view.get(path) {
        println!("    {}: {}", catalog.label(path), display_value(Some(value)));
      }
    }
  }
  Ok(())
}

async fn serve(engine: Reconciler<SqliteStore>, catalog: FieldCatalog, settings: &Settings) -> Result<()> {
  let app = axum::Router::new()
    .nest("/api", api_router(ApiState::new(engine, catalog)))
    .layer(TraceLayer::new_for_http());

  let address: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
    .parse()
    .context("invalid server address")?;

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn read_record(path: &Path) -> Result<Record> {
  let raw = if path == Path::new("-") {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
    buf
  } else {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
  };

  let record: Record = serde_json::from_str(&raw).context("parsing record JSON")?;
  if !record.is_object() {
    bail!("record must be a JSON object");
  }
  Ok(record)
}

fn print_diff(key: &str, diff: &Diff, catalog: &FieldCatalog) {
  if diff.is_empty() {
    println!("{key}: no changes");
    return;
  }

  println!("{key}: {} change(s)", diff.len());
  for (path, entry) in diff {
    println!(
      "  {}: {} → {}",
      catalog.label(path),
      display_value(entry.old.as_ref()),
      display_value(entry.new.as_ref()),
    );
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use ordertrail_core::{kv::MemoryStore, reconcile::SourceError};
  use serde_json::{Value, json};

  use super::*;

  struct ScriptedSource {
    responses: Mutex<Vec<Result<Vec<Value>, SourceError>>>,
    calls:     AtomicUsize,
  }

  impl ScriptedSource {
    fn new(responses: Vec<Result<Vec<Value>, SourceError>>) -> Self {
      Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
    }
  }

  impl OrderSource for ScriptedSource {
    async fn fetch_orders(&self) -> Result<Vec<Value>, SourceError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.responses.lock().unwrap().remove(0)
    }
  }

  fn engine() -> Reconciler<MemoryStore> { Reconciler::new(SnapshotStore::new(MemoryStore::new())) }

  #[test]
  fn unauthorized_is_seen_through_context() {
    let err = anyhow::Error::new(ordertrail_core::Error::Unauthorized).context("refresh failed");
    assert!(is_unauthorized(&err));

    let err = anyhow::Error::new(ordertrail_core::Error::Upstream("HTTP 503".into()))
      .context("refresh failed");
    assert!(!is_unauthorized(&err));
  }

  #[tokio::test]
  async fn watch_ends_on_unauthorized() {
    let source = ScriptedSource::new(vec![Err(SourceError::Unauthorized)]);
    let err = poll(&engine(), &source, &FieldCatalog::orders(), Some(Duration::from_millis(1)))
      .await
      .unwrap_err();

    assert!(is_unauthorized(&err));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn watch_retries_after_other_failures() {
    let source = ScriptedSource::new(vec![
      Err(SourceError::failed("HTTP 503")),
      Ok(vec![json!({ "order": { "referenceNumber": "RN1" } })]),
      Err(SourceError::Unauthorized),
    ]);
    let e = engine();
    poll(&e, &source, &FieldCatalog::orders(), Some(Duration::from_millis(1)))
      .await
      .unwrap_err();

    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(e.store().list_keys().await.unwrap(), vec!["RN1"]);
  }

  #[test]
  fn zero_watch_period_is_rejected() {
    assert!(Cli::try_parse_from(["ordertrail", "poll", "--watch", "0"]).is_err());
    let cli = Cli::try_parse_from(["ordertrail", "poll", "--watch", "5"]).unwrap();
    assert!(matches!(cli.command, Command::Poll { watch: Some(5), .. }));
  }
}
