//! Terminal front end: wires the resolver, the bulk query, and the
//! watch session together and renders the change log as it grows.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ubiwatch_observer::{ChangeLog, FsWatchFacility, WatchSession, WatchedLocation};
use ubiwatch_query::{LocalContainerResolver, NamePredicate, QueryMonitor};

#[derive(Parser, Debug)]
#[command(name = "ubiwatch", about = "Observe changes to cloud-synced files and folders")]
struct Args {
    /// Locations to observe, as reported by the file picker.
    paths: Vec<PathBuf>,

    /// Logical container to resolve; omitted means the default
    /// container.
    #[arg(long)]
    container: Option<String>,

    /// Directory holding container roots (defaults to the platform
    /// data directory).
    #[arg(long)]
    containers_dir: Option<PathBuf>,

    /// Filename pattern for the bulk query.
    #[arg(long, default_value = "*")]
    pattern: String,

    /// Seconds between bulk-query rescans.
    #[arg(long, default_value_t = 2)]
    rescan: u64,

    /// Emit change records as JSON lines instead of text.
    #[arg(long)]
    json: bool,

    /// Create a uniquely named file in the resolved container root.
    #[arg(long)]
    touch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Container resolution is slow and non-fatal: a failure just means
    // no root-relative features this run.
    let root = resolve_root(&args).await;

    let mut monitor = match &root {
        Some(root) => {
            if args.touch {
                touch_file(root)?;
            }
            start_query(root, &args).await
        }
        None => None,
    };

    let facility = Arc::new(FsWatchFacility::new());
    let mut session = WatchSession::new(facility);
    let selection: Vec<WatchedLocation> =
        args.paths.iter().map(WatchedLocation::new).collect();

    session.update_selection(selection).await;
    session.activate().await;
    info!(
        "observing {} locations; press ctrl-c to stop",
        session.observed_locations().len()
    );

    render_until_interrupted(session.log(), args.json).await?;

    if let Some(monitor) = monitor.as_mut() {
        monitor.stop().await;
    }

    let records = session.log().records().await;
    session.shutdown().await;

    info!("session ended with {} observed changes", records.len());
    Ok(())
}

/// Resolve the container root, logging failure and carrying on.
async fn resolve_root(args: &Args) -> Option<WatchedLocation> {
    let resolver = match &args.containers_dir {
        Some(dir) => Some(LocalContainerResolver::new(dir)),
        None => LocalContainerResolver::from_user_dirs(),
    };

    let Some(resolver) = resolver else {
        warn!("no containers directory available on this platform");
        return None;
    };

    match resolver.resolve(args.container.as_deref()).wait().await {
        Ok(root) => Some(root),
        Err(e) => {
            warn!("{e}; continuing without a container root");
            None
        }
    }
}

/// Start the bulk query over the resolved root; a refusal to start is
/// logged and ignored, the per-item observers carry the session.
async fn start_query(root: &WatchedLocation, args: &Args) -> Option<QueryMonitor> {
    let mut monitor = QueryMonitor::new(root.clone(), NamePredicate::new(&args.pattern))
        .with_rescan_interval(Duration::from_secs(args.rescan));

    match monitor.start().await {
        Ok(mut events) => {
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    info!("query posted {event:?}");
                }
            });
            Some(monitor)
        }
        Err(e) => {
            warn!("{e}; bulk query disabled for this run");
            None
        }
    }
}

/// Create an empty, uniquely named file in the container root.
fn touch_file(root: &WatchedLocation) -> anyhow::Result<()> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let target = root.join(format!("ubiwatch-{stamp}.txt"));

    std::fs::write(target.path(), b"")
        .with_context(|| format!("failed to create {target}"))?;
    info!("created {target}");
    Ok(())
}

/// Poll the log and print each record exactly once, until ctrl-c.
async fn render_until_interrupted(log: ChangeLog, json: bool) -> anyhow::Result<()> {
    let mut printed = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                let records = log.records().await;
                for record in &records[printed..] {
                    if json {
                        println!("{}", serde_json::to_string(record)?);
                    } else {
                        println!("{record}");
                    }
                }
                printed = records.len();
            }
        }
    }

    Ok(())
}
