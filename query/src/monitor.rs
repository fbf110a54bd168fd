//! Bulk-query facility: a coarse, predicate-based search over a root
//! scope that re-gathers periodically and notifies on changes.
//!
//! This is the secondary change signal next to the per-item observers:
//! it trades latency and precision for a full, always-consistent view
//! of the matching items under the root.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use wildmatch::WildMatch;

use ubiwatch_observer::WatchedLocation;

use crate::error::{QueryError, Result};

/// Default pause between re-gathering passes.
const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(2);

/// Depth of the query event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Signals emitted by a running query monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueryEvent {
    /// The initial gathering pass completed.
    GatheringFinished { count: usize },

    /// A later pass found a different result set.
    ResultsUpdated { count: usize },
}

/// One item matched by the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundItem {
    /// Where the item lives.
    pub location: WatchedLocation,

    /// Filesystem name of the item.
    pub name: String,

    /// Size in bytes.
    pub size: u64,

    /// Last modification time, when the filesystem reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// Wildcard match over filesystem names (`*` and `?`), the shape of the
/// original `name LIKE "*"` predicate.
#[derive(Debug, Clone)]
pub struct NamePredicate {
    pattern: String,
    matcher: WildMatch,
}

impl NamePredicate {
    /// Build a predicate from a wildcard pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let matcher = WildMatch::new(&pattern);
        Self { pattern, matcher }
    }

    /// Predicate matching every name.
    pub fn match_all() -> Self {
        Self::new("*")
    }

    /// Whether `name` satisfies the predicate.
    pub fn matches(&self, name: &str) -> bool {
        self.matcher.matches(name)
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Periodic predicate query over one root scope.
///
/// At most one gathering task is live per monitor: `start` on a running
/// monitor stops the previous task before launching the next (stop-then-
/// restart, never two concurrent monitors for the same logical search).
pub struct QueryMonitor {
    scope: WatchedLocation,
    predicate: NamePredicate,
    rescan_interval: Duration,
    results: Arc<Mutex<Vec<FoundItem>>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl QueryMonitor {
    /// Create a monitor over `scope` with the given name predicate.
    pub fn new(scope: WatchedLocation, predicate: NamePredicate) -> Self {
        Self {
            scope,
            predicate,
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
            results: Arc::new(Mutex::new(Vec::new())),
            cancel: None,
            task: None,
        }
    }

    /// Override the pause between re-gathering passes.
    pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = interval;
        self
    }

    /// Start gathering. Returns the receiver for query events.
    ///
    /// Fails with [`QueryError::QueryStart`] when the scope is missing
    /// or not a directory; the caller's per-item observers are
    /// unaffected by such a failure.
    pub async fn start(&mut self) -> Result<mpsc::Receiver<QueryEvent>> {
        self.stop().await;

        if !self.scope.path().is_dir() {
            return Err(QueryError::QueryStart(format!(
                "scope is not a directory: {}",
                self.scope
            )));
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(gather_loop(
            self.scope.clone(),
            self.predicate.clone(),
            self.rescan_interval,
            self.results.clone(),
            event_tx,
            cancel.clone(),
        ));

        info!(
            "query started over {} with pattern {:?}",
            self.scope,
            self.predicate.pattern()
        );
        self.cancel = Some(cancel);
        self.task = Some(task);
        Ok(event_rx)
    }

    /// Stop the gathering task, if one is running.
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            if task.await.is_err() {
                warn!("query task panicked during stop");
            }
            info!("query stopped");
        }
    }

    /// Whether a gathering task is live.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Suspend incorporation of new results while the guard is held.
    ///
    /// This is the disable-updates / read / re-enable bracket: the
    /// gathering task must take the same lock to publish a pass, so a
    /// reader holding the guard never observes a result set mid-update.
    pub async fn suspend(&self) -> SnapshotGuard<'_> {
        SnapshotGuard(self.results.lock().await)
    }

    /// The current result set, read inside a suspend bracket.
    pub async fn snapshot(&self) -> Vec<FoundItem> {
        self.suspend().await.items().to_vec()
    }
}

/// Holds incorporation of query results closed while in scope.
pub struct SnapshotGuard<'a>(MutexGuard<'a, Vec<FoundItem>>);

impl SnapshotGuard<'_> {
    /// The result set frozen by this guard.
    pub fn items(&self) -> &[FoundItem] {
        &self.0
    }
}

/// Gathering loop: one full pass, then periodic re-passes until
/// cancelled.
async fn gather_loop(
    scope: WatchedLocation,
    predicate: NamePredicate,
    interval: Duration,
    results: Arc<Mutex<Vec<FoundItem>>>,
    events: mpsc::Sender<QueryEvent>,
    cancel: CancellationToken,
) {
    let mut current = scan(&scope, &predicate).await;
    {
        let mut published = results.lock().await;
        *published = current.clone();
    }
    debug!("gathering finished with {} items", current.len());
    let _ = events
        .send(QueryEvent::GatheringFinished {
            count: current.len(),
        })
        .await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let fresh = scan(&scope, &predicate).await;
        if fresh != current {
            {
                let mut published = results.lock().await;
                *published = fresh.clone();
            }
            debug!("query results updated, now {} items", fresh.len());
            let _ = events
                .send(QueryEvent::ResultsUpdated { count: fresh.len() })
                .await;
            current = fresh;
        }
    }
}

/// One full gathering pass, off the async context.
async fn scan(scope: &WatchedLocation, predicate: &NamePredicate) -> Vec<FoundItem> {
    let root = scope.path().to_path_buf();
    let predicate = predicate.clone();

    let joined = tokio::task::spawn_blocking(move || scan_blocking(&root, &predicate)).await;
    match joined {
        Ok(items) => items,
        Err(e) => {
            warn!("gathering pass failed: {e}");
            Vec::new()
        }
    }
}

fn scan_blocking(root: &Path, predicate: &NamePredicate) -> Vec<FoundItem> {
    let mut items: Vec<FoundItem> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !predicate.matches(&name) {
                return None;
            }

            let metadata = entry.metadata().ok();
            Some(FoundItem {
                location: WatchedLocation::new(entry.path()),
                name,
                size: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
                modified: metadata
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from),
            })
        })
        .collect();

    // Name ascending, matching the original query's sort descriptor.
    items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.location.cmp(&b.location)));
    items
}
