//! One-shot resolution of a logical container name to a root location.

use std::path::PathBuf;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ubiwatch_observer::WatchedLocation;

use crate::error::{QueryError, Result};

/// Name of the container used when the caller passes no identifier.
const DEFAULT_CONTAINER: &str = "default";

/// Resolves logical container names against a local containers
/// directory.
///
/// The lookup can be slow (the real sync service may need to touch the
/// network), so it runs on a blocking worker and completes through a
/// [`PendingResolution`] rather than blocking the caller's context.
#[derive(Debug, Clone)]
pub struct LocalContainerResolver {
    containers_dir: PathBuf,
}

impl LocalContainerResolver {
    /// Create a resolver rooted at `containers_dir`.
    pub fn new(containers_dir: impl Into<PathBuf>) -> Self {
        Self {
            containers_dir: containers_dir.into(),
        }
    }

    /// Create a resolver rooted at the platform's local data directory.
    pub fn from_user_dirs() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::new(dir.join("ubiwatch-containers")))
    }

    /// Start resolving `container` (or the default container for
    /// `None`).
    ///
    /// Returns immediately; await [`PendingResolution::wait`] for the
    /// outcome. The pending lookup can be cancelled, though the normal
    /// flow never needs to.
    pub fn resolve(&self, container: Option<&str>) -> PendingResolution {
        let name = container.unwrap_or(DEFAULT_CONTAINER).to_string();
        let requested = container.map(str::to_string);
        let root = self.containers_dir.join(&name);

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        tokio::spawn(async move {
            let lookup = tokio::task::spawn_blocking(move || {
                if root.is_dir() {
                    Ok(WatchedLocation::new(root))
                } else {
                    Err(QueryError::resolution(
                        requested.as_deref(),
                        "container root is missing; make sure the sync service is available",
                    ))
                }
            });

            let outcome = tokio::select! {
                _ = worker_cancel.cancelled() => {
                    Err(QueryError::resolution(None, "resolution cancelled"))
                }
                joined = lookup => match joined {
                    Ok(result) => result,
                    Err(e) => Err(QueryError::resolution(None, e.to_string())),
                },
            };

            match &outcome {
                Ok(location) => info!("resolved container root: {location}"),
                Err(e) => warn!("{e}"),
            }

            // Receiver may have been dropped; resolution is one-shot
            // and best-effort either way.
            let _ = tx.send(outcome);
        });

        PendingResolution { cancel, rx }
    }
}

/// A container lookup in flight.
pub struct PendingResolution {
    cancel: CancellationToken,
    rx: oneshot::Receiver<Result<WatchedLocation>>,
}

impl PendingResolution {
    /// Abandon the lookup. `wait` will report a resolution failure.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the lookup to finish.
    pub async fn wait(self) -> Result<WatchedLocation> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(QueryError::resolution(None, "resolver worker went away")),
        }
    }
}
