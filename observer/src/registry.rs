//! Observer registry and selection reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::facility::{WatchFacility, WatchGuard};
use crate::location::WatchedLocation;
use crate::observer::{ItemObserver, signal_channel};
use crate::record::ChangeRecord;

/// One live subscription: the facility guard, the cancellation token
/// for the forwarding task, and the task itself.
struct ActiveObserver {
    guard: Box<dyn WatchGuard>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the set of active observers, keyed by watched location.
///
/// Membership changes only through [`reconcile`](Self::reconcile) and
/// [`teardown`](Self::teardown), which keeps the subscribe/unsubscribe
/// pairing in one place and holds the invariant that at most one
/// observer exists per distinct location.
pub struct ObserverRegistry {
    facility: Arc<dyn WatchFacility>,
    records: mpsc::Sender<ChangeRecord>,
    active: HashMap<WatchedLocation, ActiveObserver>,
}

impl ObserverRegistry {
    /// Create an empty registry delivering records on `records`.
    pub fn new(facility: Arc<dyn WatchFacility>, records: mpsc::Sender<ChangeRecord>) -> Self {
        Self {
            facility,
            records,
            active: HashMap::new(),
        }
    }

    /// Bring the active observers in line with `selection`.
    ///
    /// This is a full teardown and rebuild rather than a diff: the
    /// backing subscriptions are bound to the session lifetime, and a
    /// subscription carried across a reconciliation would double-deliver.
    /// Every fresh observer is subscribed before this returns, so the
    /// consumer never sees a partially subscribed selection.
    pub async fn reconcile(&mut self, selection: &[WatchedLocation]) {
        self.teardown().await;

        for location in selection {
            if self.active.contains_key(location) {
                // Duplicate entry in the selection; one observer only.
                continue;
            }

            let (signal_tx, signal_rx) = signal_channel();
            let guard = match self.facility.subscribe(location, signal_tx) {
                Ok(guard) => guard,
                Err(e) => {
                    warn!("failed to subscribe to {location}: {e}");
                    continue;
                }
            };

            let observer = ItemObserver::new(location.clone(), self.records.clone());
            let cancel = CancellationToken::new();
            let task = tokio::spawn(observer.run(signal_rx, cancel.clone()));

            debug!("observing {location}");
            self.active.insert(
                location.clone(),
                ActiveObserver {
                    guard,
                    cancel,
                    task,
                },
            );
        }

        info!("registry reconciled, observing {} locations", self.active.len());
    }

    /// Unsubscribe and discard every active observer.
    ///
    /// Each guard is unsubscribed before its forwarding task is
    /// cancelled and awaited, so once this returns no record from a
    /// discarded subscription can reach the consumer.
    pub async fn teardown(&mut self) {
        for (location, observer) in self.active.drain() {
            observer.guard.unsubscribe();
            observer.cancel.cancel();
            if observer.task.await.is_err() {
                warn!("observer task for {location} panicked during teardown");
            }
            debug!("discarded observer for {location}");
        }
    }

    /// Locations currently under observation.
    pub fn locations(&self) -> Vec<WatchedLocation> {
        self.active.keys().cloned().collect()
    }

    /// Number of active observers.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether the registry holds no observers.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
