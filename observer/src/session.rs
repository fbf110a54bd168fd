//! Session lifecycle: selection, activation, and the consumer task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::facility::WatchFacility;
use crate::location::WatchedLocation;
use crate::log::ChangeLog;
use crate::record::ChangeRecord;
use crate::registry::ObserverRegistry;

/// Depth of the record channel between observers and the consumer task.
const RECORD_CHANNEL_CAPACITY: usize = 1000;

/// A watch session: the one owner of the registry, the change log, and
/// the last-known selection.
///
/// All change log mutation happens on the session's single consumer
/// task; observers only ever hand records to that task. Lifecycle
/// transitions of the host process map onto [`activate`](Self::activate)
/// and [`deactivate`](Self::deactivate).
pub struct WatchSession {
    registry: ObserverRegistry,
    log: ChangeLog,
    selection: Vec<WatchedLocation>,
    active: bool,
    consumer: JoinHandle<()>,
    consumer_cancel: CancellationToken,
}

impl WatchSession {
    /// Create an inactive session over the given watch facility.
    pub fn new(facility: Arc<dyn WatchFacility>) -> Self {
        let (record_tx, record_rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
        let log = ChangeLog::new();
        let consumer_cancel = CancellationToken::new();
        let consumer = spawn_consumer(log.clone(), record_rx, consumer_cancel.clone());

        Self {
            registry: ObserverRegistry::new(facility, record_tx),
            log,
            selection: Vec::new(),
            active: false,
            consumer,
            consumer_cancel,
        }
    }

    /// Replace the selection with a freshly reported set of locations.
    ///
    /// Reconciles immediately when active. A duplicate or reordered
    /// report of the current set is a valid trigger and still causes a
    /// full reconciliation.
    pub async fn update_selection(&mut self, selection: Vec<WatchedLocation>) {
        self.selection = selection;
        if self.active {
            self.registry.reconcile(&self.selection).await;
        }
    }

    /// Enter the active state, rebuilding observers from the last-known
    /// selection. Idempotent.
    pub async fn activate(&mut self) {
        if self.active {
            return;
        }
        self.registry.reconcile(&self.selection).await;
        self.active = true;
        info!("session activated with {} observers", self.registry.len());
    }

    /// Leave the active state, unsubscribing every observer. The log
    /// and the last-known selection survive for the next activation.
    pub async fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.registry.teardown().await;
        self.active = false;
        info!("session deactivated");
    }

    /// Whether the session is currently observing.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Read-only handle to the change log for the display layer.
    pub fn log(&self) -> ChangeLog {
        self.log.clone()
    }

    /// Locations currently observed.
    pub fn observed_locations(&self) -> Vec<WatchedLocation> {
        self.registry.locations()
    }

    /// Tear everything down, including the consumer task.
    pub async fn shutdown(mut self) {
        self.deactivate().await;
        self.consumer_cancel.cancel();
        let _ = self.consumer.await;
        debug!("session shut down");
    }
}

/// The single consumer context: drains classified records into the log.
fn spawn_consumer(
    log: ChangeLog,
    mut records: mpsc::Receiver<ChangeRecord>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                record = records.recv() => match record {
                    Some(record) => {
                        debug!("observed {record}");
                        log.append(record).await;
                    }
                    None => break,
                },
            }
        }
    })
}
