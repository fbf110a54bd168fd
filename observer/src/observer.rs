//! Per-item observer: bridges one watched location to the change log.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::facility::SignalSender;
use crate::location::WatchedLocation;
use crate::record::ChangeRecord;
use crate::signal::SignalEnvelope;

/// Observer for exactly one watched location.
///
/// Construction is pure: an observer does not subscribe itself. The
/// registry performs the subscribe/unsubscribe pairing so ownership of
/// that lifecycle lives in one place.
pub struct ItemObserver {
    location: WatchedLocation,
    records: mpsc::Sender<ChangeRecord>,
}

impl ItemObserver {
    /// Create an observer bound to `location`, forwarding classified
    /// records on `records`.
    pub fn new(location: WatchedLocation, records: mpsc::Sender<ChangeRecord>) -> Self {
        Self { location, records }
    }

    /// The location this observer is bound to.
    pub fn location(&self) -> &WatchedLocation {
        &self.location
    }

    /// Consume raw signals until cancelled or the facility closes the
    /// channel.
    ///
    /// The select is biased towards cancellation so no envelope is
    /// processed once teardown has started: the registry cancels this
    /// token only after the facility guard has been unsubscribed, and
    /// awaits the task, which together guarantee no delivery for a
    /// discarded observer.
    pub(crate) async fn run(
        self,
        mut signals: mpsc::Receiver<SignalEnvelope>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                envelope = signals.recv() => match envelope {
                    Some(envelope) => self.deliver(envelope).await,
                    None => break,
                },
            }
        }
        debug!("observer for {} stopped", self.location);
    }

    /// Classify one envelope and forward the record.
    ///
    /// The deletion acknowledgement, when present, completes whether or
    /// not forwarding succeeded; withholding it would stall the
    /// underlying coordinator.
    async fn deliver(&self, envelope: SignalEnvelope) {
        let SignalEnvelope { signal, ack } = envelope;
        let record = ChangeRecord::classify(signal);

        if self.records.send(record).await.is_err() {
            warn!(
                "change log consumer for {} is gone, dropping record",
                self.location
            );
        }

        if let Some(ack) = ack {
            ack.complete();
        }
    }
}

/// Create the signal channel an observer consumes from.
pub(crate) fn signal_channel() -> (SignalSender, mpsc::Receiver<SignalEnvelope>) {
    mpsc::channel(crate::facility::SIGNAL_CHANNEL_CAPACITY)
}
