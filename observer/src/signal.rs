//! Raw signals delivered by the underlying watch facility.

use tokio::sync::oneshot;
use tracing::debug;

use crate::location::WatchedLocation;

/// A raw change signal for a watched location or one of its subitems.
///
/// The facility is trusted to deliver a single [`RawSignal::Relocated`]
/// for renames and moves; a relocation is never represented as a
/// disappear/appear pair.
#[derive(Debug)]
pub enum RawSignal {
    /// A subitem appeared.
    Appeared(WatchedLocation),

    /// A subitem disappeared.
    Disappeared(WatchedLocation),

    /// A subitem's contents or metadata changed.
    Modified(WatchedLocation),

    /// A subitem moved from one location to another.
    Relocated {
        from: WatchedLocation,
        to: WatchedLocation,
    },
}

/// Acknowledgement handle for a coordinated deletion.
///
/// Some deletions are held open by the underlying coordinator until the
/// observer confirms it has finished handling them. Failing to complete
/// the acknowledgement stalls the coordinator, so completion is
/// mandatory and unconditional.
#[derive(Debug)]
pub struct DeletionAck(oneshot::Sender<()>);

impl DeletionAck {
    /// Create an acknowledgement handle and the receiver the coordinator
    /// waits on.
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    /// Confirm that handling of the deletion has finished.
    pub fn complete(self) {
        if self.0.send(()).is_err() {
            // The coordinator gave up waiting; nothing left to do.
            debug!("deletion acknowledgement receiver already dropped");
        }
    }
}

/// A raw signal together with its optional deletion acknowledgement.
#[derive(Debug)]
pub struct SignalEnvelope {
    /// The signal itself.
    pub signal: RawSignal,

    /// Acknowledgement to complete once the signal has been handled.
    /// Only ever present on [`RawSignal::Disappeared`].
    pub ack: Option<DeletionAck>,
}

impl SignalEnvelope {
    /// Wrap a signal with no acknowledgement attached.
    pub fn new(signal: RawSignal) -> Self {
        Self { signal, ack: None }
    }

    /// Wrap a deletion signal that must be acknowledged.
    pub fn with_ack(signal: RawSignal, ack: DeletionAck) -> Self {
        Self {
            signal,
            ack: Some(ack),
        }
    }
}

impl From<RawSignal> for SignalEnvelope {
    fn from(signal: RawSignal) -> Self {
        Self::new(signal)
    }
}
