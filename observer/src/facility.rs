//! The seam to the underlying watch machinery.

use tokio::sync::mpsc;

use crate::error::Result;
use crate::location::WatchedLocation;
use crate::signal::SignalEnvelope;

/// Channel on which a facility delivers raw signals for one
/// subscription. The facility may send from any thread; consumption is
/// marshaled onto the session's consumer context by the observer.
pub type SignalSender = mpsc::Sender<SignalEnvelope>;

/// Default depth of the per-subscription signal channel.
pub const SIGNAL_CHANNEL_CAPACITY: usize = 256;

/// A source of raw change signals for watched locations.
///
/// Subscriptions cover the location itself and, for containers, its
/// subtree. Delivery guarantees (at-least-once, per item) are inherited
/// from the backing implementation as-is; nothing here retries.
pub trait WatchFacility: Send + Sync {
    /// Begin delivering signals for `location` on `signals`.
    ///
    /// The returned guard owns the subscription: dropping deliveries
    /// requires calling [`WatchGuard::unsubscribe`], never just dropping
    /// the observer that consumes them.
    fn subscribe(
        &self,
        location: &WatchedLocation,
        signals: SignalSender,
    ) -> Result<Box<dyn WatchGuard>>;
}

/// An active subscription held on behalf of one observer.
pub trait WatchGuard: Send {
    /// Stop delivery for this subscription.
    ///
    /// After this returns the facility sends nothing further on the
    /// subscription's channel.
    fn unsubscribe(self: Box<Self>);
}
