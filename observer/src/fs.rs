//! `notify`-backed implementation of the watch facility.
//!
//! Each subscription owns its own [`RecommendedWatcher`], so the
//! subscription's lifetime is exactly the guard's lifetime and an
//! unsubscribe can never leak delivery into a later subscription for
//! the same path.

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error};

use crate::error::{ObserverError, Result};
use crate::facility::{SignalSender, WatchFacility, WatchGuard};
use crate::location::WatchedLocation;
use crate::signal::RawSignal;

/// Watch facility backed by the platform file-system notification APIs.
#[derive(Debug, Default)]
pub struct FsWatchFacility;

impl FsWatchFacility {
    /// Create a new facility.
    pub fn new() -> Self {
        Self
    }
}

impl WatchFacility for FsWatchFacility {
    fn subscribe(
        &self,
        location: &WatchedLocation,
        signals: SignalSender,
    ) -> Result<Box<dyn WatchGuard>> {
        if !location.path().exists() {
            return Err(ObserverError::LocationNotFound(location.to_string()));
        }

        let root = location.path().to_path_buf();
        let mut renames = RenamePairing::default();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for signal in renames.translate(event) {
                        if signals.blocking_send(signal.into()).is_err() {
                            debug!("signal channel closed, dropping event");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!("watch error: {e}");
                }
            },
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        debug!("subscribed to {location}");

        Ok(Box::new(FsWatchGuard {
            watcher,
            location: location.clone(),
        }))
    }
}

/// Guard for one active filesystem subscription.
struct FsWatchGuard {
    watcher: RecommendedWatcher,
    location: WatchedLocation,
}

impl WatchGuard for FsWatchGuard {
    fn unsubscribe(mut self: Box<Self>) {
        let _ = self.watcher.unwatch(self.location.path());
        debug!("unsubscribed from {}", self.location);
    }
}

/// Pairs split rename notifications into single relocate signals.
///
/// Some backends report a rename as one event carrying both paths,
/// others as a `From` followed by a `To` linked by a tracker id. Both
/// forms become one [`RawSignal::Relocated`]; unmatched delete/add
/// pairs are never promoted to a move.
#[derive(Default)]
struct RenamePairing {
    pending_from: Option<(Option<usize>, WatchedLocation)>,
}

impl RenamePairing {
    fn translate(&mut self, event: notify::Event) -> Vec<RawSignal> {
        let tracker = event.attrs.tracker();

        match event.kind {
            EventKind::Create(_) => event
                .paths
                .into_iter()
                .map(|p| RawSignal::Appeared(p.into()))
                .collect(),

            EventKind::Remove(_) => event
                .paths
                .into_iter()
                .map(|p| RawSignal::Disappeared(p.into()))
                .collect(),

            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let mut paths = event.paths.into_iter();
                match (paths.next(), paths.next()) {
                    (Some(from), Some(to)) => vec![RawSignal::Relocated {
                        from: from.into(),
                        to: to.into(),
                    }],
                    (Some(only), None) => vec![RawSignal::Modified(only.into())],
                    _ => Vec::new(),
                }
            }

            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                let from = event.paths.into_iter().next().map(WatchedLocation::from);
                match from {
                    Some(from) => {
                        // A second unpaired `From` means the earlier item
                        // left the watched scope for good.
                        let stale = self.pending_from.replace((tracker, from));
                        stale
                            .map(|(_, gone)| vec![RawSignal::Disappeared(gone)])
                            .unwrap_or_default()
                    }
                    None => Vec::new(),
                }
            }

            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let to = match event.paths.into_iter().next() {
                    Some(to) => WatchedLocation::from(to),
                    None => return Vec::new(),
                };

                let paired = match self.pending_from.take() {
                    Some((from_tracker, from)) => {
                        let trackers_agree = match (from_tracker, tracker) {
                            (Some(a), Some(b)) => a == b,
                            _ => true,
                        };
                        if trackers_agree {
                            Some(from)
                        } else {
                            self.pending_from = Some((from_tracker, from));
                            None
                        }
                    }
                    None => None,
                };

                match paired {
                    Some(from) => vec![RawSignal::Relocated { from, to }],
                    // An item renamed into the watched scope from outside.
                    None => vec![RawSignal::Appeared(to)],
                }
            }

            EventKind::Modify(ModifyKind::Any | ModifyKind::Data(_) | ModifyKind::Metadata(_)) => {
                event
                    .paths
                    .into_iter()
                    .map(|p| RawSignal::Modified(p.into()))
                    .collect()
            }

            // Access notifications and catch-all kinds carry no change.
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use super::*;
    use crate::facility::SIGNAL_CHANNEL_CAPACITY;

    #[test]
    fn test_subscribe_missing_location_fails() {
        let facility = FsWatchFacility::new();
        let (tx, _rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);

        let result = facility.subscribe(
            &WatchedLocation::new("/nonexistent/path/12345"),
            tx,
        );
        assert!(matches!(result, Err(ObserverError::LocationNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_in_watched_directory_is_signalled() {
        let temp_dir = TempDir::new().unwrap();
        let facility = FsWatchFacility::new();
        let (tx, mut rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);

        let guard = facility
            .subscribe(&WatchedLocation::new(temp_dir.path()), tx)
            .unwrap();

        let file = temp_dir.path().join("fresh.txt");
        std::fs::write(&file, b"hello").unwrap();

        let expected = WatchedLocation::new(&file);
        let deadline = tokio::time::sleep(Duration::from_secs(5));
        tokio::pin!(deadline);

        let mut seen = false;
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                envelope = rx.recv() => match envelope {
                    Some(envelope) => {
                        let subject = match &envelope.signal {
                            RawSignal::Appeared(l)
                            | RawSignal::Disappeared(l)
                            | RawSignal::Modified(l) => l,
                            RawSignal::Relocated { from, .. } => from,
                        };
                        if subject == &expected {
                            seen = true;
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        assert!(seen, "expected a signal for {}", expected);
        guard.unsubscribe();
    }

    #[test]
    fn test_split_rename_is_paired_into_relocate() {
        let mut pairing = RenamePairing::default();

        let mut from_event = notify::Event::new(EventKind::Modify(ModifyKind::Name(
            RenameMode::From,
        )))
        .add_path("/c/old.txt".into());
        from_event = from_event.set_tracker(7);
        assert!(pairing.translate(from_event).is_empty());

        let mut to_event =
            notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
                .add_path("/c/new.txt".into());
        to_event = to_event.set_tracker(7);

        let signals = pairing.translate(to_event);
        assert_eq!(signals.len(), 1);
        assert!(matches!(
            &signals[0],
            RawSignal::Relocated { from, to }
                if from == &WatchedLocation::new("/c/old.txt")
                    && to == &WatchedLocation::new("/c/new.txt")
        ));
    }

    #[test]
    fn test_unpaired_rename_to_is_an_appearance() {
        let mut pairing = RenamePairing::default();

        let to_event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path("/c/arrived.txt".into());

        let signals = pairing.translate(to_event);
        assert_eq!(signals.len(), 1);
        assert!(matches!(
            &signals[0],
            RawSignal::Appeared(l) if l == &WatchedLocation::new("/c/arrived.txt")
        ));
    }
}
