//! # Change Observation Core
//!
//! This crate tracks a user-selected set of filesystem locations that
//! live in a cloud-synced container and turns raw watch notifications
//! into a consolidated, insertion-ordered log of classified changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        WatchSession                            │
//! ├────────────────────────────────────────────────────────────────┤
//! │  selection ──► ObserverRegistry ──► ItemObserver (per location)│
//! │                      │                     │                   │
//! │                      ▼                     ▼                   │
//! │                WatchFacility          ChangeRecord ──► ChangeLog│
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry owns the subscribe/unsubscribe pairing; observers
//! classify signals; the session's single consumer task is the only
//! mutator of the change log.

pub mod error;
pub mod facility;
pub mod fs;
pub mod location;
pub mod log;
pub mod observer;
pub mod record;
pub mod registry;
pub mod session;
pub mod signal;

pub use error::{ObserverError, Result};
pub use facility::{SignalSender, WatchFacility, WatchGuard};
pub use fs::FsWatchFacility;
pub use location::WatchedLocation;
pub use log::ChangeLog;
pub use observer::ItemObserver;
pub use record::ChangeRecord;
pub use registry::ObserverRegistry;
pub use session::WatchSession;
pub use signal::{DeletionAck, RawSignal, SignalEnvelope};
