//! # Container Resolution and Bulk Queries
//!
//! The two collaborators the change-observation core leans on:
//!
//! - [`LocalContainerResolver`]: one-shot, potentially slow lookup of a
//!   logical container name to its root location, off the caller's
//!   context, with representable cancellation.
//! - [`QueryMonitor`]: a coarse predicate search over a root scope that
//!   re-gathers periodically and brackets every snapshot read so the
//!   result set is never observed mid-update.
//!
//! Failures on either path are local: the per-item observers in
//! `ubiwatch-observer` keep working without a resolved root or a
//! running query.

pub mod error;
pub mod monitor;
pub mod resolver;

pub use error::{QueryError, Result};
pub use monitor::{FoundItem, NamePredicate, QueryEvent, QueryMonitor, SnapshotGuard};
pub use resolver::{LocalContainerResolver, PendingResolution};
