//! Classified change records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::WatchedLocation;
use crate::signal::RawSignal;

/// One observed change, classified into the closed set of change kinds.
///
/// Records are immutable values; once appended to the change log they
/// are never mutated or removed for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeRecord {
    /// An item appeared.
    Added { location: WatchedLocation },

    /// An item was removed.
    Deleted { location: WatchedLocation },

    /// An item's contents or metadata changed.
    Changed { location: WatchedLocation },

    /// An item moved; both endpoints are recorded.
    Moved {
        from: WatchedLocation,
        to: WatchedLocation,
    },
}

impl ChangeRecord {
    /// Map a raw signal to its record.
    ///
    /// Total over the four signal shapes and exact: a relocation maps to
    /// one [`ChangeRecord::Moved`], never to a delete/add pair, and no
    /// move is ever reconstructed from separate disappear and appear
    /// signals.
    pub fn classify(signal: RawSignal) -> Self {
        match signal {
            RawSignal::Appeared(location) => Self::Added { location },
            RawSignal::Disappeared(location) => Self::Deleted { location },
            RawSignal::Modified(location) => Self::Changed { location },
            RawSignal::Relocated { from, to } => Self::Moved { from, to },
        }
    }

    /// The identity key of this record: the subject location, or the
    /// origin location for a move.
    pub fn subject(&self) -> &WatchedLocation {
        match self {
            Self::Added { location } => location,
            Self::Deleted { location } => location,
            Self::Changed { location } => location,
            Self::Moved { from, .. } => from,
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { location } => write!(f, "Added {location}"),
            Self::Deleted { location } => write!(f, "Deleted {location}"),
            Self::Changed { location } => write!(f, "Changed {location}"),
            Self::Moved { from, to } => write!(f, "Moved {from} to {to}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(path: &str) -> WatchedLocation {
        WatchedLocation::new(path)
    }

    #[test]
    fn test_classifier_is_total_and_exact() {
        assert_eq!(
            ChangeRecord::classify(RawSignal::Appeared(loc("/c/a"))),
            ChangeRecord::Added { location: loc("/c/a") }
        );
        assert_eq!(
            ChangeRecord::classify(RawSignal::Disappeared(loc("/c/a"))),
            ChangeRecord::Deleted { location: loc("/c/a") }
        );
        assert_eq!(
            ChangeRecord::classify(RawSignal::Modified(loc("/c/a"))),
            ChangeRecord::Changed { location: loc("/c/a") }
        );
        assert_eq!(
            ChangeRecord::classify(RawSignal::Relocated {
                from: loc("/c/old.txt"),
                to: loc("/c/new.txt"),
            }),
            ChangeRecord::Moved {
                from: loc("/c/old.txt"),
                to: loc("/c/new.txt"),
            }
        );
    }

    #[test]
    fn test_subject_uses_origin_for_moves() {
        let moved = ChangeRecord::Moved {
            from: loc("/c/old.txt"),
            to: loc("/c/new.txt"),
        };
        assert_eq!(moved.subject(), &loc("/c/old.txt"));

        let deleted = ChangeRecord::Deleted { location: loc("/c/x") };
        assert_eq!(deleted.subject(), &loc("/c/x"));
    }

    #[test]
    fn test_display_matches_log_format() {
        let moved = ChangeRecord::Moved {
            from: loc("/c/old.txt"),
            to: loc("/c/new.txt"),
        };
        assert_eq!(moved.to_string(), "Moved /c/old.txt to /c/new.txt");
    }
}
