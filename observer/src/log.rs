//! The consolidated, insertion-ordered change log.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::record::ChangeRecord;

/// Append-only log of observed changes.
///
/// Cloning produces another handle to the same log. `append` is the
/// only mutator and is called from exactly one place, the session's
/// consumer task; reads always see a prefix that is consistent with
/// the latest completed append.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    records: Arc<RwLock<Vec<ChangeRecord>>>,
}

impl ChangeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. Always succeeds; the log grows unbounded for
    /// the lifetime of the session.
    pub async fn append(&self, record: ChangeRecord) {
        self.records.write().await.push(record);
    }

    /// The full ordered sequence of records, oldest first.
    pub async fn records(&self) -> Vec<ChangeRecord> {
        self.records.read().await.clone()
    }

    /// Number of records appended so far.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether anything has been observed yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
