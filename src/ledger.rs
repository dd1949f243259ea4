//! Per-item consecutive-failure accounting.
//!
//! The ledger lives only as long as the supervisor process: restarting the
//! supervisor resets every count to zero. That is an accepted limitation,
//! not a bug - the queue file is the durable state, the ledger is not.

use std::collections::HashMap;

/// In-memory map from item identifier to consecutive-failure count.
///
/// Invariant: a present entry has a count in `[1, threshold]`; the entry
/// is removed in the same step its item leaves the queue file (success or
/// threshold eviction).
#[derive(Debug, Default)]
pub struct FailureLedger {
    counts: HashMap<String, u32>,
}

impl FailureLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more consecutive failure for `id` and return the new
    /// count. Starts at 1 for an unseen identifier.
    pub fn record_failure(&mut self, id: &str) -> u32 {
        let count = self.counts.entry(id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Record a success for `id`, deleting its entry if present.
    pub fn record_success(&mut self, id: &str) {
        self.counts.remove(id);
    }

    /// Delete `id`'s entry unconditionally (permanent-removal path).
    pub fn clear(&mut self, id: &str) {
        self.counts.remove(id);
    }

    /// Current count for `id`, if it has any recorded failures
    pub fn count(&self, id: &str) -> Option<u32> {
        self.counts.get(id).copied()
    }

    /// Whether the ledger has no entries
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of identifiers with recorded failures
    pub fn len(&self) -> usize {
        self.counts.len()
    }
}
