//! Snapshots and the diff engine.
//!
//! A snapshot is the complete set of open positions as of one successful
//! poll. The diff between two consecutive snapshots is computed purely on
//! symbol membership: a position whose fields change but stays open is not
//! a transition.

use crate::position::Position;
use std::collections::{BTreeSet, HashMap};

/// All positions open as of the last successful fetch or merge,
/// keyed by symbol.
pub type Snapshot = HashMap<String, Position>;

/// Opened/closed symbol sets between two consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Symbols present in the new snapshot but not the old.
    pub opened: BTreeSet<String>,
    /// Symbols present in the old snapshot but not the new.
    pub closed: BTreeSet<String>,
}

impl SnapshotDiff {
    /// Check whether the diff reports no transitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty()
    }
}

/// Compute the opened/closed sets between two snapshots.
///
/// `opened = keys(new) - keys(old)`, `closed = keys(old) - keys(new)`.
/// The cold-start rule (the first populated poll announces nothing as
/// opened) is the scheduler's responsibility; this function stays pure.
#[must_use]
pub fn diff(old: &Snapshot, new: &Snapshot) -> SnapshotDiff {
    let opened = new
        .keys()
        .filter(|symbol| !old.contains_key(*symbol))
        .cloned()
        .collect();
    let closed = old
        .keys()
        .filter(|symbol| !new.contains_key(*symbol))
        .cloned()
        .collect();
    SnapshotDiff { opened, closed }
}
