//! The snapshot store.
//!
//! Holds the most recent canonical snapshot plus the transient highlight
//! set, behind a single lock: `patch` from the live channel may interleave
//! arbitrarily with `replace` from the poll loop with last-write-wins
//! semantics and no torn reads. An `initialized` flag distinguishes
//! "never populated" from "empty", which is what makes the cold-start
//! rule enforceable.

use lbwatch_core::{diff, Position, Price, Snapshot, SnapshotDiff};
use parking_lot::RwLock;
use std::collections::BTreeSet;

#[derive(Debug, Default)]
struct StoreInner {
    positions: Snapshot,
    highlights: BTreeSet<String>,
    initialized: bool,
}

/// Shared store for the current position snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<StoreInner>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the snapshot.
    ///
    /// Returns the previous snapshot, the diff against it, and whether the
    /// store had ever been populated before this call (false on the first
    /// replace after construction or `clear`).
    pub fn replace(&self, new: Snapshot) -> (Snapshot, SnapshotDiff, bool) {
        let mut inner = self.inner.write();
        let was_initialized = inner.initialized;
        let d = diff(&inner.positions, &new);
        let previous = std::mem::replace(&mut inner.positions, new);
        inner.initialized = true;
        (previous, d, was_initialized)
    }

    /// Reprice one position in place.
    ///
    /// Returns the repriced position, or `None` when the symbol is absent;
    /// a live update for a position already closed must never resurrect it.
    pub fn patch(&self, symbol: &str, mark_price: Price) -> Option<Position> {
        let mut inner = self.inner.write();
        let position = inner.positions.get_mut(symbol)?;
        *position = position.reprice(mark_price);
        Some(position.clone())
    }

    /// Cloned view of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().positions.clone()
    }

    /// Number of open positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.inner.read().positions.len()
    }

    /// Whether the store has ever been populated this session.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.read().initialized
    }

    /// Replace the highlight set (symbols opened by the latest diff).
    pub fn set_highlights(&self, highlights: BTreeSet<String>) {
        self.inner.write().highlights = highlights;
    }

    /// Symbols highlighted by the most recent poll.
    #[must_use]
    pub fn highlighted(&self) -> BTreeSet<String> {
        self.inner.read().highlights.clone()
    }

    /// Clear highlights only (used on stop; positions stay visible).
    pub fn clear_highlights(&self) {
        self.inner.write().highlights.clear();
    }

    /// Reset to empty-uninitialized (used on start).
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.positions.clear();
        inner.highlights.clear();
        inner.initialized = false;
    }
}
