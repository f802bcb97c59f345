//! Sync cursor and outgoing-change detection.

use crate::record::BookRecord;
use crate::snapshot::LibrarySnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The boundary between already-synchronized and pending changes.
///
/// A single logical millisecond timestamp. The transport advances it
/// after a successful round-trip; this crate only ever reads it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SyncCursor(u64);

impl SyncCursor {
    /// Creates a cursor at the given millisecond timestamp.
    #[must_use]
    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond timestamp.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cursor:{}", self.0)
    }
}

/// Returns the records that changed since the cursor.
///
/// A record is outgoing when its `updated_at` is strictly greater than
/// the cursor, or when its tombstone timestamp is. The tombstone check
/// matters when a deletion is the only mutation since the last sync.
/// Pure function: the catalog is never mutated, and an empty or
/// unchanged catalog yields an empty sequence, never an error.
#[must_use]
pub fn outgoing_changes(catalog: &LibrarySnapshot, cursor: SyncCursor) -> Vec<BookRecord> {
    let since = cursor.as_millis();
    catalog
        .iter()
        .filter(|record| {
            record.updated_at > since || record.deleted_at.is_some_and(|deleted| deleted > since)
        })
        .cloned()
        .collect()
}
