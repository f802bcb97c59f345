//! The ordered library snapshot.

use crate::record::{BookHash, BookRecord};
use serde::{Deserialize, Serialize};

/// An ordered sequence of book records.
///
/// Append order is stable across merges so the user-visible shelf does
/// not reorder on every sync: updates replace records in place, new
/// records go to the end. At most one record exists per hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    records: Vec<BookRecord>,
}

impl LibrarySnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot from records, preserving their order.
    #[must_use]
    pub fn from_records(records: Vec<BookRecord>) -> Self {
        Self { records }
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true if a record with the given hash exists.
    #[must_use]
    pub fn contains(&self, hash: &BookHash) -> bool {
        self.get(hash).is_some()
    }

    /// Looks up a record by hash.
    #[must_use]
    pub fn get(&self, hash: &BookHash) -> Option<&BookRecord> {
        self.records.iter().find(|record| &record.hash == hash)
    }

    /// Looks up a record by hash for mutation.
    pub fn get_mut(&mut self, hash: &BookHash) -> Option<&mut BookRecord> {
        self.records.iter_mut().find(|record| &record.hash == hash)
    }

    /// Appends a record to the end of the shelf.
    pub fn push(&mut self, record: BookRecord) {
        self.records.push(record);
    }

    /// Replaces the record with the same hash in place, or appends.
    pub fn upsert(&mut self, record: BookRecord) {
        match self.get_mut(&record.hash) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Iterates over records in shelf order.
    pub fn iter(&self) -> impl Iterator<Item = &BookRecord> {
        self.records.iter()
    }

    /// Returns the records as a slice, in shelf order.
    #[must_use]
    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    /// Consumes the snapshot, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<BookRecord> {
        self.records
    }
}
