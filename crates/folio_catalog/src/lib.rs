//! # Folio Catalog
//!
//! Catalog data model and change detection for the Folio library
//! synchronization core.
//!
//! This crate provides:
//! - [`BookRecord`] and [`BookHash`] for catalog entries
//! - [`LibrarySnapshot`] for the ordered, stable-append shelf
//! - [`SyncCursor`] and [`outgoing_changes`] for change detection
//! - The whole-record last-writer-wins merge rule
//!
//! This is a pure data crate with no I/O operations.
//!
//! ## Key Invariants
//!
//! - A book's hash is immutable and is the sole join key between the
//!   local and remote copies of a catalog
//! - At most one live (non-deleted) record exists per hash
//! - Snapshot append order is stable across merges
//! - Deletion is logical: a tombstone timestamp, never physical removal

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changes;
mod record;
mod snapshot;

pub use changes::{outgoing_changes, SyncCursor};
pub use record::{BookHash, BookRecord};
pub use snapshot::LibrarySnapshot;
