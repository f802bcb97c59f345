//! # Folio Sync Engine
//!
//! Reconciliation state machine and engine for the Folio library
//! synchronization core.
//!
//! This crate provides:
//! - Retry with exponential backoff and deadline wrappers
//! - Bounded, sequential asset-fetch batching with progress reporting
//! - The reconciler state machine (idle → merging → fetching covers)
//! - Transport, cover-fetch, storage, and observer seams with
//!   in-memory test doubles
//!
//! ## Architecture
//!
//! The engine implements a **pull-merge-fetch** synchronization model:
//! 1. Pull the remote snapshot through the transport collaborator
//! 2. Merge matched records with whole-record last-writer-wins
//! 3. Admit confirmed new records, fetching cover assets in bounded
//!    sequential batches with observable intermediate state
//!
//! Outgoing changes for a push are computed against the sync cursor by
//! [`folio_catalog::outgoing_changes`]; the cursor itself is advanced
//! by the transport after a successful round-trip, never by this crate.
//!
//! ## Key Invariants
//!
//! - At most one reconciliation runs per catalog instance; a trigger
//!   that arrives mid-run is dropped, not queued
//! - Asset batches run strictly sequentially, never concurrently
//! - Completed batches stay committed when a later batch fails
//! - A deadline never cancels its operation; it only stops waiting

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

mod batch;
mod config;
mod error;
mod reconciler;
mod retry;
mod syncer;
mod transport;

pub use batch::fetch_in_batches;
pub use config::{Deadline, RetryPolicy, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use reconciler::{ReconcileReport, ReconcileState, Reconciler};
pub use retry::{with_deadline, with_retry};
pub use syncer::LibrarySyncer;
pub use transport::{
    CatalogStore, CoverFetcher, MemoryStore, MockCoverFetcher, MockTransport, NullObserver,
    ReconcileObserver, SyncTransport,
};
