//! Collaborator interfaces for the sync engine, with in-memory doubles.
//!
//! The engine consumes these seams but never implements them for real:
//! the network transport, the cover-asset source, durable storage, and
//! the progress observer all live outside this crate. The engine is
//! generic over them, so the doubles here are plain structs rather than
//! trait objects.

use crate::error::{SyncError, SyncResult};
use folio_catalog::{BookRecord, LibrarySnapshot};
use parking_lot::Mutex;

/// Network transport for exchanging snapshots with the remote library.
pub trait SyncTransport {
    /// Fetches the remote snapshot.
    async fn pull(&self) -> SyncResult<Vec<BookRecord>>;

    /// Sends outgoing local changes to the remote.
    async fn push(&self, outgoing: &[BookRecord]) -> SyncResult<()>;
}

/// Source of cover assets, fetched one bounded batch at a time.
pub trait CoverFetcher {
    /// Populates `cover_image_url` and `cover_downloaded_at` for the
    /// given records, returning them in input order. May fail per
    /// batch.
    async fn fetch_batch(&self, batch: Vec<BookRecord>) -> SyncResult<Vec<BookRecord>>;
}

/// Durable storage for the reconciled catalog.
pub trait CatalogStore {
    /// Writes the catalog. Invoked once per completed reconciliation.
    fn persist(&self, catalog: &LibrarySnapshot) -> SyncResult<()>;
}

/// Observer for reconciliation progress and intermediate state.
pub trait ReconcileObserver {
    /// Receives a fraction in `[0, 1]`, non-decreasing within one
    /// batching phase and reaching exactly `1.0` when the phase
    /// completes.
    fn on_progress(&self, _fraction: f64) {}

    /// Receives the partially updated catalog after each admitted
    /// batch, so a UI can show incremental library growth.
    fn on_catalog(&self, _catalog: &LibrarySnapshot) {}
}

/// An observer that ignores all events.
#[derive(Debug, Default)]
pub struct NullObserver;

impl ReconcileObserver for NullObserver {}

/// A mock transport for testing.
#[derive(Default)]
pub struct MockTransport {
    pull_response: Mutex<Option<Vec<BookRecord>>>,
    pull_failures: Mutex<u32>,
    push_failures: Mutex<u32>,
    pushed: Mutex<Vec<Vec<BookRecord>>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot returned by `pull`.
    pub fn set_pull_response(&self, records: Vec<BookRecord>) {
        *self.pull_response.lock() = Some(records);
    }

    /// Makes the next `count` pulls fail with a retryable network
    /// error.
    pub fn fail_pulls(&self, count: u32) {
        *self.pull_failures.lock() = count;
    }

    /// Makes the next `count` pushes fail with a retryable network
    /// error.
    pub fn fail_pushes(&self, count: u32) {
        *self.push_failures.lock() = count;
    }

    /// Returns every batch passed to `push`, oldest first.
    pub fn pushed(&self) -> Vec<Vec<BookRecord>> {
        self.pushed.lock().clone()
    }
}

impl SyncTransport for MockTransport {
    async fn pull(&self) -> SyncResult<Vec<BookRecord>> {
        {
            let mut failures = self.pull_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(SyncError::network_retryable("pull failed"));
            }
        }
        self.pull_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::network_fatal("no mock pull response set"))
    }

    async fn push(&self, outgoing: &[BookRecord]) -> SyncResult<()> {
        {
            let mut failures = self.push_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(SyncError::network_retryable("push failed"));
            }
        }
        self.pushed.lock().push(outgoing.to_vec());
        Ok(())
    }
}

/// A mock cover fetcher that stamps cover fields on each record.
pub struct MockCoverFetcher {
    downloaded_at: u64,
    batch_sizes: Mutex<Vec<usize>>,
    fail_at_batch: Mutex<Option<usize>>,
}

impl MockCoverFetcher {
    /// Creates a fetcher stamping the given download timestamp.
    pub fn new(downloaded_at: u64) -> Self {
        Self {
            downloaded_at,
            batch_sizes: Mutex::new(Vec::new()),
            fail_at_batch: Mutex::new(None),
        }
    }

    /// Makes the `n`-th batch (1-indexed) fail with a retryable
    /// network error.
    pub fn fail_at_batch(&self, n: usize) {
        *self.fail_at_batch.lock() = Some(n);
    }

    /// Returns the sizes of successfully fetched batches, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }

    /// Returns how many batches were successfully fetched.
    pub fn batches_fetched(&self) -> usize {
        self.batch_sizes.lock().len()
    }
}

impl Default for MockCoverFetcher {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CoverFetcher for MockCoverFetcher {
    async fn fetch_batch(&self, mut batch: Vec<BookRecord>) -> SyncResult<Vec<BookRecord>> {
        {
            let mut sizes = self.batch_sizes.lock();
            let index = sizes.len() + 1;
            if self.fail_at_batch.lock().is_some_and(|n| n == index) {
                return Err(SyncError::network_retryable("cover source unavailable"));
            }
            sizes.push(batch.len());
        }

        for record in &mut batch {
            record.cover_downloaded_at = Some(self.downloaded_at);
            record.cover_image_url = Some(format!("covers/{}.jpg", record.hash));
        }
        Ok(batch)
    }
}

/// An in-memory catalog store recording the last persisted snapshot.
#[derive(Default)]
pub struct MemoryStore {
    persisted: Mutex<Option<LibrarySnapshot>>,
    persist_count: Mutex<usize>,
}

impl MemoryStore {
    /// Creates a new memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recently persisted snapshot, if any.
    pub fn last_persisted(&self) -> Option<LibrarySnapshot> {
        self.persisted.lock().clone()
    }

    /// Returns how many times `persist` was invoked.
    pub fn persist_count(&self) -> usize {
        *self.persist_count.lock()
    }
}

impl CatalogStore for MemoryStore {
    fn persist(&self, catalog: &LibrarySnapshot) -> SyncResult<()> {
        *self.persisted.lock() = Some(catalog.clone());
        *self.persist_count.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_catalog::BookHash;

    fn record(hash: &str, updated_at: u64) -> BookRecord {
        BookRecord::new(BookHash::new(hash), updated_at)
    }

    #[tokio::test]
    async fn mock_transport_unset_pull_is_fatal() {
        let transport = MockTransport::new();
        let result = transport.pull().await;
        assert!(matches!(
            result,
            Err(SyncError::Network {
                retryable: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn mock_transport_scripted_failures_drain() {
        let transport = MockTransport::new();
        transport.set_pull_response(vec![record("a", 1)]);
        transport.fail_pulls(1);

        assert!(transport.pull().await.is_err());
        assert_eq!(transport.pull().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mock_transport_records_pushes() {
        let transport = MockTransport::new();
        transport.push(&[record("a", 1), record("b", 2)]).await.unwrap();

        let pushed = transport.pushed();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].len(), 2);
    }

    #[tokio::test]
    async fn mock_fetcher_stamps_cover_fields() {
        let fetcher = MockCoverFetcher::new(77);
        let fetched = fetcher.fetch_batch(vec![record("a", 1)]).await.unwrap();

        assert_eq!(fetched[0].cover_downloaded_at, Some(77));
        assert_eq!(fetched[0].cover_image_url.as_deref(), Some("covers/a.jpg"));
        assert_eq!(fetcher.batch_sizes(), [1]);
    }

    #[tokio::test]
    async fn mock_fetcher_fails_at_requested_batch() {
        let fetcher = MockCoverFetcher::new(1);
        fetcher.fail_at_batch(2);

        assert!(fetcher.fetch_batch(vec![record("a", 1)]).await.is_ok());
        assert!(fetcher.fetch_batch(vec![record("b", 2)]).await.is_err());
        assert_eq!(fetcher.batches_fetched(), 1);
    }

    #[test]
    fn memory_store_records_persists() {
        let store = MemoryStore::new();
        assert!(store.last_persisted().is_none());

        let snapshot = LibrarySnapshot::from_records(vec![record("a", 1)]);
        store.persist(&snapshot).unwrap();

        assert_eq!(store.last_persisted().unwrap(), snapshot);
        assert_eq!(store.persist_count(), 1);
    }
}
