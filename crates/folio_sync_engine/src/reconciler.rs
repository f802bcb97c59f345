//! Reconciliation state machine.

use crate::batch::fetch_in_batches;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{CatalogStore, CoverFetcher, ReconcileObserver};
use folio_catalog::{BookRecord, LibrarySnapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The current state of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// No reconciliation in flight.
    Idle,
    /// Merging matched records from a remote snapshot.
    Merging,
    /// Fetching cover assets for newly admitted records.
    FetchingNewCovers,
}

impl ReconcileState {
    /// Returns true if a reconciliation run is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !matches!(self, ReconcileState::Idle)
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// True when the trigger was dropped because a run was in flight.
    pub skipped: bool,
    /// Matched records merged into the catalog.
    pub merged: usize,
    /// New records admitted from the remote snapshot.
    pub admitted: usize,
    /// Unmatched records dropped as unconfirmed or deleted.
    pub dropped: usize,
    /// Covers refreshed for already-known records.
    pub covers_refreshed: usize,
    /// Duration of the run.
    pub duration: Duration,
}

impl ReconcileReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Merges remote snapshots into the locally held catalog.
///
/// The reconciler owns the catalog for the duration of a run. At most
/// one reconciliation runs per catalog instance: a trigger that
/// arrives while a run is in flight is dropped, not queued, and the
/// dropped call reports itself as skipped. Callers that need
/// guaranteed processing re-trigger after observing completion.
pub struct Reconciler<F, S, O> {
    config: SyncConfig,
    fetcher: Arc<F>,
    store: Arc<S>,
    observer: Arc<O>,
    catalog: RwLock<LibrarySnapshot>,
    state: RwLock<ReconcileState>,
}

impl<F, S, O> Reconciler<F, S, O>
where
    F: CoverFetcher,
    S: CatalogStore,
    O: ReconcileObserver,
{
    /// Creates a reconciler over an initial catalog.
    pub fn new(config: SyncConfig, catalog: LibrarySnapshot, fetcher: F, store: S, observer: O) -> Self {
        Self {
            config,
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
            observer: Arc::new(observer),
            catalog: RwLock::new(catalog),
            state: RwLock::new(ReconcileState::Idle),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ReconcileState {
        *self.state.read()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns a copy of the current catalog.
    pub fn catalog(&self) -> LibrarySnapshot {
        self.catalog.read().clone()
    }

    /// Returns the store collaborator.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the observer collaborator.
    pub fn observer(&self) -> &Arc<O> {
        &self.observer
    }

    fn set_state(&self, state: ReconcileState) {
        *self.state.write() = state;
    }

    /// Atomically claims the busy flag for a new run.
    fn try_begin(&self) -> bool {
        let mut state = self.state.write();
        if state.is_busy() {
            false
        } else {
            *state = ReconcileState::Merging;
            true
        }
    }

    /// Clears the busy flag and wraps the failure that ended the run.
    fn abort(&self, error: SyncError) -> SyncError {
        warn!("Reconciliation aborted: {}", error);
        self.set_state(ReconcileState::Idle);
        SyncError::merge_aborted(error)
    }

    /// Merges `remote` into the catalog.
    ///
    /// Matched records are merged with whole-record last-writer-wins,
    /// refreshing missing cover assets first so the fetched fields fold
    /// into the merge result. Unmatched records are admitted only when
    /// the remote upload is confirmed and not deleted; admitted records
    /// are cover-fetched in bounded batches, each batch committed and
    /// published before the next starts. The final catalog is persisted
    /// once through the store.
    ///
    /// On failure, completed batches stay committed, the failing batch
    /// and everything after it are discarded, and the error surfaces as
    /// [`SyncError::MergeAborted`] with the busy flag cleared.
    pub async fn reconcile(&self, mut remote: Vec<BookRecord>) -> SyncResult<ReconcileReport> {
        if !self.try_begin() {
            debug!("Reconciliation already in flight, dropping trigger");
            return Ok(ReconcileReport::skipped());
        }

        let start = Instant::now();
        let mut report = ReconcileReport::default();

        // Oldest first, so new records append in chronological order.
        remote.sort_by_key(|record| record.updated_at);

        let (matched, unmatched): (Vec<BookRecord>, Vec<BookRecord>) = {
            let catalog = self.catalog.read();
            remote
                .into_iter()
                .partition(|record| catalog.contains(&record.hash))
        };

        let matched = match self.refresh_matched_covers(matched, &mut report).await {
            Ok(matched) => matched,
            Err(error) => return Err(self.abort(error)),
        };

        self.merge_matched(matched, &mut report);

        self.set_state(ReconcileState::FetchingNewCovers);

        let unmatched_total = unmatched.len();
        let admitted: Vec<BookRecord> = unmatched
            .into_iter()
            .filter(|record| record.uploaded_at.is_some() && record.deleted_at.is_none())
            .collect();
        report.dropped = unmatched_total - admitted.len();
        if report.dropped > 0 {
            debug!("Dropped {} unconfirmed or deleted remote records", report.dropped);
        }

        if let Err(error) = self.admit_new_records(admitted, &mut report).await {
            return Err(self.abort(error));
        }

        if let Err(error) = self.store.persist(&self.catalog.read()) {
            return Err(self.abort(error));
        }

        self.set_state(ReconcileState::Idle);
        report.duration = start.elapsed();
        info!(
            "Reconciled remote snapshot: {} merged, {} admitted, {} dropped",
            report.merged, report.admitted, report.dropped
        );
        Ok(report)
    }

    /// Fetches covers for matched records that still lack a local
    /// cover asset, substituting the fetched copies back in order.
    async fn refresh_matched_covers(
        &self,
        mut matched: Vec<BookRecord>,
        report: &mut ReconcileReport,
    ) -> SyncResult<Vec<BookRecord>> {
        let needs_refresh: Vec<usize> = {
            let catalog = self.catalog.read();
            matched
                .iter()
                .enumerate()
                .filter(|(_, remote)| {
                    remote.deleted_at.is_none()
                        && remote.uploaded_at.is_some()
                        && catalog
                            .get(&remote.hash)
                            .is_some_and(|local| local.cover_downloaded_at.is_none())
                })
                .map(|(index, _)| index)
                .collect()
        };

        if needs_refresh.is_empty() {
            return Ok(matched);
        }

        let to_fetch: Vec<BookRecord> = needs_refresh
            .iter()
            .map(|&index| matched[index].clone())
            .collect();

        let fetched = fetch_in_batches(
            to_fetch,
            self.config.refresh_batch_size,
            |batch| self.fetcher.fetch_batch(batch),
            |fraction| self.observer.on_progress(fraction),
        )
        .await?;

        report.covers_refreshed = fetched.len();
        for (index, record) in needs_refresh.into_iter().zip(fetched) {
            matched[index] = record;
        }
        Ok(matched)
    }

    /// Merges matched pairs with whole-record last-writer-wins and
    /// commits the results in place.
    fn merge_matched(&self, matched: Vec<BookRecord>, report: &mut ReconcileReport) {
        if matched.is_empty() {
            return;
        }

        let mut catalog = self.catalog.write();
        for remote in matched {
            if let Some(local) = catalog.get_mut(&remote.hash) {
                let merged = BookRecord::merged(local, &remote);
                *local = merged;
                report.merged += 1;
            }
        }
    }

    /// Cover-fetches admitted records in bounded batches. Each
    /// completed batch is appended to the catalog and published before
    /// the next batch starts, so observers see incremental growth.
    async fn admit_new_records(
        &self,
        admitted: Vec<BookRecord>,
        report: &mut ReconcileReport,
    ) -> SyncResult<()> {
        if admitted.is_empty() {
            return Ok(());
        }

        let fetched = fetch_in_batches(
            admitted,
            self.config.admit_batch_size,
            |batch| async move {
                let batch = self.fetcher.fetch_batch(batch).await?;
                {
                    let mut catalog = self.catalog.write();
                    for record in &batch {
                        catalog.push(record.clone());
                    }
                }
                self.observer.on_catalog(&self.catalog.read());
                Ok(batch)
            },
            |fraction| self.observer.on_progress(fraction),
        )
        .await?;

        report.admitted = fetched.len();
        Ok(())
    }
}
