//! Pull/push orchestration over a sync transport.

use crate::config::RetryPolicy;
use crate::error::SyncResult;
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::retry::with_retry;
use crate::transport::{CatalogStore, CoverFetcher, ReconcileObserver, SyncTransport};
use folio_catalog::{outgoing_changes, SyncCursor};
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates pull and push cycles against a remote library.
///
/// Every transport call runs under the configured retry policy. The
/// sync cursor is input only: the transport advances it after a
/// successful round-trip, never this type.
pub struct LibrarySyncer<T, F, S, O> {
    transport: Arc<T>,
    reconciler: Arc<Reconciler<F, S, O>>,
    retry: RetryPolicy,
}

impl<T, F, S, O> LibrarySyncer<T, F, S, O>
where
    T: SyncTransport,
    F: CoverFetcher,
    S: CatalogStore,
    O: ReconcileObserver,
{
    /// Creates a syncer over a transport and reconciler. Transport
    /// calls retry per the reconciler's configured policy.
    pub fn new(transport: T, reconciler: Reconciler<F, S, O>) -> Self {
        let retry = reconciler.config().retry.clone();
        Self {
            transport: Arc::new(transport),
            reconciler: Arc::new(reconciler),
            retry,
        }
    }

    /// Returns the reconciler.
    pub fn reconciler(&self) -> &Reconciler<F, S, O> {
        &self.reconciler
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Pulls the remote snapshot and merges it into the catalog.
    ///
    /// The pull itself is retried per the policy; a reconciliation
    /// failure is not, since the caller decides whether to re-run the
    /// whole cycle.
    pub async fn pull_and_merge(&self) -> SyncResult<ReconcileReport> {
        let snapshot = with_retry(|| self.transport.pull(), &self.retry).await?;
        debug!("Pulled {} records from remote", snapshot.len());
        self.reconciler.reconcile(snapshot).await
    }

    /// Pushes every record that changed since `cursor`.
    ///
    /// Returns the number of records pushed; zero means the catalog was
    /// already in sync and the transport was never touched.
    pub async fn push_changes(&self, cursor: SyncCursor) -> SyncResult<usize> {
        let outgoing = outgoing_changes(&self.reconciler.catalog(), cursor);
        if outgoing.is_empty() {
            debug!("Nothing to push since {}", cursor);
            return Ok(0);
        }

        with_retry(|| self.transport.push(&outgoing), &self.retry).await?;
        info!("Pushed {} outgoing records", outgoing.len());
        Ok(outgoing.len())
    }
}
