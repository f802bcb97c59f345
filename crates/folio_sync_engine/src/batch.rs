//! Bounded, sequential asset fetching with progress reporting.

use crate::error::SyncResult;
use std::future::Future;

/// Fetches derived assets for `records` in contiguous batches.
///
/// Batches hold at most `batch_size` records and run strictly
/// sequentially: each `fetch_batch` call completes before the next
/// begins, which bounds resource usage and keeps results in input
/// order. After every batch, `on_progress` receives
/// `min(batches_done * batch_size / total, 1.0)` — non-decreasing and
/// exactly `1.0` on completion. An empty input yields no progress
/// events.
///
/// A failing batch aborts the remaining ones and propagates its error
/// unchanged; retrying is the caller's responsibility.
pub async fn fetch_in_batches<T, F, Fut, P>(
    records: Vec<T>,
    batch_size: usize,
    mut fetch_batch: F,
    mut on_progress: P,
) -> SyncResult<Vec<T>>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = SyncResult<Vec<T>>>,
    P: FnMut(f64),
{
    let total = records.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let batch_size = batch_size.max(1);
    let mut fetched = Vec::with_capacity(total);
    let mut remaining = records;
    let mut batches_done = 0usize;

    while !remaining.is_empty() {
        let rest = if remaining.len() > batch_size {
            remaining.split_off(batch_size)
        } else {
            Vec::new()
        };
        let batch = std::mem::replace(&mut remaining, rest);

        fetched.extend(fetch_batch(batch).await?);

        batches_done += 1;
        let fraction = ((batches_done * batch_size) as f64 / total as f64).min(1.0);
        on_progress(fraction);
    }

    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn chunks_are_bounded_and_ordered() {
        let mut sizes = Vec::new();
        let fetched = fetch_in_batches(
            (0..25).collect::<Vec<u32>>(),
            10,
            |batch| {
                sizes.push(batch.len());
                async move { Ok(batch) }
            },
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(sizes, [10, 10, 5]);
        assert_eq!(fetched, (0..25).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn progress_is_monotone_and_ends_at_one() {
        let mut progress = Vec::new();
        fetch_in_batches(
            (0..25).collect::<Vec<u32>>(),
            10,
            |batch| async move { Ok(batch) },
            |fraction| progress.push(fraction),
        )
        .await
        .unwrap();

        assert_eq!(progress.len(), 3);
        assert!((progress[0] - 0.4).abs() < 1e-9);
        assert!((progress[1] - 0.8).abs() < 1e-9);
        assert_eq!(progress[2], 1.0);
        assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn exact_multiple_ends_at_one() {
        let mut progress = Vec::new();
        fetch_in_batches(
            (0..20).collect::<Vec<u32>>(),
            10,
            |batch| async move { Ok(batch) },
            |fraction| progress.push(fraction),
        )
        .await
        .unwrap();

        assert_eq!(progress, [0.5, 1.0]);
    }

    #[tokio::test]
    async fn single_batch_reports_one() {
        let mut progress = Vec::new();
        fetch_in_batches(
            vec![1u32, 2, 3],
            10,
            |batch| async move { Ok(batch) },
            |fraction| progress.push(fraction),
        )
        .await
        .unwrap();

        assert_eq!(progress, [1.0]);
    }

    #[tokio::test]
    async fn empty_input_reports_nothing() {
        let mut progress = Vec::new();
        let fetched = fetch_in_batches(
            Vec::<u32>::new(),
            10,
            |batch| async move { Ok(batch) },
            |fraction| progress.push(fraction),
        )
        .await
        .unwrap();

        assert!(fetched.is_empty());
        assert!(progress.is_empty());
    }

    #[tokio::test]
    async fn failure_aborts_remaining_batches() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);

        let result = fetch_in_batches(
            (0..30).collect::<Vec<u32>>(),
            10,
            move |batch| {
                let attempts = Arc::clone(&counted);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 1 {
                        Err(SyncError::network_retryable("asset source unavailable"))
                    } else {
                        Ok(batch)
                    }
                }
            },
            |_| {},
        )
        .await;

        assert!(result.is_err());
        // First batch succeeded, second failed, third never started.
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn progress_holds_for_varied_batch_sizes() {
        for batch_size in 1..=8usize {
            for total in 1..=12usize {
                let mut progress = Vec::new();
                fetch_in_batches(
                    (0..total).collect::<Vec<usize>>(),
                    batch_size,
                    |batch| async move { Ok(batch) },
                    |fraction| progress.push(fraction),
                )
                .await
                .unwrap();

                assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
                assert_eq!(*progress.last().unwrap(), 1.0);
                assert_eq!(progress.len(), total.div_ceil(batch_size));
            }
        }
    }
}
