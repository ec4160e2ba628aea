use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

/// Runs `items` through `f` with at most `limit` in flight at once, skipping
/// any item not yet dispatched once `cancel` fires (SPEC_FULL §4.7 — cancel
/// is cooperative, partial work already in flight is allowed to finish).
pub async fn run_bounded<T, I, F, Fut>(items: Vec<I>, limit: usize, cancel: &CancellationToken, f: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    stream::iter(items)
        .take_while(|_| {
            let cancelled = cancel.is_cancelled();
            async move { !cancelled }
        })
        .map(f)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn runs_every_item_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let results = run_bounded(vec![1, 2, 3, 4], 2, &cancel, |x| async move { x * 2 }).await;
        let mut sorted = results;
        sorted.sort();
        assert_eq!(sorted, vec![2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn respects_concurrency_limit() {
        let cancel = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let items: Vec<i32> = (0..10).collect();
        run_bounded(items, 3, &cancel, |_| {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn stops_dispatching_once_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = run_bounded(vec![1, 2, 3], 2, &cancel, |x| async move { x }).await;
        assert!(results.is_empty());
    }
}
