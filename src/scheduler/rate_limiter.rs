use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::errors::KestrelError;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// One token bucket per target URL, gating every `TargetClient::send`
/// (SPEC_FULL §4.7). `rate` tokens/sec refill up to `burst` capacity.
pub struct RateLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
    rate: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self { buckets: DashMap::new(), rate, burst: burst as f64 }
    }

    /// Blocks (cooperatively, respecting `cancel`) until a token is
    /// available for `target`, then consumes it.
    pub async fn acquire(&self, target: &str, cancel: &CancellationToken) -> Result<(), KestrelError> {
        loop {
            if cancel.is_cancelled() {
                return Err(KestrelError::Cancelled);
            }

            let wait = {
                if !self.buckets.contains_key(target) {
                    self.buckets.insert(
                        target.to_string(),
                        Mutex::new(Bucket { tokens: self.burst, last_refill: Instant::now() }),
                    );
                }
                let entry = self.buckets.get(target).expect("just inserted");
                let mut bucket = entry.lock().await;

                let elapsed = bucket.last_refill.elapsed().as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
                bucket.last_refill = Instant::now();

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - bucket.tokens;
                    Some(Duration::from_secs_f64(deficit / self.rate))
                }
            };

            match wait {
                None => return Ok(()),
                Some(delay) => {
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(KestrelError::Cancelled),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_capacity_is_immediately_available() {
        let limiter = RateLimiter::new(1.0, 3);
        let cancel = CancellationToken::new();
        for _ in 0..3 {
            limiter.acquire("https://target.example", &cancel).await.unwrap();
        }
    }

    #[tokio::test]
    async fn separate_targets_have_independent_buckets() {
        let limiter = RateLimiter::new(0.001, 1);
        let cancel = CancellationToken::new();
        limiter.acquire("https://a.example", &cancel).await.unwrap();
        // A different target's bucket must still have its full burst.
        limiter.acquire("https://b.example", &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_token_aborts_acquire() {
        let limiter = RateLimiter::new(0.001, 1);
        let cancel = CancellationToken::new();
        limiter.acquire("https://a.example", &cancel).await.unwrap();
        cancel.cancel();
        let result = limiter.acquire("https://a.example", &cancel).await;
        assert!(matches!(result, Err(KestrelError::Cancelled)));
    }
}
