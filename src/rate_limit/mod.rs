//! Shared per-provider token bucket rate limiting.
//!
//! LLM client handles are assumed to be internally concurrency-safe; this module only
//! keeps callers from overrunning each provider's own rate limit. One bucket is
//! constructed lazily per distinct model-selector string and shared across every
//! scorer/analyzer call that names that model.

use std::collections::HashMap;
use std::sync::Arc;

use leaky_bucket::RateLimiter;
use tokio::sync::Mutex;

/// Lazily-constructed, shared-by-model-name set of token buckets.
#[derive(Clone)]
pub struct RateLimiters {
    inner: Arc<Inner>,
}

struct Inner {
    buckets: Mutex<HashMap<String, Arc<RateLimiter>>>,
    requests_per_second: f64,
    max_burst: usize,
    unlimited: bool,
}

impl RateLimiters {
    pub fn new(requests_per_second: f64, max_burst: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                buckets: Mutex::new(HashMap::new()),
                requests_per_second,
                max_burst,
                unlimited: false,
            }),
        }
    }

    /// No-op limiter for tests, where there is no real provider to protect.
    pub fn unlimited() -> Self {
        Self {
            inner: Arc::new(Inner {
                buckets: Mutex::new(HashMap::new()),
                requests_per_second: 0.0,
                max_burst: 0,
                unlimited: true,
            }),
        }
    }

    /// Block until a token is available for the given model/provider name.
    pub async fn acquire(&self, model: &str) {
        if self.inner.unlimited {
            return;
        }

        let bucket = {
            let mut buckets = self.inner.buckets.lock().await;
            buckets
                .entry(model.to_string())
                .or_insert_with(|| {
                    Arc::new(
                        RateLimiter::builder()
                            .max(self.inner.max_burst)
                            .initial(self.inner.max_burst)
                            .refill(1)
                            .interval(std::time::Duration::from_secs_f64(
                                1.0 / self.inner.requests_per_second.max(0.001),
                            ))
                            .build(),
                    )
                })
                .clone()
        };

        bucket.acquire_one().await;
    }
}
