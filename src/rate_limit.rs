//! Per-domain politeness limits for page fetches.
//!
//! One token bucket per registrable domain, so a page and its contact/about
//! sub-pages draw from the same budget while unrelated sites proceed in
//! parallel.

use crate::domain_utils::extract_base_domain;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Token bucket refilled continuously at `rate` tokens per second, holding at most `rate` tokens.
#[derive(Debug)]
pub struct TokenBucket {
    available: f64,
    capacity: f64,
    rate: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    pub fn new(requests_per_second: u32) -> Self {
        let rate = f64::from(requests_per_second.max(1));
        Self {
            available: rate,
            capacity: rate,
            rate,
            refilled_at: Instant::now(),
        }
    }

    /// Take a token, or report how long until one is available.
    pub fn take(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.refilled_at).as_secs_f64();
        self.available = (self.available + elapsed * self.rate).min(self.capacity);
        self.refilled_at = now;

        if self.available >= 1.0 {
            self.available -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.available) / self.rate))
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomainRateLimiter {
    buckets: Arc<Mutex<HashMap<String, Arc<Mutex<TokenBucket>>>>>,
    /// 0 disables limiting.
    requests_per_second: u32,
}

impl DomainRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            requests_per_second,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.requests_per_second > 0
    }

    /// Wait for a token for the host's registrable domain.
    pub async fn acquire(&self, host: &str) {
        if !self.is_enabled() {
            return;
        }

        let domain = extract_base_domain(host);
        let bucket = {
            let mut buckets = self.buckets.lock().await;
            buckets
                .entry(domain.clone())
                .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(self.requests_per_second))))
                .clone()
        };

        // Holding the bucket lock while sleeping queues same-domain callers behind us.
        let mut bucket = bucket.lock().await;
        while let Err(wait) = bucket.take() {
            debug!("Rate limit for {}: waiting {:?}", domain, wait);
            sleep(wait).await;
        }
    }

    pub async fn tracked_domains(&self) -> usize {
        self.buckets.lock().await.len()
    }
}
