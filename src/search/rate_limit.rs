use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::clock::Clock;
use crate::search::SearchError;
use crate::state_store::{RateLimitState, StateStore};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub min_spacing: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(24 * 60 * 60),
            min_spacing: Duration::from_secs(1),
        }
    }
}

/// Daily request quota plus a minimum gap between consecutive requests.
///
/// The quota counter lives in the injected [`StateStore`] so it survives restarts.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
            last_request: Mutex::new(None),
        }
    }

    /// Counts one request against the quota, then waits out the spacing interval.
    pub async fn acquire(&self) -> Result<(), SearchError> {
        // Held across the whole check so concurrent callers are serialized.
        let mut last = self.last_request.lock().await;

        let now = self.clock.now().timestamp_millis();
        let window_ms = i64::try_from(self.config.window.as_millis()).unwrap_or(i64::MAX);
        let state = match self.store.load_rate_limit().await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    "read rate limit state failed; starting a new window"
                );
                None
            }
        };

        let next = match state {
            Some(state) if now.saturating_sub(state.window_start) <= window_ms => {
                if state.count >= self.config.max_requests {
                    tracing::warn!(count = state.count, "search quota exhausted");
                    return Err(SearchError::RateLimited {
                        limit: self.config.max_requests,
                    });
                }
                RateLimitState {
                    window_start: state.window_start,
                    count: state.count + 1,
                }
            }
            _ => RateLimitState {
                window_start: now,
                count: 1,
            },
        };

        if let Err(err) = self.store.save_rate_limit(&next).await {
            tracing::warn!(error = %format!("{err:#}"), "write rate limit state failed");
        }

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.config.min_spacing {
                tokio::time::sleep(self.config.min_spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }
}
