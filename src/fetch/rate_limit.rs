use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

const MAX_RETRIES: u32 = 3;
const BACKOFF_SECONDS: &[u64] = &[60, 120, 240];
const MAX_TOTAL_WAIT_SECONDS: u64 = 120;

/// How rate-limited requests are retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_secs: Vec<u64>,
    /// Total time one request may spend sleeping across its retries. A wait
    /// that would overrun it is not taken; the request fails instead.
    pub max_total_wait_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            backoff_secs: BACKOFF_SECONDS.to_vec(),
            max_total_wait_secs: MAX_TOTAL_WAIT_SECONDS,
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_secs: Vec::new(),
            max_total_wait_secs: 0,
        }
    }

    /// The wait before retry number `attempt`, or `None` when the request
    /// should give up: retries are used up, or sleeping would push the time
    /// already `waited` past the budget.
    pub fn next_delay(&self, attempt: u32, waited: Duration, error: &Error) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let wait = self.delay_for(attempt, error);
        (waited + wait <= Duration::from_secs(self.max_total_wait_secs)).then_some(wait)
    }

    /// Wait before retry number `attempt` (0-based). A `Retry-After` hint
    /// from the server wins over the configured backoff.
    pub fn delay_for(&self, attempt: u32, error: &Error) -> Duration {
        if let Error::RateLimited {
            retry_after: Some(after),
        } = error
        {
            return *after;
        }
        let secs = self
            .backoff_secs
            .get(attempt as usize)
            .or(self.backoff_secs.last())
            .copied()
            .unwrap_or(0);
        Duration::from_secs(secs)
    }
}

/// Retry an API call expression while it fails with [`Error::RateLimited`].
///
/// Usage: `retry_api!(self.retry, self.get_page(&url))`
///
/// The expression is re-evaluated on each retry attempt. This is a macro
/// because async closures that return borrowed futures can't satisfy `Fn`.
macro_rules! retry_api {
    ($policy:expr, $expr:expr) => {{
        let _policy: &$crate::fetch::rate_limit::RetryPolicy = &$policy;
        let mut _attempt: u32 = 0;
        let mut _waited = std::time::Duration::ZERO;
        loop {
            match $expr.await {
                Ok(val) => break Ok::<_, $crate::error::Error>(val),
                Err(e) if e.is_rate_limited() => {
                    match _policy.next_delay(_attempt, _waited, &e) {
                        Some(wait) => {
                            log::warn!(
                                "Rate limited. Waiting {}s before retry {}/{}",
                                wait.as_secs(),
                                _attempt + 1,
                                _policy.max_retries
                            );
                            tokio::time::sleep(wait).await;
                            _waited += wait;
                            _attempt += 1;
                        }
                        None => {
                            if _attempt < _policy.max_retries {
                                log::warn!(
                                    "Rate limited. Giving up after {}s of a {}s wait budget",
                                    _waited.as_secs(),
                                    _policy.max_total_wait_secs
                                );
                            }
                            break Err(e);
                        }
                    }
                }
                Err(e) => break Err(e),
            }
        }
    }};
}

pub(crate) use retry_api;
