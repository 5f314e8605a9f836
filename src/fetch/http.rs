//! Shared HTTP plumbing for the upstream adapters.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

use crate::config::Config;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("fourkeys/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for one upstream service. Every request
/// carries the configured timeout; a timeout surfaces as [`Error::Http`].
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout())
        .build()?;
    Ok(client)
}

/// Map a non-success response to an [`Error`], passing successes through.
///
/// `service` names the upstream in auth errors ("github", "jira").
pub async fn check_response(service: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized(service.to_string()));
    }

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || is_rate_limited_forbidden(status, resp.headers());
    if rate_limited {
        return Err(Error::RateLimited {
            retry_after: rate_limit_wait(resp.headers(), Utc::now()),
        });
    }

    let message = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

/// GitHub signals primary rate limits as 403 with `x-ratelimit-remaining: 0`
/// and secondary limits as 403 with `Retry-After`.
fn is_rate_limited_forbidden(status: StatusCode, headers: &HeaderMap) -> bool {
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    exhausted || headers.contains_key(RETRY_AFTER)
}

/// How long the server asks us to back off: `Retry-After` if present,
/// otherwise the time until `x-ratelimit-reset` (GitHub's quota reset, in
/// epoch seconds).
pub fn rate_limit_wait(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    parse_retry_after(headers).or_else(|| {
        let reset = headers
            .get("x-ratelimit-reset")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())?;
        let secs = (reset - now.timestamp()).max(0);
        Some(Duration::from_secs(secs as u64))
    })
}

/// Parse the `Retry-After` header value as seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
