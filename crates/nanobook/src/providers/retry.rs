//! Retry with exponential backoff for outbound HTTP calls

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Backoff stops growing after 2^6 = 64 seconds
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// A failed attempt, classified by whether trying again can help
#[derive(Debug)]
pub enum Failure {
    /// Connection problems, timeouts, 429 and 5xx responses
    Transient(Error),
    /// Everything else: 4xx, malformed responses, blocked prompts
    Permanent(Error),
}

impl Failure {
    /// Classify an error raised while sending a request
    pub fn from_send(source: &reqwest::Error, error: Error) -> Self {
        if source.is_connect() || source.is_timeout() {
            Self::Transient(error)
        } else {
            Self::Permanent(error)
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, error: Error) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::Transient(error)
        } else {
            Self::Permanent(error)
        }
    }

    fn into_error(self) -> Error {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self::Permanent(error)
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt.min(MAX_BACKOFF_EXPONENT)))
}

/// Run `operation` up to `max_retries + 1` times, sleeping 1s, 2s, 4s ... between attempts
///
/// Only [`Failure::Transient`] results are retried.
pub async fn retry_request<F, Fut, T>(what: &str, max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, Failure>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(Failure::Transient(e)) if attempt < max_retries => {
                let delay = backoff(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    what,
                    attempt + 1,
                    max_retries + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure.into_error()),
        }
    }
}
