use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use super::LeagueSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("league request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("league site returned {0}")]
    Status(reqwest::StatusCode),

    #[error("league fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("league fetch failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ScrapeError>,
    },
}

/// Anything that can produce the league standings and results tables.
#[async_trait]
pub trait LeagueSource: Send + Sync {
    async fn fetch_league_snapshot(&self) -> Result<LeagueSnapshot, ScrapeError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Pause before the retry; up to half of it again is added as jitter.
    pub retry_delay: Duration,
}

/// Fetch with a per-attempt timeout and one retry.
pub async fn fetch_with_retry(
    source: &dyn LeagueSource,
    policy: RetryPolicy,
) -> Result<LeagueSnapshot, ScrapeError> {
    let first = match attempt(source, policy.timeout).await {
        Ok(snapshot) => return Ok(snapshot),
        Err(e) => e,
    };

    let pause = policy.retry_delay + jitter(policy.retry_delay);
    warn!(
        "League fetch from {} failed ({}); retrying in {:?}",
        source.name(),
        first,
        pause
    );
    tokio::time::sleep(pause).await;

    match attempt(source, policy.timeout).await {
        Ok(snapshot) => {
            info!("League fetch from {} succeeded on retry", source.name());
            Ok(snapshot)
        }
        Err(last) => Err(ScrapeError::Exhausted {
            attempts: 2,
            last: Box::new(last),
        }),
    }
}

async fn attempt(source: &dyn LeagueSource, timeout: Duration) -> Result<LeagueSnapshot, ScrapeError> {
    match tokio::time::timeout(timeout, source.fetch_league_snapshot()).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::Timeout(timeout)),
    }
}

fn jitter(base: Duration) -> Duration {
    let max_ms = (base.as_millis() / 2) as u64;
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
