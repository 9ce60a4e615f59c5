//! Retrying fetch coordinator.
//!
//! Every source runs its own bounded retry loop on its own task. A source
//! that keeps failing degrades to an empty result; it never fails the
//! search and never cancels its siblings.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::JobSource;
use crate::config::RetryConfig;
use crate::core::{RawRecord, SearchProfile, SourceKind};
use crate::error::SourceError;

/// Retry settings for one source fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_secs(config.delay_secs),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs.max(1)),
        }
    }
}

/// What one source produced after its retry loop settled.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub source: SourceKind,
    #[serde(skip)]
    pub records: Vec<RawRecord>,
    pub fetched: usize,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl FetchOutcome {
    fn new(source: SourceKind, records: Vec<RawRecord>, attempts: u32, last_error: Option<String>) -> Self {
        Self {
            source,
            fetched: records.len(),
            records,
            attempts,
            last_error,
        }
    }

    /// True when the source ended with an error rather than an answer.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.records.is_empty() && self.last_error.is_some()
    }
}

/// Fetch from one source, retrying on errors and on empty answers.
///
/// Always settles: after `max_attempts` the result is empty, not an error.
pub async fn fetch_with_retry(
    source: &dyn JobSource,
    profile: &SearchProfile,
    policy: &RetryPolicy,
) -> FetchOutcome {
    let site = source.kind();
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let result = match tokio::time::timeout(policy.attempt_timeout, source.fetch(profile)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                site,
                after: policy.attempt_timeout,
            }),
        };

        match result {
            Ok(records) if !records.is_empty() => {
                info!(target: "retry", %site, attempt, count = records.len(), "fetched jobs");
                return FetchOutcome::new(site, records, attempt, None);
            }
            Ok(_) => {
                warn!(target: "retry", %site, attempt, "no jobs found");
                last_error = None;
            }
            Err(err) => {
                warn!(target: "retry", %site, attempt, error = %err, "fetch attempt failed");
                last_error = Some(err.to_string());
            }
        }

        if attempt < max_attempts {
            info!(target: "retry", %site, delay = ?policy.delay, "retrying");
            tokio::time::sleep(policy.delay).await;
        }
    }

    if last_error.is_some() {
        warn!(target: "retry", %site, attempts = max_attempts, "max retries reached, giving up");
    }
    FetchOutcome::new(site, Vec::new(), max_attempts, last_error)
}

/// Run every source's retry loop concurrently and wait for all of them.
///
/// Outcomes come back in the order of `sources`. A branch that panics is
/// reported as an empty outcome.
pub async fn fetch_all(
    sources: &[Arc<dyn JobSource>],
    profile: &Arc<SearchProfile>,
    policy: RetryPolicy,
) -> Vec<FetchOutcome> {
    let handles: Vec<_> = sources
        .iter()
        .map(|source| {
            let source = Arc::clone(source);
            let profile = Arc::clone(profile);
            let site = source.kind();
            let handle = tokio::spawn(async move {
                fetch_with_retry(source.as_ref(), &profile, &policy).await
            });
            (site, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (site, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(target: "retry", %site, error = %err, "fetch task aborted");
                FetchOutcome::new(site, Vec::new(), 0, Some(format!("fetch task aborted: {err}")))
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{StubSource, raw_indeed_jobs, sample_profile};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(30),
        }
    }

    fn network_error() -> SourceError {
        SourceError::Network {
            site: SourceKind::Indeed,
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_gives_up_after_max_attempts() {
        let source = StubSource::failing(SourceKind::Indeed, network_error());
        let outcome = fetch_with_retry(&source, &sample_profile(), &fast_policy(3)).await;

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(source.calls(), 3);
        assert!(outcome.failed());
        assert!(outcome.last_error.unwrap().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let source = StubSource::scripted(
            SourceKind::Indeed,
            vec![Err(network_error()), Ok(Vec::new()), Ok(raw_indeed_jobs(4))],
        );
        let start = tokio::time::Instant::now();
        let outcome = fetch_with_retry(&source, &sample_profile(), &fast_policy(3)).await;

        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.failed());
        // Two fixed delays between three attempts.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_answers_are_retried_but_not_failures() {
        let source = StubSource::scripted(SourceKind::Indeed, vec![Ok(Vec::new())]);
        let outcome = fetch_with_retry(&source, &sample_profile(), &fast_policy(2)).await;

        assert_eq!(source.calls(), 2);
        assert!(outcome.records.is_empty());
        assert!(!outcome.failed());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempts_time_out() {
        let source = StubSource::hanging(SourceKind::Rozee);
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(3),
        };
        let outcome = fetch_with_retry(&source, &sample_profile(), &policy).await;

        assert_eq!(outcome.attempts, 2);
        assert!(outcome.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_all_isolates_failing_and_panicking_branches() {
        let sources: Vec<Arc<dyn JobSource>> = vec![
            Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(5))),
            Arc::new(StubSource::panicking(SourceKind::LinkedIn)),
            Arc::new(StubSource::failing(SourceKind::Rozee, network_error())),
        ];
        let outcomes = fetch_all(&sources, &Arc::new(sample_profile()), fast_policy(3)).await;

        let kinds: Vec<_> = outcomes.iter().map(|o| o.source).collect();
        assert_eq!(kinds, vec![SourceKind::Indeed, SourceKind::LinkedIn, SourceKind::Rozee]);
        assert_eq!(outcomes[0].records.len(), 5);
        assert!(outcomes[1].records.is_empty());
        assert!(outcomes[1].last_error.as_deref().unwrap().contains("aborted"));
        assert!(outcomes[2].failed());
    }
}
