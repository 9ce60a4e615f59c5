//! Hybrid relevance scoring.
//!
//! Stage 1 is the keyword score from [`basic`]. Jobs reaching the semantic
//! floor are also scored by the oracle and the two are blended with fixed
//! weights. Jobs that clear the inclusion threshold get their unspecified
//! fields filled.

pub mod basic;
pub mod oracle;
pub mod prompt;
pub mod standardize;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub use basic::{BasicMatch, basic_score, match_job};
pub use oracle::{
    GeminiOracle, RateLimitedOracle, RateLimiter, SemanticOracle, UnavailableOracle, build_oracle,
};
pub use standardize::{missing_fields, standardize};

use crate::config::ScoringConfig;
use crate::core::{JobRecord, ScoredJobRecord, SearchProfile};
use crate::error::{HuntError, Result};

pub const BASIC_WEIGHT: f64 = 0.3;
pub const SEMANTIC_WEIGHT: f64 = 0.7;
/// Semantic score used when the oracle cannot answer.
pub const NEUTRAL_SEMANTIC: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringOptions {
    pub semantic_floor: f64,
    pub inclusion_threshold: f64,
    pub max_concurrency: usize,
    pub fill_missing: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

impl From<&ScoringConfig> for ScoringOptions {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            semantic_floor: config.semantic_floor,
            inclusion_threshold: config.inclusion_threshold,
            max_concurrency: config.max_concurrency.max(1),
            fill_missing: config.fill_missing,
        }
    }
}

/// Round to two decimals.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Final score from the stage scores, rounded to two decimals.
#[must_use]
pub fn combine(basic: f64, semantic: Option<f64>) -> f64 {
    let blended = semantic.map_or(basic, |semantic| {
        BASIC_WEIGHT * basic + SEMANTIC_WEIGHT * semantic
    });
    round2(blended.clamp(0.0, 1.0))
}

/// Result of scoring one batch.
#[derive(Debug, Default)]
pub struct ScoringReport {
    /// Every input job, scored, in input order.
    pub records: Vec<ScoredJobRecord>,
    pub oracle_calls: u64,
}

impl ScoringReport {
    #[must_use]
    pub fn kept(&self) -> usize {
        self.records.iter().filter(|r| r.included).count()
    }
}

pub struct RelevanceScorer {
    oracle: Arc<RateLimitedOracle>,
    options: ScoringOptions,
    permits: Arc<Semaphore>,
}

impl RelevanceScorer {
    #[must_use]
    pub fn new(oracle: Arc<dyn SemanticOracle>, options: ScoringOptions, calls_per_minute: u32) -> Self {
        Self {
            oracle: Arc::new(RateLimitedOracle::new(oracle, calls_per_minute)),
            permits: Arc::new(Semaphore::new(options.max_concurrency.max(1))),
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &ScoringOptions {
        &self.options
    }

    /// Oracle calls made over the scorer's lifetime.
    #[must_use]
    pub fn oracle_calls(&self) -> u64 {
        self.oracle.calls()
    }

    /// Stop accepting work; later batches fail.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Score one job without the concurrency bound.
    pub async fn score_job(&self, job: JobRecord, profile: &SearchProfile) -> ScoredJobRecord {
        score_one(self.oracle.as_ref(), &self.options, job, profile).await.0
    }

    /// Score a batch, at most `max_concurrency` jobs at a time.
    ///
    /// Fails only if the scorer was closed or a scoring task died.
    pub async fn score_all(&self, jobs: Vec<JobRecord>, profile: &Arc<SearchProfile>) -> Result<ScoringReport> {
        let total = jobs.len();
        let mut tasks = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|_| HuntError::PipelineFailed("scoring pool is closed".to_string()))?;
            let oracle = Arc::clone(&self.oracle);
            let profile = Arc::clone(profile);
            let options = self.options;
            tasks.spawn(async move {
                let _permit = permit;
                let (scored, calls) = score_one(oracle.as_ref(), &options, job, &profile).await;
                (index, scored, calls)
            });
        }

        let mut slots: Vec<Option<ScoredJobRecord>> = vec![None; total];
        let mut oracle_calls = 0;
        while let Some(joined) = tasks.join_next().await {
            let (index, scored, calls) = joined
                .map_err(|err| HuntError::PipelineFailed(format!("scoring task failed: {err}")))?;
            oracle_calls += calls;
            slots[index] = Some(scored);
        }

        let report = ScoringReport {
            records: slots.into_iter().flatten().collect(),
            oracle_calls,
        };
        info!(
            target: "scoring",
            scored = report.records.len(),
            kept = report.kept(),
            oracle_calls,
            "scored batch"
        );
        Ok(report)
    }
}

/// Score one job; returns the record and the number of oracle calls made.
async fn score_one(
    oracle: &dyn SemanticOracle,
    options: &ScoringOptions,
    mut job: JobRecord,
    profile: &SearchProfile,
) -> (ScoredJobRecord, u64) {
    let mut calls = 0;
    let basic = basic_score(&job, profile);

    let semantic = if basic >= options.semantic_floor {
        calls += 1;
        let semantic = match oracle.score(&prompt::relevance_prompt(&job, profile)).await {
            Ok(score) => score,
            Err(err) => {
                warn!(target: "scoring", title = %job.job_title, error = %err, "semantic scoring failed");
                NEUTRAL_SEMANTIC
            }
        };
        Some(semantic)
    } else {
        None
    };

    let score = combine(basic, semantic);
    job.relevance_score = Some(score);
    let included = score >= options.inclusion_threshold;
    debug!(
        target: "scoring",
        title = %job.job_title,
        basic,
        ?semantic,
        score,
        included,
        "scored job"
    );

    if included && options.fill_missing && standardize(&mut job, oracle).await {
        calls += 1;
    }

    (
        ScoredJobRecord {
            job,
            basic_score: basic,
            semantic_score: semantic,
            included,
        },
        calls,
    )
}
