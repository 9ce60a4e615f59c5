//! Request-level orchestration: cache lookup, fan-out fetch, normalization,
//! deduplication, scoring, ranking and caching.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::core::{
    Fingerprint, JobRecord, ScoredJobRecord, SearchProfile, SearchRequest, is_unspecified,
};
use crate::error::Result;
use crate::normalize::normalize_all;
use crate::scoring::{RelevanceScorer, ScoringOptions, build_oracle};
use crate::sources::{FetchOutcome, JobSource, RetryPolicy, build_sources, fetch_all};

/// Where a search currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Fetching,
    Normalizing,
    Scoring,
    FilteringAndSorting,
    Cached,
    Responded,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Scoring => "scoring",
            Self::FilteringAndSorting => "filtering_and_sorting",
            Self::Cached => "cached",
            Self::Responded => "responded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(stage: PipelineStage) {
    info!(target: "pipeline", %stage, "stage");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub dedupe: bool,
    pub default_country: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let config = Config::default();
        Self {
            dedupe: config.pipeline.dedupe,
            default_country: config.sources.default_country,
        }
    }
}

/// What happened during one uncached search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub sources: Vec<FetchOutcome>,
    pub total_fetched: usize,
    pub duplicates_removed: usize,
    pub scored: usize,
    pub kept: usize,
    pub oracle_calls: u64,
}

impl PipelineStats {
    /// Sources that ended in an error rather than an answer.
    #[must_use]
    pub fn failed_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|outcome| outcome.failed())
            .map(|outcome| outcome.source.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub relevant_jobs: Vec<ScoredJobRecord>,
    pub total_jobs_found: usize,
    pub search_timestamp: DateTime<Utc>,
    pub from_cache: bool,
    pub fingerprint: Fingerprint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PipelineStats>,
}

impl SearchResponse {
    fn fresh(fingerprint: Fingerprint, relevant_jobs: Vec<ScoredJobRecord>, stats: PipelineStats) -> Self {
        Self {
            total_jobs_found: relevant_jobs.len(),
            relevant_jobs,
            search_timestamp: Utc::now(),
            from_cache: false,
            fingerprint,
            stats: Some(stats),
        }
    }
}

/// The aggregation service. Cheap to share behind an `Arc`.
pub struct Aggregator {
    sources: Vec<Arc<dyn JobSource>>,
    retry: RetryPolicy,
    scorer: Arc<RelevanceScorer>,
    cache: Option<Arc<ResultCache>>,
    options: PipelineOptions,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        sources: Vec<Arc<dyn JobSource>>,
        retry: RetryPolicy,
        scorer: Arc<RelevanceScorer>,
        cache: Option<Arc<ResultCache>>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            sources,
            retry,
            scorer,
            cache,
            options,
        }
    }

    /// Wire up sources, oracle, scorer and cache from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sources = build_sources(&config.sources)?;
        let oracle = build_oracle(&config.oracle)?;
        let scorer = RelevanceScorer::new(
            oracle,
            ScoringOptions::from(&config.scoring),
            config.oracle.calls_per_minute,
        );
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResultCache::new(config.cache.ttl())));
        Ok(Self::new(
            sources,
            RetryPolicy::from(&config.retry),
            Arc::new(scorer),
            cache,
            PipelineOptions {
                dedupe: config.pipeline.dedupe,
                default_country: config.sources.default_country.clone(),
            },
        ))
    }

    /// Start background work (cache expiry).
    pub fn start(&self) {
        if let Some(cache) = &self.cache {
            cache.start_expiry_task();
        }
    }

    pub fn shutdown(&self) {
        if let Some(cache) = &self.cache {
            cache.shutdown();
        }
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn scorer(&self) -> &Arc<RelevanceScorer> {
        &self.scorer
    }

    /// Validate a raw request and run it.
    pub async fn search_request(&self, request: SearchRequest) -> Result<SearchResponse> {
        let profile = SearchProfile::from_request(request, &self.options.default_country)
            .inspect_err(|err| warn!(target: "pipeline", error = %err, "rejected search request"))?;
        self.search(profile).await
    }

    /// Run one search for a validated profile.
    pub async fn search(&self, profile: SearchProfile) -> Result<SearchResponse> {
        let fingerprint = profile.fingerprint();
        let span = info_span!(
            "search",
            request_id = %Uuid::new_v4(),
            fingerprint = fingerprint.short()
        );
        async {
            let result = self.run(profile, fingerprint).await;
            match &result {
                Ok(_) => enter(PipelineStage::Responded),
                Err(err) => {
                    enter(PipelineStage::Failed);
                    warn!(target: "pipeline", error = %err, "search failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, profile: SearchProfile, fingerprint: Fingerprint) -> Result<SearchResponse> {
        enter(PipelineStage::Received);
        info!(
            target: "pipeline",
            position = profile.position(),
            location = profile.location(),
            job_nature = profile.job_nature(),
            "search received"
        );

        if let Some(entry) = self.cache.as_ref().and_then(|cache| cache.get(&fingerprint)) {
            info!(target: "pipeline", results = entry.results.len(), "cache hit");
            return Ok(SearchResponse {
                relevant_jobs: entry.results.as_ref().clone(),
                total_jobs_found: entry.results.len(),
                search_timestamp: entry.inserted_at,
                from_cache: true,
                fingerprint,
                stats: None,
            });
        }

        enter(PipelineStage::Fetching);
        let profile = Arc::new(profile);
        let mut outcomes = fetch_all(&self.sources, &profile, self.retry).await;

        enter(PipelineStage::Normalizing);
        let mut jobs = Vec::new();
        for outcome in &mut outcomes {
            let raws = std::mem::take(&mut outcome.records);
            jobs.extend(normalize_all(outcome.source, &raws, &profile));
        }
        let mut stats = PipelineStats {
            total_fetched: jobs.len(),
            sources: outcomes,
            ..PipelineStats::default()
        };

        if jobs.is_empty() {
            warn!(
                target: "pipeline",
                failed_sources = ?stats.failed_sources(),
                "no jobs fetched from any source"
            );
            return Ok(SearchResponse::fresh(fingerprint, Vec::new(), stats));
        }

        if self.options.dedupe {
            let (unique, removed) = dedupe(jobs, profile.location());
            jobs = unique;
            stats.duplicates_removed = removed;
        }

        enter(PipelineStage::Scoring);
        let report = self.scorer.score_all(jobs, &profile).await?;
        stats.scored = report.records.len();
        stats.oracle_calls = report.oracle_calls;

        enter(PipelineStage::FilteringAndSorting);
        let mut relevant: Vec<_> = report.records.into_iter().filter(|r| r.included).collect();
        rank(&mut relevant);
        stats.kept = relevant.len();

        if let Some(cache) = &self.cache {
            enter(PipelineStage::Cached);
            cache.put(fingerprint.clone(), relevant.clone());
        }

        info!(
            target: "pipeline",
            fetched = stats.total_fetched,
            duplicates = stats.duplicates_removed,
            kept = stats.kept,
            "search complete"
        );
        Ok(SearchResponse::fresh(fingerprint, relevant, stats))
    }
}

/// Drop later copies of the same posting; returns survivors and the number
/// dropped. Two jobs match on apply link or on normalized
/// title/company/location. Identities built from placeholders never match.
#[must_use]
pub fn dedupe(jobs: Vec<JobRecord>, fallback_location: &str) -> (Vec<JobRecord>, usize) {
    let before = jobs.len();
    let mut links = HashSet::new();
    let mut identities = HashSet::new();
    let unique: Vec<_> = jobs
        .into_iter()
        .filter(|job| {
            let link = (!is_unspecified(&job.apply_link)).then(|| job.apply_link.trim().to_string());
            let identity = job.dedup_key(fallback_location);
            let seen = link.as_ref().is_some_and(|link| links.contains(link))
                || identity.as_ref().is_some_and(|key| identities.contains(key));
            if !seen {
                if let Some(link) = link {
                    links.insert(link);
                }
                if let Some(key) = identity {
                    identities.insert(key);
                }
            }
            !seen
        })
        .collect();
    let removed = before - unique.len();
    (unique, removed)
}

/// Final score descending, then basic score descending; ties keep arrival
/// order.
pub fn rank(records: &mut [ScoredJobRecord]) {
    records.sort_by(|a, b| {
        b.score()
            .total_cmp(&a.score())
            .then_with(|| b.basic_score.total_cmp(&a.basic_score))
    });
}
