use std::sync::Arc;
use std::time::Duration;

use jobhunt::HuntError;
use jobhunt::cache::ResultCache;
use jobhunt::core::{SearchRequest, SourceKind};
use jobhunt::error::SourceError;
use jobhunt::pipeline::{Aggregator, PipelineOptions};
use jobhunt::scoring::{RelevanceScorer, ScoringOptions, SemanticOracle};
use jobhunt::sources::{JobSource, RetryPolicy};
use jobhunt::test_utils::fixtures::{
    StubOracle, StubSource, raw_indeed_jobs, raw_linkedin_jobs, raw_rozee_jobs, sample_profile,
    sample_request,
};
use jobhunt::test_utils::logging::{init_test_logging, logs_contain, logs_for_target};
use jobhunt::{assert_log_contains, assert_target_logged};
use tracing::Level;

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_secs(5),
        attempt_timeout: Duration::from_secs(30),
    }
}

fn aggregator(sources: Vec<Arc<StubSource>>, oracle: Arc<StubOracle>, cached: bool) -> Aggregator {
    let sources = sources
        .into_iter()
        .map(|source| source as Arc<dyn JobSource>)
        .collect();
    let oracle: Arc<dyn SemanticOracle> = oracle;
    let scorer = RelevanceScorer::new(oracle, ScoringOptions::default(), 0);
    let cache = cached.then(|| Arc::new(ResultCache::new(Duration::from_secs(3600))));
    Aggregator::new(sources, policy(), Arc::new(scorer), cache, PipelineOptions::default())
}

fn outage(site: SourceKind) -> SourceError {
    SourceError::Status { site, status: 503 }
}

#[tokio::test(start_paused = true)]
async fn one_failing_source_does_not_sink_the_search() {
    let indeed = Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(5)));
    let linkedin = Arc::new(StubSource::failing(SourceKind::LinkedIn, outage(SourceKind::LinkedIn)));
    let rozee = Arc::new(StubSource::succeeding(SourceKind::Rozee, raw_rozee_jobs(5)));
    let service = aggregator(
        vec![indeed, Arc::clone(&linkedin), rozee],
        Arc::new(StubOracle::new()),
        false,
    );

    let response = service.search(sample_profile()).await.unwrap();
    let stats = response.stats.as_ref().unwrap();

    assert_eq!(stats.total_fetched, 10);
    assert_eq!(stats.failed_sources(), vec!["LinkedIn".to_string()]);
    assert_eq!(linkedin.calls(), 3);
    assert_eq!(response.total_jobs_found, response.relevant_jobs.len());
    assert!(!response.relevant_jobs.is_empty());
    assert!(!response.from_cache);
}

#[tokio::test(start_paused = true)]
async fn two_failing_sources_still_return_the_third() {
    let service = aggregator(
        vec![
            Arc::new(StubSource::failing(SourceKind::Indeed, outage(SourceKind::Indeed))),
            Arc::new(StubSource::hanging(SourceKind::LinkedIn)),
            Arc::new(StubSource::succeeding(SourceKind::Rozee, raw_rozee_jobs(3))),
        ],
        Arc::new(StubOracle::new()),
        false,
    );

    let response = service.search(sample_profile()).await.unwrap();
    assert_eq!(response.stats.as_ref().unwrap().total_fetched, 3);
    assert!(
        response
            .relevant_jobs
            .iter()
            .all(|record| record.job.source == SourceKind::Rozee)
    );
}

#[tokio::test(start_paused = true)]
async fn panicking_source_is_isolated() {
    let service = aggregator(
        vec![
            Arc::new(StubSource::panicking(SourceKind::Indeed)),
            Arc::new(StubSource::succeeding(SourceKind::LinkedIn, raw_linkedin_jobs(2))),
        ],
        Arc::new(StubOracle::new()),
        false,
    );

    let response = service.search(sample_profile()).await.unwrap();
    let stats = response.stats.as_ref().unwrap();
    assert_eq!(stats.total_fetched, 2);
    assert_eq!(stats.failed_sources(), vec!["Indeed".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn results_are_ranked_and_above_threshold() {
    let oracle = StubOracle::new()
        .with_score_for("Rust Developer 1", "0.0")
        .with_score_for("Rust Developer 3", "0.95");
    let service = aggregator(
        vec![Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(5)))],
        Arc::new(oracle),
        false,
    );

    let response = service.search(sample_profile()).await.unwrap();
    let titles: Vec<_> = response
        .relevant_jobs
        .iter()
        .map(|record| record.job.job_title.as_str())
        .collect();

    assert!(!titles.contains(&"Rust Developer 1"));
    assert_eq!(titles.first(), Some(&"Rust Developer 3"));
    assert_eq!(response.total_jobs_found, 4);
    for record in &response.relevant_jobs {
        let score = record.score();
        assert!(score >= 0.3, "{} scored {score}", record.job.job_title);
        assert!((score * 100.0 - (score * 100.0).round()).abs() < 1e-9);
    }
    for pair in response.relevant_jobs.windows(2) {
        assert!(pair[0].score() >= pair[1].score());
    }
}

#[tokio::test(start_paused = true)]
async fn oracle_outage_falls_back_to_neutral() {
    let service = aggregator(
        vec![Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(2)))],
        Arc::new(StubOracle::failing()),
        false,
    );

    let response = service.search(sample_profile()).await.unwrap();
    assert_eq!(response.relevant_jobs.len(), 2);
    for record in &response.relevant_jobs {
        assert_eq!(record.semantic_score, Some(0.5));
    }
}

#[tokio::test(start_paused = true)]
async fn repeat_search_is_served_from_cache() {
    let indeed = Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(3)));
    let service = aggregator(vec![Arc::clone(&indeed)], Arc::new(StubOracle::new()), true);

    let first = service.search(sample_profile()).await.unwrap();
    let second = service.search(sample_profile()).await.unwrap();

    assert_eq!(indeed.calls(), 1);
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert!(second.stats.is_none());
    assert_eq!(first.relevant_jobs, second.relevant_jobs);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(service.cache().unwrap().stats().hits, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_fetch_is_not_cached() {
    let indeed = Arc::new(StubSource::succeeding(SourceKind::Indeed, Vec::new()));
    let service = aggregator(vec![Arc::clone(&indeed)], Arc::new(StubOracle::new()), true);

    let response = service.search(sample_profile()).await.unwrap();
    assert!(response.relevant_jobs.is_empty());
    assert_eq!(response.total_jobs_found, 0);
    assert!(service.cache().unwrap().is_empty());

    service.search(sample_profile()).await.unwrap();
    assert_eq!(indeed.calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn same_posting_from_two_sources_is_kept_once() {
    let service = aggregator(
        vec![
            Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(3))),
            Arc::new(StubSource::succeeding(SourceKind::LinkedIn, raw_indeed_jobs(3))),
        ],
        Arc::new(StubOracle::new()),
        false,
    );

    let response = service.search(sample_profile()).await.unwrap();
    let stats = response.stats.as_ref().unwrap();
    assert_eq!(stats.total_fetched, 6);
    assert_eq!(stats.duplicates_removed, 3);
    assert!(
        response
            .relevant_jobs
            .iter()
            .all(|record| record.job.source == SourceKind::Indeed)
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_request_is_rejected_before_fetching() {
    let indeed = Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(1)));
    let service = aggregator(vec![Arc::clone(&indeed)], Arc::new(StubOracle::new()), true);

    let err = service
        .search_request(SearchRequest {
            position: "   ".into(),
            ..sample_request()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, HuntError::ValidationFailed(_)));
    assert_eq!(indeed.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn closed_scorer_fails_the_search() {
    let service = aggregator(
        vec![Arc::new(StubSource::succeeding(SourceKind::Indeed, raw_indeed_jobs(2)))],
        Arc::new(StubOracle::new()),
        false,
    );
    service.scorer().close();

    let err = service.search(sample_profile()).await.unwrap_err();
    assert!(matches!(err, HuntError::PipelineFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn pipeline_logs_under_its_target() {
    let _guard = init_test_logging("info");
    let service = aggregator(
        vec![
            Arc::new(StubSource::failing(SourceKind::LinkedIn, outage(SourceKind::LinkedIn))),
            Arc::new(StubSource::succeeding(SourceKind::Rozee, raw_rozee_jobs(1))),
        ],
        Arc::new(StubOracle::new()),
        false,
    );

    service.search(sample_profile()).await.unwrap();

    assert_target_logged!("pipeline", "search complete");
    assert_target_logged!("retry", "max retries reached, giving up");
    assert_log_contains!(Level::WARN, "fetch attempt failed");
    assert!(logs_contain("fetched jobs"));
    assert!(
        logs_for_target("retry")
            .iter()
            .any(|entry| entry.field("site") == Some("LinkedIn"))
    );
}
