use httpmock::prelude::*;
use serde_json::json;

use jobhunt::config::SourcesConfig;
use jobhunt::core::SourceKind;
use jobhunt::error::SourceError;
use jobhunt::sources::{IndeedSource, JobSource, LinkedInSource, RozeeSource, build_sources};
use jobhunt::test_utils::fixtures::sample_profile;

fn config() -> SourcesConfig {
    SourcesConfig {
        max_jobs_per_source: 2,
        ..SourcesConfig::default()
    }
}

#[tokio::test]
async fn indeed_sends_scraper_query_and_reads_array() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/jobs")
                .query_param("site_name", "indeed")
                .query_param("search_term", "Rust Developer")
                .query_param("location", "Lahore, Pakistan")
                .query_param("country_indeed", "Pakistan")
                .query_param("is_remote", "true")
                .query_param("results_wanted", "2");
            then.status(200).json_body(json!([
                { "title": "Rust Developer", "company": "Acme" },
                { "title": "Backend Engineer", "company": "Globex" },
                { "title": "Extra", "company": "Initech" }
            ]));
        })
        .await;

    let source = IndeedSource::new(reqwest::Client::new(), server.url("/jobs"), &config());
    let records = source.fetch(&sample_profile()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].text("company").as_deref(), Some("Acme"));
}

#[tokio::test]
async fn linkedin_reads_wrapped_jobs_object() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/jobs")
                .query_param("site_name", "linkedin")
                .query_param("linkedin_fetch_description", "true");
            then.status(200).json_body(json!({
                "jobs": [{ "title": "Rust Developer", "job_level": "Associate" }]
            }));
        })
        .await;

    let source = LinkedInSource::new(reqwest::Client::new(), server.url("/jobs"), &config());
    let records = source.fetch(&sample_profile()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text("job_level").as_deref(), Some("Associate"));
}

#[tokio::test]
async fn rozee_queries_by_city() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rozee/jobs")
                .query_param("q", "Rust Developer")
                .query_param("city", "Lahore");
            then.status(200).json_body(json!([]));
        })
        .await;

    let source = RozeeSource::new(reqwest::Client::new(), server.url("/rozee/jobs"), &config());
    let records = source.fetch(&sample_profile()).await.unwrap();
    mock.assert_async().await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/jobs");
            then.status(500).body("boom");
        })
        .await;

    let source = IndeedSource::new(reqwest::Client::new(), server.url("/jobs"), &config());
    let err = source.fetch(&sample_profile()).await.unwrap_err();
    assert_eq!(
        err,
        SourceError::Status {
            site: SourceKind::Indeed,
            status: 500
        }
    );
}

#[tokio::test]
async fn unreadable_body_maps_to_parse() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rozee/jobs");
            then.status(200).body("<html>captcha</html>");
        })
        .await;

    let source = RozeeSource::new(reqwest::Client::new(), server.url("/rozee/jobs"), &config());
    let err = source.fetch(&sample_profile()).await.unwrap_err();
    assert!(matches!(err, SourceError::Parse { site: SourceKind::Rozee, .. }));
}

#[tokio::test]
async fn unreachable_endpoint_maps_to_network() {
    let source = IndeedSource::new(
        reqwest::Client::new(),
        "http://127.0.0.1:9/jobs".to_string(),
        &config(),
    );
    let err = source.fetch(&sample_profile()).await.unwrap_err();
    assert!(matches!(err, SourceError::Network { .. }));
}

#[test]
fn build_sources_follows_enabled_order() {
    let config = SourcesConfig {
        enabled: vec!["rozee".into(), "indeed".into()],
        ..SourcesConfig::default()
    };
    let kinds: Vec<_> = build_sources(&config)
        .unwrap()
        .iter()
        .map(|source| source.kind())
        .collect();
    assert_eq!(kinds, vec![SourceKind::Rozee, SourceKind::Indeed]);
}

#[test]
fn build_sources_rejects_blank_endpoint() {
    let config = SourcesConfig {
        enabled: vec!["linkedin".into()],
        linkedin_endpoint: "  ".into(),
        ..SourcesConfig::default()
    };
    assert!(build_sources(&config).is_err());
}
