//! LinkedIn, reached through the scraper service with full descriptions.

use async_trait::async_trait;
use tracing::info;

use super::{JobSource, get_records, is_remote, scraper_job_type};
use crate::config::SourcesConfig;
use crate::core::{RawRecord, SearchProfile, SourceKind};
use crate::error::SourceError;

pub struct LinkedInSource {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
    hours_old: u32,
}

impl LinkedInSource {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: String, config: &SourcesConfig) -> Self {
        Self {
            client,
            endpoint,
            max_results: config.max_jobs_per_source,
            hours_old: config.hours_old,
        }
    }

    fn query(&self, profile: &SearchProfile) -> Vec<(&'static str, String)> {
        vec![
            ("site_name", "linkedin".to_string()),
            ("search_term", profile.position().to_string()),
            ("location", profile.location().to_string()),
            ("results_wanted", self.max_results.to_string()),
            ("hours_old", self.hours_old.to_string()),
            ("job_type", scraper_job_type(profile.job_nature()).to_string()),
            ("is_remote", is_remote(profile.job_nature()).to_string()),
            ("linkedin_fetch_description", "true".to_string()),
            ("enforce_annual_salary", "true".to_string()),
        ]
    }
}

#[async_trait]
impl JobSource for LinkedInSource {
    fn kind(&self) -> SourceKind {
        SourceKind::LinkedIn
    }

    async fn fetch(&self, profile: &SearchProfile) -> Result<Vec<RawRecord>, SourceError> {
        info!(
            target: "sources",
            site = "linkedin",
            position = profile.position(),
            location = profile.location(),
            "fetching jobs"
        );
        get_records(
            &self.client,
            SourceKind::LinkedIn,
            &self.endpoint,
            &self.query(profile),
            self.max_results,
        )
        .await
    }
}
