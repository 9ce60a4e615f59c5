//! Indeed, reached through the scraper service.

use async_trait::async_trait;
use tracing::info;

use super::{JobSource, get_records, is_remote, scraper_job_type};
use crate::config::SourcesConfig;
use crate::core::{RawRecord, SearchProfile, SourceKind};
use crate::error::SourceError;

pub struct IndeedSource {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
    hours_old: u32,
}

impl IndeedSource {
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
            ("site_name", "indeed".to_string()),
            ("search_term", profile.position().to_string()),
            ("location", profile.location().to_string()),
            ("results_wanted", self.max_results.to_string()),
            ("hours_old", self.hours_old.to_string()),
            ("job_type", scraper_job_type(profile.job_nature()).to_string()),
            ("is_remote", is_remote(profile.job_nature()).to_string()),
            ("country_indeed", profile.country().to_string()),
            ("enforce_annual_salary", "true".to_string()),
        ]
    }
}

#[async_trait]
impl JobSource for IndeedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Indeed
    }

    async fn fetch(&self, profile: &SearchProfile) -> Result<Vec<RawRecord>, SourceError> {
        info!(
            target: "sources",
            site = "indeed",
            position = profile.position(),
            location = profile.location(),
            "fetching jobs"
        );
        get_records(
            &self.client,
            SourceKind::Indeed,
            &self.endpoint,
            &self.query(profile),
            self.max_results,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SearchRequest;

    #[test]
    fn query_carries_country_and_job_type() {
        let profile = SearchProfile::from_request(
            SearchRequest {
                position: "Data Engineer".to_string(),
                job_nature: "Part Time".to_string(),
                location: "Karachi".to_string(),
                ..SearchRequest::default()
            },
            "Pakistan",
        )
        .unwrap();
        let source = IndeedSource::new(
            reqwest::Client::new(),
            "http://localhost/jobs".to_string(),
            &SourcesConfig::default(),
        );
        let query = source.query(&profile);
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("country_indeed"), Some("Pakistan"));
        assert_eq!(get("job_type"), Some("parttime"));
        assert_eq!(get("is_remote"), Some("false"));
        assert_eq!(get("results_wanted"), Some("15"));
        assert_eq!(get("location"), Some("Karachi, Pakistan"));
    }
}
