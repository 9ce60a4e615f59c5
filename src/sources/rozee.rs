//! Rozee.pk, reached through its card-extraction endpoint.
//!
//! Rozee filters by city rather than by full location, and has no job-type
//! filter of its own.

use async_trait::async_trait;
use tracing::info;

use super::{JobSource, get_records};
use crate::config::SourcesConfig;
use crate::core::{RawRecord, SearchProfile, SourceKind};
use crate::error::SourceError;

pub struct RozeeSource {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl RozeeSource {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: String, config: &SourcesConfig) -> Self {
        Self {
            client,
            endpoint,
            max_results: config.max_jobs_per_source,
        }
    }

    fn query(&self, profile: &SearchProfile) -> Vec<(&'static str, String)> {
        vec![
            ("q", profile.position().to_string()),
            ("city", profile.city().to_string()),
            ("limit", self.max_results.to_string()),
        ]
    }
}

#[async_trait]
impl JobSource for RozeeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Rozee
    }

    async fn fetch(&self, profile: &SearchProfile) -> Result<Vec<RawRecord>, SourceError> {
        info!(
            target: "sources",
            site = "rozee",
            position = profile.position(),
            city = profile.city(),
            "fetching jobs"
        );
        get_records(
            &self.client,
            SourceKind::Rozee,
            &self.endpoint,
            &self.query(profile),
            self.max_results,
        )
        .await
    }
}
