//! Job sources.
//!
//! Each source is one flat implementation of [`JobSource`]. The scraping
//! itself happens behind an HTTP endpoint that answers with JSON records;
//! adapters only translate a [`SearchProfile`] into that endpoint's query
//! vocabulary and bound the result size.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::SourcesConfig;
use crate::core::{RawRecord, SearchProfile, SourceKind};
use crate::error::{HuntError, Result, SourceError};

pub mod indeed;
pub mod linkedin;
pub mod retry;
pub mod rozee;

pub use indeed::IndeedSource;
pub use linkedin::LinkedInSource;
pub use retry::{FetchOutcome, RetryPolicy, fetch_all, fetch_with_retry};
pub use rozee::RozeeSource;

/// Capability shared by every job source.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch at most the configured number of raw postings for `profile`.
    ///
    /// An empty list is a successful answer.
    async fn fetch(&self, profile: &SearchProfile) -> std::result::Result<Vec<RawRecord>, SourceError>;
}

/// Build the enabled sources, in configuration order.
pub fn build_sources(config: &SourcesConfig) -> Result<Vec<Arc<dyn JobSource>>> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("jobhunt/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| HuntError::Config(format!("source http client: {err}")))?;

    config
        .enabled_kinds()?
        .into_iter()
        .map(|kind| {
            let endpoint = config.endpoint(kind).to_string();
            if endpoint.trim().is_empty() {
                return Err(HuntError::Config(format!(
                    "no endpoint configured for {}; set sources.{}_endpoint",
                    kind,
                    kind.config_key()
                )));
            }
            let source: Arc<dyn JobSource> = match kind {
                SourceKind::Indeed => Arc::new(IndeedSource::new(client.clone(), endpoint, config)),
                SourceKind::LinkedIn => {
                    Arc::new(LinkedInSource::new(client.clone(), endpoint, config))
                }
                SourceKind::Rozee => Arc::new(RozeeSource::new(client.clone(), endpoint, config)),
            };
            Ok(source)
        })
        .collect()
}

/// Job-type filter understood by the scraper service.
#[must_use]
pub fn scraper_job_type(job_nature: &str) -> &'static str {
    match job_nature.trim().to_lowercase().as_str() {
        "part time" | "part-time" | "parttime" => "parttime",
        "contract" => "contract",
        "internship" => "internship",
        _ => "fulltime",
    }
}

#[must_use]
pub fn is_remote(job_nature: &str) -> bool {
    job_nature.to_lowercase().contains("remote")
}

/// GET `endpoint` with `query` and decode the body into raw records.
///
/// The body may be a JSON array or an object wrapping a `jobs` array.
pub(crate) async fn get_records(
    client: &reqwest::Client,
    site: SourceKind,
    endpoint: &str,
    query: &[(&str, String)],
    limit: usize,
) -> std::result::Result<Vec<RawRecord>, SourceError> {
    let response = client
        .get(endpoint)
        .query(query)
        .send()
        .await
        .map_err(|err| SourceError::Network {
            site,
            message: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            site,
            status: status.as_u16(),
        });
    }

    let body: Value = response.json().await.map_err(|err| SourceError::Parse {
        site,
        message: err.to_string(),
    })?;
    let records = decode_records(site, body)?;
    debug!(target: "sources", %site, received = records.len(), limit, "decoded records");
    Ok(records.into_iter().take(limit).collect())
}

fn decode_records(
    site: SourceKind,
    body: Value,
) -> std::result::Result<Vec<RawRecord>, SourceError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("jobs") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(SourceError::Parse {
                    site,
                    message: "object response has no jobs array".to_string(),
                });
            }
        },
        other => {
            return Err(SourceError::Parse {
                site,
                message: format!("unexpected response shape: {other}"),
            });
        }
    };

    items
        .into_iter()
        .map(|item| {
            RawRecord::from_value(item).ok_or_else(|| SourceError::Parse {
                site,
                message: "job entry is not an object".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_job_nature_to_scraper_job_type() {
        assert_eq!(scraper_job_type("Part Time"), "parttime");
        assert_eq!(scraper_job_type("contract"), "contract");
        assert_eq!(scraper_job_type("Internship"), "internship");
        assert_eq!(scraper_job_type("Remote"), "fulltime");
        assert_eq!(scraper_job_type("onsite"), "fulltime");
        assert!(is_remote("Remote"));
        assert!(is_remote("hybrid / remote"));
        assert!(!is_remote("onsite"));
    }

    #[test]
    fn decodes_array_and_wrapped_bodies() {
        let array = json!([{"title": "a"}, {"title": "b"}]);
        assert_eq!(decode_records(SourceKind::Indeed, array).unwrap().len(), 2);

        let wrapped = json!({"jobs": [{"title": "a"}]});
        assert_eq!(decode_records(SourceKind::Indeed, wrapped).unwrap().len(), 1);

        let empty = json!([]);
        assert!(decode_records(SourceKind::Indeed, empty).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_bodies() {
        for body in [json!({"results": []}), json!("nope"), json!([1, 2])] {
            let err = decode_records(SourceKind::Rozee, body).unwrap_err();
            assert!(matches!(err, SourceError::Parse { site: SourceKind::Rozee, .. }));
        }
    }

    #[test]
    fn build_sources_follows_config_order() {
        let config = SourcesConfig {
            enabled: vec!["rozee".to_string(), "indeed".to_string()],
            ..SourcesConfig::default()
        };
        let sources = build_sources(&config).unwrap();
        let kinds: Vec<_> = sources.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![SourceKind::Rozee, SourceKind::Indeed]);
    }

    #[test]
    fn build_sources_requires_endpoints() {
        let config = SourcesConfig {
            enabled: vec!["linkedin".to_string()],
            linkedin_endpoint: String::new(),
            ..SourcesConfig::default()
        };
        assert!(build_sources(&config).is_err());
    }
}
