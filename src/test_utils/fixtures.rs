//! Deterministic stand-ins for the outside world: sources that fail on a
//! script, an oracle with canned answers, and record builders.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{
    JobRecord, NOT_SPECIFIED, RawRecord, ScoredJobRecord, SearchProfile, SearchRequest, SourceKind,
};
use crate::error::{OracleError, SourceError};
use crate::scoring::SemanticOracle;
use crate::scoring::prompt::{HEALTH_EXPECTED, HEALTH_PROMPT};
use crate::sources::JobSource;

#[must_use]
pub fn sample_request() -> SearchRequest {
    SearchRequest {
        position: "Rust Developer".to_string(),
        experience: "3 years".to_string(),
        salary: "PKR 200,000".to_string(),
        job_nature: "Remote".to_string(),
        location: "Lahore".to_string(),
        skills: "Rust, Tokio, PostgreSQL".to_string(),
    }
}

/// Profile for a remote Rust developer in Lahore.
#[must_use]
pub fn sample_profile() -> SearchProfile {
    match SearchProfile::from_request(sample_request(), "Pakistan") {
        Ok(profile) => profile,
        Err(err) => panic!("sample profile is valid: {err}"),
    }
}

/// `n` Indeed-shaped raw records matching [`sample_profile`].
#[must_use]
pub fn raw_indeed_jobs(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            RawRecord::default()
                .with("title", format!("Rust Developer {i}"))
                .with("company", format!("Indeed Co {i}"))
                .with("location", "Lahore, Punjab, PK")
                .with("job_url", format!("https://indeed.example/jobs/{i}"))
                .with(
                    "description",
                    "Async Rust and Tokio services. 3 years of experience required.",
                )
                .with("job_type", "fulltime")
                .with("min_amount", 150_000)
                .with("max_amount", 250_000)
                .with("currency", "PKR")
                .with("interval", "monthly")
                .with("date_posted", "2025-03-14")
        })
        .collect()
}

/// `n` LinkedIn-shaped raw records.
#[must_use]
pub fn raw_linkedin_jobs(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            RawRecord::default()
                .with("title", format!("Senior Rust Developer {i}"))
                .with("company", format!("LinkedIn Co {i}"))
                .with("location", "Lahore, Pakistan")
                .with("job_url", format!("https://linkedin.example/jobs/{i}"))
                .with("description", "Rust, PostgreSQL and Kubernetes.")
                .with("job_level", "Mid-Senior level")
                .with("job_function", "Engineering")
        })
        .collect()
}

/// `n` Rozee-shaped raw records.
#[must_use]
pub fn raw_rozee_jobs(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            RawRecord::default()
                .with("job_title", format!("Rust Developer (Remote) {i}"))
                .with("company", format!("Rozee Co {i},"))
                .with("location", "Lahore")
                .with("salary", "PKR 180,000 - 220,000/Month")
                .with("apply_link", format!("https://rozee.example/job/{i}"))
                .with("description_snippet", "Backend role")
                .with(
                    "full_details",
                    "Job Description:\nTokio based services.\n\nJob Skills:\nRust, PostgreSQL",
                )
                .with("apply_button_present", true)
        })
        .collect()
}

fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// A canonical record that scores well against [`sample_profile`].
#[must_use]
pub fn job_record(title: &str, source: SourceKind) -> JobRecord {
    JobRecord {
        job_title: title.to_string(),
        company: "Acme".to_string(),
        experience: "3 years of experience".to_string(),
        job_nature: "Remote".to_string(),
        location: "Lahore, Pakistan".to_string(),
        salary: NOT_SPECIFIED.to_string(),
        apply_link: format!("https://jobs.example/{}/{}", source.config_key(), slug(title)),
        source,
        relevance_score: None,
        posted_date: None,
        description: Some("Rust and Tokio services backed by PostgreSQL".to_string()),
        extras: BTreeMap::new(),
    }
}

#[must_use]
pub fn scored_record(title: &str, score: f64, basic: f64) -> ScoredJobRecord {
    let mut job = job_record(title, SourceKind::Indeed);
    job.relevance_score = Some(score);
    ScoredJobRecord {
        job,
        basic_score: basic,
        semantic_score: None,
        included: true,
    }
}

#[must_use]
pub fn scored_records(n: usize) -> Vec<ScoredJobRecord> {
    (0..n)
        .map(|i| scored_record(&format!("Rust Developer {i}"), 0.8, 0.6))
        .collect()
}

#[derive(Clone)]
enum Step {
    Answer(Vec<RawRecord>),
    Fail(SourceError),
    Hang,
    Panic,
}

/// Source that plays back a fixed script, one step per call.
///
/// The last step repeats once the script runs out.
pub struct StubSource {
    kind: SourceKind,
    steps: Vec<Step>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubSource {
    fn with_steps(kind: SourceKind, steps: Vec<Step>) -> Self {
        Self {
            kind,
            steps,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn succeeding(kind: SourceKind, records: Vec<RawRecord>) -> Self {
        Self::with_steps(kind, vec![Step::Answer(records)])
    }

    #[must_use]
    pub fn failing(kind: SourceKind, error: SourceError) -> Self {
        Self::with_steps(kind, vec![Step::Fail(error)])
    }

    #[must_use]
    pub fn scripted(
        kind: SourceKind,
        script: Vec<Result<Vec<RawRecord>, SourceError>>,
    ) -> Self {
        let steps = script
            .into_iter()
            .map(|step| match step {
                Ok(records) => Step::Answer(records),
                Err(err) => Step::Fail(err),
            })
            .collect();
        Self::with_steps(kind, steps)
    }

    /// Never answers.
    #[must_use]
    pub fn hanging(kind: SourceKind) -> Self {
        Self::with_steps(kind, vec![Step::Hang])
    }

    #[must_use]
    pub fn panicking(kind: SourceKind) -> Self {
        Self::with_steps(kind, vec![Step::Panic])
    }

    /// Sleep this long before every answer.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobSource for StubSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _profile: &SearchProfile) -> Result<Vec<RawRecord>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let Some(last) = self.steps.len().checked_sub(1) else {
            return Ok(Vec::new());
        };
        match self.steps[call.min(last)].clone() {
            Step::Answer(records) => Ok(records),
            Step::Fail(err) => Err(err),
            Step::Hang => std::future::pending().await,
            Step::Panic => panic!("stub source {} blew up", self.kind),
        }
    }
}

/// Oracle with canned answers.
///
/// Relevance prompts get the per-title answer if one was registered, else
/// the default score. Fill prompts get the fill answer. The health probe is
/// answered correctly.
pub struct StubOracle {
    default_score: String,
    scores: Vec<(String, String)>,
    fill: String,
    fail: bool,
    calls: AtomicU64,
    prompts: Mutex<Vec<String>>,
}

impl Default for StubOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl StubOracle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_score: "0.8".to_string(),
            scores: Vec::new(),
            fill: "{}".to_string(),
            fail: false,
            calls: AtomicU64::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_score(mut self, answer: &str) -> Self {
        self.default_score = answer.to_string();
        self
    }

    /// Answer for relevance prompts about the job titled `title`.
    #[must_use]
    pub fn with_score_for(mut self, title: &str, answer: &str) -> Self {
        self.scores.push((title.to_string(), answer.to_string()));
        self
    }

    #[must_use]
    pub fn with_fill(mut self, answer: &str) -> Self {
        self.fill = answer.to_string();
        self
    }

    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl SemanticOracle for StubOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if self.fail {
            return Err(OracleError::Request("stub oracle is down".to_string()));
        }
        if prompt == HEALTH_PROMPT {
            return Ok(HEALTH_EXPECTED.to_string());
        }
        if prompt.contains("fill in the missing fields") {
            return Ok(self.fill.clone());
        }
        let answer = self
            .scores
            .iter()
            .find(|(title, _)| prompt.contains(&format!("- Title: {title}\n")))
            .map_or(&self.default_score, |(_, answer)| answer);
        Ok(answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_source_repeats_last_step() {
        let source = StubSource::scripted(
            SourceKind::Indeed,
            vec![
                Err(SourceError::Status {
                    site: SourceKind::Indeed,
                    status: 500,
                }),
                Ok(raw_indeed_jobs(2)),
            ],
        );
        let profile = sample_profile();
        assert!(source.fetch(&profile).await.is_err());
        assert_eq!(source.fetch(&profile).await.unwrap().len(), 2);
        assert_eq!(source.fetch(&profile).await.unwrap().len(), 2);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn stub_oracle_routes_prompts() {
        let oracle = StubOracle::new()
            .with_score_for("Chef", "0.1")
            .with_fill(r#"{"salary": "USD 1"}"#);
        assert_eq!(oracle.complete(HEALTH_PROMPT).await.unwrap(), "4");
        assert_eq!(oracle.complete("- Title: Chef\n").await.unwrap(), "0.1");
        assert_eq!(oracle.complete("- Title: Cook\n").await.unwrap(), "0.8");
        assert!(
            oracle
                .complete("please fill in the missing fields: salary")
                .await
                .unwrap()
                .contains("USD 1")
        );
        assert_eq!(oracle.calls(), 4);
        assert_eq!(oracle.prompts().len(), 4);
    }

    #[test]
    fn raw_builders_use_distinct_identities() {
        let indeed = raw_indeed_jobs(2);
        let linkedin = raw_linkedin_jobs(2);
        assert_ne!(indeed[0].text("company"), linkedin[0].text("company"));
        assert_eq!(raw_rozee_jobs(3).len(), 3);
    }
}
